use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use url::Url;

// Sufixo de idioma que o site acrescenta aos títulos dublados
pub const LANGUAGE_TAG: &str = " (ITA)";

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(\.\d+)?)").unwrap());
static PAGE_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&]page=(\d+)").unwrap());

// Função para limpar um título vindo do site
pub fn clean_title(raw: &str) -> String {
    let title = raw.trim();
    title
        .strip_suffix(LANGUAGE_TAG)
        .unwrap_or(title)
        .trim()
        .to_string()
}

// Função para extrair números de uma string
pub fn extract_number(s: &str) -> Option<f64> {
    NUMBER
        .captures(s)
        .and_then(|cap| cap[1].parse::<f64>().ok())
}

// Número da página pedida na URL de listagem
pub fn page_from_url(url: &str) -> Option<u32> {
    PAGE_PARAM
        .captures(url)
        .and_then(|cap| cap[1].parse::<u32>().ok())
}

/// Resolve `href` contra a origem do site. URLs absolutas passam intactas,
/// `//host/...` ganha `https:`.
pub fn absolute_url(base_url: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() || href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", base_url.trim_end_matches('/'), href),
    }
}

// Origem (esquema + host) de uma URL, com barra final
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}/", parsed.scheme(), host, port),
        None => format!("{}://{}/", parsed.scheme(), host),
    })
}

pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Primeiro elemento que casa, testando os seletores na ordem dada.
pub fn select_first<'a>(scope: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|selector| scope.select(selector).next())
}

pub fn parse_selectors(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .map(|p| Selector::parse(p).unwrap())
        .collect()
}
