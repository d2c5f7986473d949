//! Extração do payload ofuscado das páginas de embed (VidGuard).
//!
//! A página traz um `<script>` no formato `eval(function(p,a,c,k,e,d){...})`.
//! Depois de desempacotado, o código atribui a `window.svg` um objeto no
//! estilo JSON cujo campo `stream` é a URL com a assinatura a decodificar.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::models::SignaturePayload;

static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

static PACKED_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"eval\(\s*function\s*\(\s*p\s*,\s*a\s*,\s*c\s*,\s*k\s*,\s*e\s*,\s*[dr]\s*\)").unwrap());

static PACKED_ARGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\}\s*\(\s*'(.*)'\s*,\s*(\d+|\[\])\s*,\s*(\d+)\s*,\s*'(.*?)'\.split\('\|'\)")
        .unwrap()
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());

static SVG_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bsvg\s*=\s*\{").unwrap());

// Extrator restrito: só procura o campo `stream`, com ou sem aspas na chave.
// Não é um parser de objetos JS.
static STREAM_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?\bstream["']?\s*:\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

const BASE62: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Primitiva que reverte o empacotamento e devolve o código literal.
pub trait ScriptUnpacker: Send + Sync {
    fn unpack(&self, script: &str) -> Option<String>;
}

/// Desempacotador do formato `p,a,c,k,e,d` (Dean Edwards).
#[derive(Debug, Default, Clone, Copy)]
pub struct PackerUnpacker;

impl ScriptUnpacker for PackerUnpacker {
    fn unpack(&self, script: &str) -> Option<String> {
        let caps = PACKED_ARGS.captures(script)?;

        let payload = unescape_js(caps.get(1)?.as_str());
        let radix = match caps.get(2)?.as_str() {
            "[]" => 62,
            n => n.parse::<u32>().ok()?,
        };
        if !(2..=62).contains(&radix) {
            debug!(radix, "unsupported packer radix");
            return None;
        }
        let words: Vec<&str> = caps.get(4)?.as_str().split('|').collect();

        let source = WORD.replace_all(&payload, |w: &regex::Captures| {
            let token = &w[0];
            match unbase(token, radix).and_then(|i| words.get(i)) {
                Some(word) if !word.is_empty() => (*word).to_string(),
                _ => token.to_string(),
            }
        });

        Some(source.into_owned())
    }
}

// Lê um token como número na base do empacotador
fn unbase(token: &str, radix: u32) -> Option<usize> {
    if radix <= 36 {
        return usize::from_str_radix(token, radix).ok();
    }
    token.bytes().try_fold(0usize, |acc, b| {
        let digit = BASE62.iter().position(|&c| c == b)?;
        if digit >= radix as usize {
            return None;
        }
        acc.checked_mul(radix as usize)?.checked_add(digit)
    })
}

fn unescape_js(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('\'' | '\\')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Localiza o script empacotado numa página de embed e extrai a assinatura.
pub struct EmbedUnpacker {
    unpacker: Box<dyn ScriptUnpacker>,
}

impl Default for EmbedUnpacker {
    fn default() -> Self {
        Self::new(Box::new(PackerUnpacker))
    }
}

impl EmbedUnpacker {
    pub fn new(unpacker: Box<dyn ScriptUnpacker>) -> Self {
        Self { unpacker }
    }

    /// `None` quando qualquer etapa não encontra o que procura.
    pub fn unpack(&self, embed_page_body: &str) -> Option<SignaturePayload> {
        let Some(packed) = find_packed_script(embed_page_body) else {
            warn!("no packed script in embed page");
            return None;
        };

        let Some(source) = self.unpacker.unpack(&packed) else {
            warn!("packed script could not be unpacked");
            return None;
        };

        let token = extract_stream_field(&source);
        if token.is_none() {
            warn!("unpacked script has no svg.stream field");
        }
        token.map(|encoded_token| SignaturePayload { encoded_token })
    }
}

fn find_packed_script(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    document
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
        .find(|text| PACKED_HEADER.is_match(text))
}

pub fn extract_stream_field(source: &str) -> Option<String> {
    let start = SVG_ASSIGNMENT.find(source)?.start();
    let caps = STREAM_FIELD.captures(&source[start..])?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    if raw.is_empty() {
        return None;
    }
    Some(raw.replace("\\/", "/"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Empacota um código no formato p,a,c,k,e,d com base 10: cada palavra
    /// do dicionário é trocada pelo seu índice.
    pub(crate) fn pack(source: &str, words: &[&str]) -> String {
        let mut payload = source.to_string();
        for (i, word) in words.iter().enumerate().rev() {
            payload = payload.replace(word, &i.to_string());
        }
        format!(
            "eval(function(p,a,c,k,e,d){{e=function(c){{return c}};if(!''.replace(/^/,String)){{while(c--)d[c]=k[c]||c;k=[function(e){{return d[e]}}];e=function(){{return'\\\\w+'}};c=1}};while(c--)if(k[c])p=p.replace(new RegExp('\\\\b'+e(c)+'\\\\b','g'),k[c]);return p}}('{}',10,{},'{}'.split('|'),0,{{}}))",
            payload.replace('\'', "\\'"),
            words.len(),
            words.join("|")
        )
    }

    #[test]
    fn unbase_handles_high_radix() {
        assert_eq!(unbase("z", 36), Some(35));
        assert_eq!(unbase("A", 62), Some(36));
        assert_eq!(unbase("10", 62), Some(62));
        assert_eq!(unbase("Z", 40), None);
    }

    #[test]
    fn unescapes_quotes_and_backslashes() {
        assert_eq!(unescape_js(r"it\'s \\ ok \n"), r"it's \ ok \n");
    }

    #[test]
    fn unpacks_dictionary_words() {
        let packed = pack(
            "window.svg={stream:'https://v.example.com/x.m3u8?sig=ab'};",
            &["window", "svg", "stream"],
        );
        let source = PackerUnpacker.unpack(&packed).unwrap();
        assert_eq!(source, "window.svg={stream:'https://v.example.com/x.m3u8?sig=ab'};");
    }

    #[test]
    fn empty_dictionary_word_keeps_token() {
        let script = "eval(function(p,a,c,k,e,d){}('0 1 2',10,3,'foo||bar'.split('|'),0,{}))";
        assert_eq!(PackerUnpacker.unpack(script).unwrap(), "foo 1 bar");
    }

    #[test]
    fn not_packed_is_none() {
        assert_eq!(PackerUnpacker.unpack("var x = 1;"), None);
    }

    #[test]
    fn stream_field_with_quoted_and_unquoted_keys() {
        assert_eq!(
            extract_stream_field(r#"window.svg={"stream":"https:\/\/a.b\/c?sig=1","hash":"x"};"#)
                .as_deref(),
            Some("https://a.b/c?sig=1")
        );
        assert_eq!(
            extract_stream_field("window.svg = {hash:'x', stream: 'https://a.b/c'}").as_deref(),
            Some("https://a.b/c")
        );
        assert_eq!(extract_stream_field("var other={stream:'x'}"), None);
    }

    #[test]
    fn embed_page_round_trip() {
        let packed = pack(
            "window.svg={\"stream\":\"https://v.example.com/x.m3u8?sig=abcd\"};",
            &["window", "svg", "stream"],
        );
        let body = format!(
            "<html><head><script>var noise=1;</script><script>{}</script></head></html>",
            packed
        );
        let payload = EmbedUnpacker::default().unpack(&body).unwrap();
        assert_eq!(payload.encoded_token, "https://v.example.com/x.m3u8?sig=abcd");
    }

    #[test]
    fn page_without_packed_script_is_not_found() {
        let body = "<html><script>console.log('hi')</script></html>";
        assert_eq!(EmbedUnpacker::default().unpack(body), None);
    }

    #[test]
    fn unpacked_script_without_svg_is_not_found() {
        let packed = pack("var a={stream:'x'};", &["stream"]);
        let body = format!("<script>{}</script>", packed);
        assert_eq!(EmbedUnpacker::default().unpack(&body), None);
    }
}
