use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::models::{CompletionStatus, EpisodeRef, SeriesDetail};
use crate::utils::{
    absolute_url, clean_title, element_text, extract_number, parse_selectors, select_first,
};

/// `data-name` do servidor próprio do site (AnimeWorld Server).
pub const NATIVE_SERVER_ID: &str = "9";

static INFO_WIDGET: LazyLock<Vec<Selector>> =
    LazyLock::new(|| parse_selectors(&["div.widget.info"]));
static TITLE: LazyLock<Vec<Selector>> =
    LazyLock::new(|| parse_selectors(&[".info .title", "h2.title", "h1.title"]));
static DESCRIPTION: LazyLock<Vec<Selector>> =
    LazyLock::new(|| parse_selectors(&[".desc .long", ".desc"]));
static COVER: LazyLock<Vec<Selector>> =
    LazyLock::new(|| parse_selectors(&[".thumb img", "#thumbnail-watch img"]));
static GENRE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".meta a[href*='/genre/']").unwrap());
static META_LABEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".meta dt").unwrap());
static META_VALUE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".meta dd").unwrap());

// Blocos de servidor em ordem de preferência: nativo, ativo, primeiro
static SERVER_BLOCKS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    let native = format!(".server[data-name=\"{}\"]", NATIVE_SERVER_ID);
    parse_selectors(&[native.as_str(), ".server.active", ".server"])
});
static EPISODE_LINKS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| parse_selectors(&[".episode a", "a[data-episode-num]"]));

/// Interpreta a página de detalhes de uma série.
///
/// Campos opcionais ausentes viram valores vazios; sem nó de título o
/// resultado é `SeriesDetail::placeholder`.
pub fn parse_detail(html: &str, entry_url: &str, base_url: &str) -> SeriesDetail {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let widget = select_first(root, &INFO_WIDGET).unwrap_or(root);

    let Some(title_node) = select_first(widget, &TITLE) else {
        warn!(entry_url, "detail page without title node");
        return SeriesDetail::placeholder(entry_url);
    };

    let description = select_first(widget, &DESCRIPTION)
        .map(element_text)
        .unwrap_or_default();

    let cover_image_url = select_first(root, &COVER)
        .and_then(|img| img.value().attr("src"))
        .map(|src| absolute_url(base_url, src))
        .unwrap_or_default();

    let genres: BTreeSet<String> = widget
        .select(&GENRE)
        .map(element_text)
        .filter(|g| !g.is_empty())
        .collect();

    SeriesDetail {
        title: clean_title(&element_text(title_node)),
        cover_image_url,
        description,
        genres,
        completion_status: completion_status(widget),
        episodes: episodes(root),
    }
}

// Percorre os pares dt/dd procurando o rótulo "Stato"
fn completion_status(widget: ElementRef<'_>) -> CompletionStatus {
    let labels = widget.select(&META_LABEL);
    let values = widget.select(&META_VALUE);

    for (label, value) in labels.zip(values) {
        if !element_text(label).contains("Stato") {
            continue;
        }
        let status = classify_status(&element_text(value));
        if status != CompletionStatus::Unknown {
            return status;
        }
    }
    CompletionStatus::Unknown
}

pub fn classify_status(value: &str) -> CompletionStatus {
    let value = value.to_lowercase();
    if value.contains("finito") {
        CompletionStatus::Completed
    } else if value.contains("in corso") {
        CompletionStatus::Ongoing
    } else {
        CompletionStatus::Unknown
    }
}

fn episodes(root: ElementRef<'_>) -> Vec<EpisodeRef> {
    let Some(block) = select_server_block(root) else {
        debug!("no server block on detail page");
        return Vec::new();
    };

    let links: Vec<ElementRef> = EPISODE_LINKS
        .iter()
        .map(|selector| block.select(selector).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    let mut episodes: Vec<EpisodeRef> = links
        .into_iter()
        .enumerate()
        .filter_map(|(index, link)| episode_ref(index, link))
        .collect();

    // Na página o mais antigo vem primeiro; quem chama quer o mais recente
    episodes.reverse();
    episodes
}

fn select_server_block(root: ElementRef<'_>) -> Option<ElementRef<'_>> {
    SERVER_BLOCKS
        .iter()
        .find_map(|selector| root.select(selector).next())
}

fn episode_ref(index: usize, link: ElementRef<'_>) -> Option<EpisodeRef> {
    let el = link.value();
    let token = el.attr("data-id").map(str::trim).filter(|id| !id.is_empty())?;

    let label = el
        .attr("data-episode-num")
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| element_text(link));
    let episode_number = extract_number(&label).unwrap_or((index + 1) as f64);
    let label = if label.is_empty() {
        (index + 1).to_string()
    } else {
        label
    };

    Some(EpisodeRef {
        display_name: format!("Episodio {}", label),
        episode_number,
        resolver_token: token.to_string(),
    })
}
