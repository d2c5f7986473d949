use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use crate::models::{CatalogEntry, ListingPage};
use crate::utils::{
    absolute_url, clean_title, element_text, page_from_url, parse_selectors, select_first,
};

/// Ordenação aceita pelo endpoint `/filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Relevance,
    Newest,
    MostViewed,
}

impl SortOrder {
    pub fn code(self) -> u8 {
        match self {
            SortOrder::Relevance => 0,
            SortOrder::Newest => 1,
            SortOrder::MostViewed => 6,
        }
    }
}

/// Monta `{origin}/filter?sort={n}&page={p}[&keyword={q}]`.
pub fn listing_url(base_url: &str, sort: SortOrder, page: u32, keyword: Option<&str>) -> String {
    let page = page.max(1);
    let mut url = format!("{}/filter?sort={}&page={}", base_url, sort.code(), page);
    if let Some(q) = keyword {
        url.push_str("&keyword=");
        url.push_str(&urlencoding::encode(q.trim()));
    }
    url
}

static ITEMS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| parse_selectors(&["div.film-list > .item", "div.film-list .item"]));
static NAME: LazyLock<Vec<Selector>> = LazyLock::new(|| parse_selectors(&["a.name"]));
static POSTER: LazyLock<Vec<Selector>> =
    LazyLock::new(|| parse_selectors(&["a.poster img", "img"]));
static TOTAL_PAGES: LazyLock<Vec<Selector>> =
    LazyLock::new(|| parse_selectors(&["#paging-form span.total", ".paging-wrapper span.total"]));
static CURRENT_PAGE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    parse_selectors(&["#paging-form input[name=\"page\"]", ".paging-wrapper input[name=\"page\"]"])
});
static NEXT_CONTROL: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    parse_selectors(&["#next-page", "a.page-link[rel=\"next\"]", "a.next"])
});

// Função para extrair os itens e o estado da paginação de uma listagem
pub fn parse_listing(html: &str, page_url: &str, base_url: &str) -> ListingPage {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let items: Vec<ElementRef> = ITEMS
        .iter()
        .map(|selector| root.select(selector).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    let mut entries = Vec::new();
    for item in items {
        match parse_entry(item, base_url) {
            Some(entry) => entries.push(entry),
            None => debug!("catalog item without usable name anchor, skipped"),
        }
    }

    let has_next_page = has_next_page(root, page_url);
    debug!(entries = entries.len(), has_next_page, "listing parsed");

    ListingPage {
        entries,
        has_next_page,
    }
}

fn parse_entry(item: ElementRef<'_>, base_url: &str) -> Option<CatalogEntry> {
    let anchor = select_first(item, &NAME)?;
    let href = anchor.value().attr("href").filter(|h| !h.trim().is_empty())?;
    let title = Some(clean_title(&element_text(anchor))).filter(|t| !t.is_empty())?;

    let cover_image_url = select_first(item, &POSTER)
        .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
        .map(|src| absolute_url(base_url, src))
        .unwrap_or_default();

    Some(CatalogEntry {
        title,
        entry_url: absolute_url(base_url, href),
        cover_image_url,
    })
}

// Paginação: contagem de páginas quando legível, senão o botão "próxima"
fn has_next_page(root: ElementRef<'_>, page_url: &str) -> bool {
    let total = select_first(root, &TOTAL_PAGES)
        .and_then(|el| element_text(el).trim().parse::<u32>().ok());
    let current = select_first(root, &CURRENT_PAGE)
        .and_then(|el| el.value().attr("value"))
        .and_then(|v| v.trim().parse::<u32>().ok())
        .or_else(|| page_from_url(page_url));

    if let (Some(current), Some(total)) = (current, total) {
        return by_page_count(current, total);
    }

    select_first(root, &NEXT_CONTROL).is_some_and(is_enabled)
}

pub fn by_page_count(current: u32, total: u32) -> bool {
    current < total
}

fn is_enabled(control: ElementRef<'_>) -> bool {
    let el = control.value();
    if el.attr("disabled").is_some() || el.classes().any(|c| c == "disabled") {
        return false;
    }
    // <li class="disabled"><a id="next-page">
    control
        .parent()
        .and_then(ElementRef::wrap)
        .is_none_or(|parent| !parent.value().classes().any(|c| c == "disabled"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: &str = "https://www.animeworld.ac";

    fn item(i: usize, with_name: bool) -> String {
        let name = if with_name {
            format!(r#"<a class="name" href="/play/anime-{i}.ab{i}">Anime {i} (ITA)</a>"#)
        } else {
            String::new()
        };
        format!(
            r#"<div class="item"><div class="inner">
                <a class="poster" href="/play/anime-{i}.ab{i}"><img src="https://img.animeworld.ac/{i}.jpg"></a>
                {name}
            </div></div>"#
        )
    }

    fn page(items: &str, paging: &str) -> String {
        format!(r#"<html><body><div class="film-list">{items}</div>{paging}</body></html>"#)
    }

    #[test]
    fn entry_without_name_anchor_is_skipped() {
        let items: String = (1..=20).map(|i| item(i, i != 5)).collect();
        let listing = parse_listing(&page(&items, ""), &listing_url(BASE, SortOrder::MostViewed, 1, None), BASE);

        assert_eq!(listing.entries.len(), 19);
        assert!(listing.entries.iter().all(|e| e.title != "Anime 5"));
        assert_eq!(listing.entries[0].title, "Anime 1");
        assert_eq!(listing.entries[0].entry_url, "https://www.animeworld.ac/play/anime-1.ab1");
        assert_eq!(listing.entries[0].cover_image_url, "https://img.animeworld.ac/1.jpg");
    }

    #[test]
    fn entry_with_blank_name_is_skipped() {
        let items = format!(
            r#"{}<div class="item"><a class="name" href="/play/blank.x1">  </a></div>
               <div class="item"><a class="name" href="/play/empty.x2"></a></div>"#,
            item(1, true)
        );
        let listing = parse_listing(&page(&items, ""), "https://x/filter", BASE);

        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].title, "Anime 1");
    }

    #[test]
    fn page_count_strategy_is_preferred() {
        let paging = r#"<div id="paging-form"><input name="page" value="3"><span class="total">3</span>
            <a id="next-page" href="?page=4">next</a></div>"#;
        let listing = parse_listing(&page(&item(1, true), paging), "https://x/filter?page=3", BASE);
        assert!(!listing.has_next_page);

        let paging = r#"<div id="paging-form"><input name="page" value="2"><span class="total">3</span></div>"#;
        let listing = parse_listing(&page(&item(1, true), paging), "https://x/filter", BASE);
        assert!(listing.has_next_page);
    }

    #[test]
    fn current_page_falls_back_to_url() {
        let paging = r#"<div id="paging-form"><span class="total">10</span></div>"#;
        let html = page(&item(1, true), paging);
        assert!(parse_listing(&html, "https://x/filter?sort=1&page=9", BASE).has_next_page);
        assert!(!parse_listing(&html, "https://x/filter?sort=1&page=10", BASE).has_next_page);
    }

    #[test]
    fn next_control_strategy_when_counts_missing() {
        let enabled = r#"<ul class="pagination"><li><a id="next-page" href="?page=2">»</a></li></ul>"#;
        assert!(parse_listing(&page(&item(1, true), enabled), "https://x/filter", BASE).has_next_page);

        let disabled = r#"<ul class="pagination"><li class="disabled"><a id="next-page">»</a></li></ul>"#;
        assert!(!parse_listing(&page(&item(1, true), disabled), "https://x/filter", BASE).has_next_page);
    }

    #[test]
    fn no_pagination_markup_means_last_page() {
        let listing = parse_listing(&page(&item(1, true), ""), "https://x/filter?page=1", BASE);
        assert!(!listing.has_next_page);
    }

    #[test]
    fn empty_document_yields_empty_page() {
        let listing = parse_listing("", "https://x/filter", BASE);
        assert!(listing.entries.is_empty());
        assert!(!listing.has_next_page);
    }

    #[test]
    fn listing_url_encodes_keyword() {
        assert_eq!(
            listing_url(BASE, SortOrder::Relevance, 2, Some("one piece")),
            "https://www.animeworld.ac/filter?sort=0&page=2&keyword=one%20piece"
        );
        assert_eq!(
            listing_url(BASE, SortOrder::Newest, 0, None),
            "https://www.animeworld.ac/filter?sort=1&page=1"
        );
    }

    proptest! {
        #[test]
        fn page_count_terminates(current in 1u32..500, total in 0u32..500) {
            prop_assert_eq!(by_page_count(current, total), current < total);
            let paging = format!(
                r#"<div id="paging-form"><input name="page" value="{current}"><span class="total">{total}</span></div>"#
            );
            let listing = parse_listing(&page(&item(1, true), &paging), "https://x/filter", BASE);
            prop_assert_eq!(listing.has_next_page, current < total);
        }
    }
}
