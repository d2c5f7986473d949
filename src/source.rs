use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{SortOrder, listing_url, parse_listing};
use crate::config::SourceConfig;
use crate::detail::parse_detail;
use crate::http::NetworkClient;
use crate::models::{Headers, ListingPage, SeriesDetail, StreamDescriptor};
use crate::prefs::PreferenceStore;
use crate::resolver::EpisodeResolver;
use crate::session::Session;
use crate::unpacker::EmbedUnpacker;
use crate::utils::absolute_url;

/// Fonte AnimeWorld: catálogo, detalhes e resolução de streams.
pub struct AnimeWorld {
    session: Arc<Session>,
    resolver: EpisodeResolver,
}

impl AnimeWorld {
    pub fn new(
        config: SourceConfig,
        client: Arc<dyn NetworkClient>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        // Única sessão: catálogo, detalhes e resolver dividem o mesmo cookie
        let session = Arc::new(Session::new(config, client, prefs));
        let resolver = EpisodeResolver::new(session.clone(), EmbedUnpacker::default());
        Self { session, resolver }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.session.config
    }

    // Mais vistos
    pub async fn list_popular(&self, page: u32) -> ListingPage {
        self.list(SortOrder::MostViewed, page, None).await
    }

    // Últimos adicionados
    pub async fn list_latest(&self, page: u32) -> ListingPage {
        self.list(SortOrder::Newest, page, None).await
    }

    pub async fn search(&self, query: &str, page: u32) -> ListingPage {
        self.list(SortOrder::Relevance, page, Some(query)).await
    }

    async fn list(&self, sort: SortOrder, page: u32, keyword: Option<&str>) -> ListingPage {
        let url = listing_url(&self.session.config.base_url, sort, page, keyword);
        self.scrape_listing(&url).await
    }

    /// Baixa e interpreta uma página de listagem. Falha de rede = página vazia.
    pub async fn scrape_listing(&self, listing_url: &str) -> ListingPage {
        debug!(url = listing_url, "scraping listing");
        match self.session.get(listing_url, &Headers::new()).await {
            Ok(resp) => parse_listing(&resp.body, listing_url, &self.session.config.base_url),
            Err(e) => {
                warn!(url = listing_url, error = %e, "listing request failed");
                ListingPage::default()
            }
        }
    }

    pub async fn get_detail(&self, entry_url: &str) -> SeriesDetail {
        let base_url = &self.session.config.base_url;
        let url = absolute_url(base_url, entry_url);
        debug!(url = %url, "fetching detail page");

        match self.session.get(&url, &Headers::new()).await {
            Ok(resp) => {
                let detail = parse_detail(&resp.body, &url, base_url);
                info!(title = %detail.title, episodes = detail.episodes.len(), "detail parsed");
                detail
            }
            Err(e) => {
                warn!(url = %url, error = %e, "detail request failed");
                SeriesDetail::placeholder(&url)
            }
        }
    }

    pub async fn get_streams(&self, episode_token: &str) -> Vec<StreamDescriptor> {
        self.resolver.resolve(episode_token).await
    }

    /// Resolve vários episódios em paralelo, mantendo a ordem de entrada.
    pub async fn get_streams_many(&self, tokens: &[String]) -> Vec<Vec<StreamDescriptor>> {
        join_all(tokens.iter().map(|token| self.resolver.resolve(token))).await
    }
}
