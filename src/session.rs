use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::http::{FetchError, HttpResponse, NetworkClient};
use crate::models::Headers;
use crate::prefs::PreferenceStore;

pub const COOKIE_PREF_KEY: &str = "security_cookie";

/// Acesso ao site: cliente injetado, cabeçalhos padrão e o cookie de
/// segurança, lido uma única vez por processo.
///
/// O cache do cookie vive na instância: o processo deve ter uma única
/// `Session`, compartilhada via `Arc` (é o que `AnimeWorld::new` faz).
pub struct Session {
    pub config: SourceConfig,
    client: Arc<dyn NetworkClient>,
    prefs: Arc<dyn PreferenceStore>,
    cookie: OnceCell<Option<String>>,
}

impl Session {
    pub fn new(
        config: SourceConfig,
        client: Arc<dyn NetworkClient>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            config,
            client,
            prefs,
            cookie: OnceCell::new(),
        }
    }

    /// GET no site: padrões, depois `extra`, depois o cookie.
    /// Status fora de 2xx vira erro.
    pub async fn get(&self, url: &str, extra: &Headers) -> Result<HttpResponse, FetchError> {
        let mut headers = self.config.headers();
        headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(cookie) = self.security_cookie().await {
            headers.insert("Cookie".to_string(), cookie.to_string());
        }
        self.client.get(url, &headers).await?.into_success()
    }

    // GET num terceiro (embed): sem o cookie do site
    pub async fn get_external(
        &self,
        url: &str,
        headers: &Headers,
    ) -> Result<HttpResponse, FetchError> {
        self.client.get(url, headers).await?.into_success()
    }

    pub async fn security_cookie(&self) -> Option<&str> {
        self.cookie
            .get_or_init(|| self.load_cookie())
            .await
            .as_deref()
    }

    // Preferência salva, ou o primeiro segmento do Set-Cookie da home
    async fn load_cookie(&self) -> Option<String> {
        if let Some(saved) = self.prefs.get(COOKIE_PREF_KEY) {
            return Some(saved);
        }

        let resp = match self
            .client
            .get(&self.config.base_url, &self.config.headers())
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "could not bootstrap security cookie");
                return None;
            }
        };

        let cookie = resp
            .header("set-cookie")
            .and_then(|raw| raw.split(';').next())
            .map(str::trim)
            .filter(|c| !c.is_empty())?
            .to_string();

        debug!(cookie = %cookie, "security cookie obtained");
        if let Err(e) = self.prefs.set(COOKIE_PREF_KEY, &cookie) {
            warn!(error = %e, "could not persist security cookie");
        }
        Some(cookie)
    }
}
