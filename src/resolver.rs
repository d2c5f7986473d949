use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::models::{Headers, ResolvedTarget, StreamDescriptor, TargetKind};
use crate::session::Session;
use crate::signature;
use crate::unpacker::EmbedUnpacker;
use crate::utils::{absolute_url, origin_of};

pub const NATIVE_LABEL: &str = "AnimeWorld Server";
pub const EMBED_LABEL: &str = "VidGuard";

// Domínios da família VidGuard
const EMBED_MARKERS: &[&str] = &[
    "vidguard", "vid-guard", "listeamed", "vgfplay", "vgembed", "vembed", "bembed", "v6embed",
];

// Resposta de /api/episode/info
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeInfo {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub grabber: Option<String>,
}

pub fn info_url(api_origin: &str, token: &str) -> String {
    format!(
        "{}/api/episode/info?id={}",
        api_origin.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

pub fn is_embed_provider(target: &str) -> bool {
    let target = target.to_lowercase();
    EMBED_MARKERS.iter().any(|marker| target.contains(marker))
}

/// Classifica a resposta: `grabber` tem prioridade, depois embed conhecido,
/// senão o `target` cru.
pub fn classify(info: &EpisodeInfo) -> ResolvedTarget {
    if let Some(grabber) = info.grabber.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        return ResolvedTarget {
            kind: TargetKind::Native,
            raw_url: grabber.to_string(),
        };
    }

    let kind = if is_embed_provider(&info.target) {
        TargetKind::Embed
    } else {
        TargetKind::Unknown
    };
    ResolvedTarget {
        kind,
        raw_url: info.target.trim().to_string(),
    }
}

/// Transforma o token de um episódio em streams tocáveis.
pub struct EpisodeResolver {
    session: Arc<Session>,
    unpacker: EmbedUnpacker,
}

impl EpisodeResolver {
    pub fn new(session: Arc<Session>, unpacker: EmbedUnpacker) -> Self {
        Self { session, unpacker }
    }

    /// No máximo um stream; falhas viram lista vazia, nunca erro.
    pub async fn resolve(&self, episode_token: &str) -> Vec<StreamDescriptor> {
        let config = &self.session.config;
        let url = info_url(&config.api_origin, episode_token);

        let mut headers = Headers::new();
        headers.insert("Referer".to_string(), config.base_url.clone());
        headers.insert("X-Requested-With".to_string(), "XMLHttpRequest".to_string());

        let body = match self.session.get(&url, &headers).await {
            Ok(resp) => resp.body,
            Err(e) => {
                warn!(token = episode_token, error = %e, "episode info request failed");
                return Vec::new();
            }
        };

        let info: EpisodeInfo = match serde_json::from_str(&body) {
            Ok(info) => info,
            Err(e) => {
                warn!(token = episode_token, error = %e, "episode info is not valid json");
                return Vec::new();
            }
        };

        let target = classify(&info);
        debug!(token = episode_token, kind = ?target.kind, url = %target.raw_url, "episode target");

        match target.kind {
            TargetKind::Native => vec![self.native(target.raw_url)],
            TargetKind::Embed => self.embed(&target.raw_url).await.into_iter().collect(),
            TargetKind::Unknown => self.fallback(target.raw_url).into_iter().collect(),
        }
    }

    fn native(&self, grabber: String) -> StreamDescriptor {
        let config = &self.session.config;
        StreamDescriptor {
            playable_url: grabber,
            label: NATIVE_LABEL.to_string(),
            kind: TargetKind::Native,
            request_headers: player_headers(&config.base_url, &config.user_agent),
        }
    }

    // Página do embed -> script desempacotado -> assinatura corrigida
    async fn embed(&self, target: &str) -> Option<StreamDescriptor> {
        let config = &self.session.config;
        let embed_url = absolute_url(&config.base_url, target);

        let mut headers = Headers::new();
        headers.insert("Referer".to_string(), config.base_url.clone());
        headers.insert("User-Agent".to_string(), config.user_agent.clone());

        let page = match self.session.get_external(&embed_url, &headers).await {
            Ok(resp) => resp.body,
            Err(e) => {
                warn!(url = %embed_url, error = %e, "embed page request failed");
                return None;
            }
        };

        let payload = self.unpacker.unpack(&page)?;
        let playable_url = signature::decode(&payload.encoded_token);
        let referer = origin_of(&embed_url).unwrap_or_else(|| embed_url.clone());

        Some(StreamDescriptor {
            playable_url,
            label: EMBED_LABEL.to_string(),
            kind: TargetKind::Embed,
            request_headers: player_headers(&referer, &config.user_agent),
        })
    }

    // Último recurso: repassa o target como veio
    fn fallback(&self, target: String) -> Option<StreamDescriptor> {
        if target.is_empty() {
            return None;
        }
        let config = &self.session.config;
        let label = Url::parse(&target)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string());

        Some(StreamDescriptor {
            playable_url: target,
            label,
            kind: TargetKind::Unknown,
            request_headers: player_headers(&config.base_url, &config.user_agent),
        })
    }
}

fn player_headers(referer: &str, user_agent: &str) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Referer".to_string(), referer.to_string());
    headers.insert("User-Agent".to_string(), user_agent.to_string());
    headers
}
