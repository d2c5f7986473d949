use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Cabeçalhos HTTP ordenados por nome.
pub type Headers = BTreeMap<String, String>;

// Um item do catálogo (uma série)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub title: String,
    pub entry_url: String,
    pub cover_image_url: String,
}

// Uma página da listagem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingPage {
    pub entries: Vec<CatalogEntry>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CompletionStatus {
    Ongoing,
    Completed,
    #[default]
    Unknown,
}

/// Referência a um episódio na página de detalhes.
///
/// `resolver_token` é o ID interno usado pela API de informações do episódio,
/// nunca uma URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeRef {
    pub display_name: String,
    pub episode_number: f64,
    pub resolver_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDetail {
    pub title: String,
    pub cover_image_url: String,
    pub description: String,
    pub genres: BTreeSet<String>,
    pub completion_status: CompletionStatus,
    pub episodes: Vec<EpisodeRef>,
}

/// Título usado quando a página de detalhes não tem nó de título.
pub const PLACEHOLDER_TITLE: &str = "[Titolo non disponibile]";

impl SeriesDetail {
    // Resultado "vazio" mas renderizável, quando a página não pôde ser lida
    pub fn placeholder(entry_url: &str) -> Self {
        Self {
            title: PLACEHOLDER_TITLE.to_string(),
            cover_image_url: String::new(),
            description: format!("Detail page unavailable: {}", entry_url),
            genres: BTreeSet::new(),
            completion_status: CompletionStatus::Unknown,
            episodes: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.title == PLACEHOLDER_TITLE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetKind {
    Native,
    Embed,
    Unknown,
}

// Resultado intermediário da chamada à API de informações
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub kind: TargetKind,
    pub raw_url: String,
}

/// Stream final, pronto para o player.
///
/// `request_headers` contém tudo que um terceiro precisa enviar para que
/// `playable_url` responda (Referer, User-Agent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamDescriptor {
    pub playable_url: String,
    pub label: String,
    pub kind: TargetKind,
    pub request_headers: Headers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePayload {
    pub encoded_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_serializes_with_headers() {
        let mut request_headers = Headers::new();
        request_headers.insert("Referer".to_string(), "https://listeamed.net/".to_string());
        let stream = StreamDescriptor {
            playable_url: "https://cdn/x.m3u8".to_string(),
            label: "VidGuard".to_string(),
            kind: TargetKind::Embed,
            request_headers,
        };

        let value = serde_json::to_value(&stream).unwrap();
        assert_eq!(value["kind"], "Embed");
        assert_eq!(value["request_headers"]["Referer"], "https://listeamed.net/");
    }

    #[test]
    fn placeholder_serializes_with_empty_episodes() {
        let value = serde_json::to_value(SeriesDetail::placeholder("/play/x.1")).unwrap();
        assert_eq!(value["title"], PLACEHOLDER_TITLE);
        assert_eq!(value["completion_status"], "Unknown");
        assert!(value["episodes"].as_array().is_some_and(Vec::is_empty));
    }
}
