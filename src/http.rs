use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::Headers;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(u16),
}

// Resposta HTTP já lida por completo
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Nomes de cabeçalho em minúsculas.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    // Converte status de erro em FetchError, como error_for_status() do reqwest
    pub fn into_success(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status(self.status))
        }
    }
}

/// Capacidade de rede injetada em todos os componentes.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NetworkClient for ReqwestClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, FetchError> {
        debug!(url, "GET");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let resp = request.send().await?;

        let status = resp.status().as_u16();
        let mut response_headers = HashMap::new();
        for (name, value) in resp.headers() {
            if let Ok(value) = value.to_str() {
                // Só o primeiro valor de cada nome importa aqui (ex.: Set-Cookie)
                response_headers
                    .entry(name.as_str().to_ascii_lowercase())
                    .or_insert_with(|| value.to_string());
            }
        }
        let body = resp.text().await?;

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}
