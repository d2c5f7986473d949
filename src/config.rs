use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::models::Headers;

pub const DEFAULT_BASE_URL: &str = "https://www.animeworld.ac";
// A API de episódios responde no domínio .so, não no do catálogo
pub const DEFAULT_API_ORIGIN: &str = "https://www.animeworld.so";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const APP_DIR: &str = "animeworld";

// Configuração da fonte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_origin: String,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_origin: DEFAULT_API_ORIGIN.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceConfig {
    // Carrega a configuração do arquivo, ou usa os padrões se não existir
    pub fn load() -> Result<Self> {
        let path = config_path("config.json")?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Falha ao ler configuração: {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(contents).context("Falha ao deserializar configuração")?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        config.api_origin = config.api_origin.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Cabeçalhos enviados em toda requisição ao site.
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("User-Agent".to_string(), self.user_agent.clone());
        headers.insert("Referer".to_string(), self.base_url.clone());
        headers.insert("Origin".to_string(), self.base_url.clone());
        headers
    }
}

// Obtém o caminho de um arquivo no diretório de configuração do app
pub fn config_path(file_name: &str) -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().context("Não foi possível determinar o diretório de configuração")?;

    path.push(APP_DIR);
    path.push(file_name);

    Ok(path)
}
