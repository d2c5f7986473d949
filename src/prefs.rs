use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::config_path;

/// Armazenamento chave/valor de preferências, compartilhado pelo processo.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// Preferências só em memória (testes, execuções efêmeras)
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().ok()?;
        values.get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("preferências envenenadas"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferências persistidas em JSON no diretório de configuração.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFilePreferences {
    pub fn open_default() -> Result<Self> {
        Self::open(config_path("preferences.json")?)
    }

    // Carrega o arquivo, ou começa vazio se não existir
    pub fn open(path: PathBuf) -> Result<Self> {
        let values = if path.exists() {
            let contents = fs::read_to_string(&path)
                .context("Falha ao ler arquivo de preferências")?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)
                    .context("Falha ao deserializar preferências")?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        // Cria o diretório se não existir
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context("Falha ao criar diretório para preferências")?;
        }

        let json =
            serde_json::to_string_pretty(values).context("Falha ao serializar preferências")?;
        fs::write(&self.path, json).context("Falha ao escrever preferências no arquivo")?;

        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().ok()?;
        values.get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("preferências envenenadas"))?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }
}
