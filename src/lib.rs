//! Extração de streams de episódios do AnimeWorld.
//!
//! Fluxo: listagem do catálogo -> página de detalhes -> token do episódio ->
//! API de informações -> (embed VidGuard) desempacotamento -> assinatura.

pub mod catalog;
pub mod config;
pub mod detail;
pub mod http;
pub mod models;
pub mod player;
pub mod prefs;
pub mod resolver;
pub mod session;
pub mod signature;
pub mod source;
pub mod ui;
pub mod unpacker;
pub mod utils;

pub use config::SourceConfig;
pub use http::{NetworkClient, ReqwestClient};
pub use models::*;
pub use prefs::{JsonFilePreferences, MemoryPreferences, PreferenceStore};
pub use source::AnimeWorld;
