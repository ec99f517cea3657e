//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use anonchat_core::{AnyStore, ChatRoom, UploadDir};
use minijinja::Environment;

use crate::config::Config;
use crate::routes::pages;

/// State shared across all HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// The one chat room: message log and upload directory.
    pub room: ChatRoom<AnyStore>,
    /// Page templates.
    pub templates: Environment<'static>,
}

impl AppState {
    /// Open the configured store and upload directory.
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        let store = AnyStore::open(&config.store_url, config.max_messages).await?;
        let uploads = UploadDir::open(&config.upload_dir, config.max_upload_bytes).await?;
        Self::new(config, ChatRoom::new(store, uploads))
    }

    pub fn new(config: Config, room: ChatRoom<AnyStore>) -> anyhow::Result<Self> {
        Ok(Self {
            config: Arc::new(config),
            room,
            templates: pages::environment()?,
        })
    }
}
