//! Wires configuration into a running set of components.

use std::sync::Arc;

use anyhow::Context;

use crate::assets::LocalAssets;
use crate::config::{Config, StoreBackend};
use crate::dispatch::{Dispatcher, Reply};
use crate::error::RespondentError;
use crate::index::TriggerIndex;
use crate::respondent::Respondent;
use crate::service::RespondentService;
use crate::store::{InMemoryRespondentStore, RespondentStore, SqliteRespondentStore};
use crate::template::{Message, Messages};

pub struct App {
    pub service: RespondentService,
    pub dispatcher: Dispatcher,
    pub messages: Messages,
    pub config: Config,
}

impl App {
    /// Open the configured store and load the trigger index. The index is
    /// complete before this returns, so dispatch can start right away.
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn RespondentStore> = match config.store.backend {
            StoreBackend::Sqlite => Arc::new(
                SqliteRespondentStore::new(&config.store.path)
                    .with_context(|| format!("opening {}", config.store.path.display()))?,
            ),
            StoreBackend::Memory => Arc::new(InMemoryRespondentStore::new()),
        };
        Self::with_store(config, store).await
    }

    pub async fn with_store(config: Config, store: Arc<dyn RespondentStore>) -> anyhow::Result<Self> {
        let messages = Messages::new(&config.messages)?;

        let index = Arc::new(TriggerIndex::new());
        let loaded = index
            .initialize(store.as_ref())
            .await
            .context("loading triggers")?;
        tracing::info!(triggers = loaded, "trigger index ready");

        let mut service = RespondentService::new(store.clone(), index.clone(), config.authority);
        if config.assets.store_assets {
            service = service.with_assets(Arc::new(LocalAssets::from_config(&config.assets)));
        }
        let dispatcher = Dispatcher::new(store, index);

        Ok(Self {
            service,
            dispatcher,
            messages,
            config,
        })
    }

    /// Text delivered for a dispatched reply: the response prefix, then content.
    pub fn render_reply(&self, reply: &Reply) -> anyhow::Result<String> {
        let prefix = self.messages.render(Message::Response, reply)?;
        Ok(format!("{prefix}{}", reply.content))
    }

    pub fn render_details(&self, record: &Respondent) -> anyhow::Result<String> {
        self.messages.render(Message::Details, record)
    }

    /// User-facing text for a failed operation.
    pub fn render_error(&self, err: &RespondentError) -> anyhow::Result<String> {
        use crate::error::ValidationError;

        match err {
            RespondentError::Validation(ValidationError::MissingTrigger) => {
                self.messages.text(Message::MissingTrigger)
            }
            RespondentError::Validation(ValidationError::MissingContent) => {
                self.messages.text(Message::MissingContent)
            }
            RespondentError::Validation(ValidationError::MissingId) => {
                self.messages.text(Message::MissingId)
            }
            RespondentError::NotFound { id } => self
                .messages
                .render(Message::NotFound, minijinja::context! { id => id }),
            RespondentError::Forbidden => self.messages.text(Message::Forbidden),
            RespondentError::Assets(e) => self.messages.render(
                Message::AssetFailure,
                minijinja::context! { error => e.to_string() },
            ),
            RespondentError::Store(e) => {
                tracing::warn!("store failure: {e}");
                self.messages.text(Message::StoreFailure)
            }
        }
    }
}
