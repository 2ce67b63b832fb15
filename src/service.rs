//! Create, read and delete respondents while keeping the trigger index in step
//! with the store.

use std::sync::Arc;

use crate::assets::ContentTransformer;
use crate::config::AuthorityConfig;
use crate::error::{RespondentError, ValidationError};
use crate::index::TriggerIndex;
use crate::respondent::{Actor, NewRespondent, Respondent, RespondentFilter};
use crate::store::RespondentStore;

/// Arguments of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRequest {
    pub trigger: String,
    pub content: String,
    /// Deliver the content as markup instead of escaping it.
    pub no_escape: bool,
    /// Store the content as given, skipping asset storage.
    pub raw: bool,
}

impl PostRequest {
    pub fn new(trigger: &str, content: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
            content: content.to_string(),
            ..Self::default()
        }
    }
}

pub struct RespondentService {
    store: Arc<dyn RespondentStore>,
    index: Arc<TriggerIndex>,
    assets: Option<Arc<dyn ContentTransformer>>,
    authority: AuthorityConfig,
}

impl RespondentService {
    pub fn new(
        store: Arc<dyn RespondentStore>,
        index: Arc<TriggerIndex>,
        authority: AuthorityConfig,
    ) -> Self {
        Self {
            store,
            index,
            assets: None,
            authority,
        }
    }

    pub fn with_assets(mut self, assets: Arc<dyn ContentTransformer>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn index(&self) -> &TriggerIndex {
        &self.index
    }

    pub async fn post(
        &self,
        actor: &Actor,
        request: PostRequest,
    ) -> Result<Respondent, RespondentError> {
        if request.trigger.is_empty() {
            return Err(ValidationError::MissingTrigger.into());
        }
        if request.content.is_empty() {
            return Err(ValidationError::MissingContent.into());
        }
        if (request.no_escape || request.raw) && !self.authority.can_use_post_options(actor) {
            return Err(RespondentError::Forbidden);
        }

        let content = match &self.assets {
            Some(assets) if request.no_escape && !request.raw && assets.is_available() => {
                assets.transform(&request.content).await?
            }
            _ => request.content,
        };

        let _guard = self.index.lock(&request.trigger).await;
        let created = self
            .store
            .create(NewRespondent {
                author_id: actor.id,
                author_name: actor.name.clone(),
                trigger: request.trigger,
                escape: !request.no_escape,
                content,
            })
            .await?;
        self.index.add(&created.trigger);

        tracing::info!(id = created.id, author = actor.id, trigger = %created.trigger, "respondent created");
        Ok(created)
    }

    pub async fn show(&self, id: u64) -> Result<Respondent, RespondentError> {
        if id == 0 {
            return Err(ValidationError::MissingId.into());
        }
        self.store
            .get(id)
            .await?
            .ok_or(RespondentError::NotFound { id })
    }

    /// Delete a respondent the actor owns, or any respondent with `force`.
    /// Returns the removed record.
    pub async fn delete(
        &self,
        actor: &Actor,
        id: u64,
        force: bool,
    ) -> Result<Respondent, RespondentError> {
        if id == 0 {
            return Err(ValidationError::MissingId.into());
        }
        let record = self
            .store
            .get(id)
            .await?
            .ok_or(RespondentError::NotFound { id })?;

        let owner = record.author_id == actor.id;
        if !owner && !(force && self.authority.can_force_delete(actor)) {
            tracing::debug!(id, actor = actor.id, "delete refused");
            return Err(RespondentError::Forbidden);
        }

        let guard = self.index.lock(&record.trigger).await;
        if !self.store.delete(id).await? {
            // Lost a race with another delete of the same id.
            return Err(RespondentError::NotFound { id });
        }
        // The store write is committed; a failed recheck leaves the trigger
        // present and dispatch prunes it later.
        if let Err(e) = self
            .index
            .remove_if_orphaned(&guard, self.store.as_ref())
            .await
        {
            tracing::warn!(id, trigger = %record.trigger, "index update after delete failed: {e}");
        }
        drop(guard);

        tracing::info!(id, actor = actor.id, forced = !owner, "respondent deleted");
        Ok(record)
    }

    pub async fn list(&self, filter: &RespondentFilter) -> Result<Vec<Respondent>, RespondentError> {
        Ok(self.store.query(filter).await?)
    }
}
