//! Per-message matching: index check, random pick, escaping.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

use crate::index::TriggerIndex;
use crate::respondent::RespondentFilter;
use crate::store::{RespondentStore, StoreResult};

/// The respondent chosen to answer a message, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub id: u64,
    pub author_name: String,
    pub trigger: String,
    /// Content after escaping, if the record asked for it.
    pub content: String,
}

pub struct Dispatcher {
    store: Arc<dyn RespondentStore>,
    index: Arc<TriggerIndex>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn RespondentStore>, index: Arc<TriggerIndex>) -> Self {
        Self { store, index }
    }

    /// Find a reply for a message body. `None` means the message passes through.
    pub async fn dispatch(&self, body: &str) -> StoreResult<Option<Reply>> {
        if !self.index.contains(body) {
            return Ok(None);
        }

        let candidates = self
            .store
            .query_ids(&RespondentFilter::trigger(body))
            .await?;
        if candidates.is_empty() {
            tracing::debug!(trigger = body, "index hit without stored respondents");
            self.prune(body).await;
            return Ok(None);
        }

        let id = candidates[pick_index(candidates.len())];
        let Some(record) = self.store.get(id).await? else {
            // Deleted between the two reads.
            tracing::debug!(id, "picked respondent vanished");
            return Ok(None);
        };
        tracing::debug!(id, candidates = candidates.len(), "respondent selected");

        let content = if record.escape {
            escape_markup(&record.content)
        } else {
            record.content
        };
        Ok(Some(Reply {
            id: record.id,
            author_name: record.author_name,
            trigger: record.trigger,
            content,
        }))
    }

    async fn prune(&self, trigger: &str) {
        let guard = self.index.lock(trigger).await;
        if let Err(e) = self.index.remove_if_orphaned(&guard, self.store.as_ref()).await {
            tracing::warn!(trigger, "failed to prune stale trigger: {e}");
        }
    }
}

/// Uniform draw over `0..len`. `len` must be non-zero.
fn pick_index(len: usize) -> usize {
    rand::rng().random_range(0..len)
}

/// Escape the markup-significant characters `& < > " '`.
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
