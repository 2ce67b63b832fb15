//! Respondent records and the request types that create them.

use serde::{Deserialize, Serialize};

/// A stored trigger/response pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Respondent {
    pub id: u64,
    pub author_id: u64,
    pub author_name: String,
    /// Exact message text that activates this respondent.
    #[serde(alias = "match")]
    pub trigger: String,
    /// Whether `content` is markup-escaped before delivery.
    pub escape: bool,
    pub content: String,
}

/// Fields of a respondent before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRespondent {
    pub author_id: u64,
    pub author_name: String,
    pub trigger: String,
    pub escape: bool,
    pub content: String,
}

impl NewRespondent {
    pub fn with_id(self, id: u64) -> Respondent {
        Respondent {
            id,
            author_id: self.author_id,
            author_name: self.author_name,
            trigger: self.trigger,
            escape: self.escape,
            content: self.content,
        }
    }
}

/// The user issuing a command, as reported by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: u64,
    pub name: String,
    /// Privilege level, 0 (guest) through 5 (owner).
    #[serde(default = "default_authority")]
    pub authority: u8,
}

const fn default_authority() -> u8 {
    1
}

impl Actor {
    pub fn new(id: u64, name: &str, authority: u8) -> Self {
        Self {
            id,
            name: name.to_string(),
            authority,
        }
    }
}

/// Field predicate for store queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RespondentFilter {
    pub trigger: Option<String>,
    pub author_id: Option<u64>,
}

impl RespondentFilter {
    /// Filter matching every record with exactly this trigger.
    pub fn trigger(trigger: &str) -> Self {
        Self {
            trigger: Some(trigger.to_string()),
            author_id: None,
        }
    }

    pub fn matches(&self, record: &Respondent) -> bool {
        self.trigger.as_deref().is_none_or(|t| record.trigger == t)
            && self.author_id.is_none_or(|a| record.author_id == a)
    }
}
