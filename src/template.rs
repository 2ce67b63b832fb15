//! Reply templates for command results and delivered responses.

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::config::MessagesConfig;

pub const DEFAULT_POST_SUCCESS: &str = "Respondent created.";
pub const DEFAULT_DELETE_SUCCESS: &str = "Respondent #{{ id }} deleted.";
pub const DEFAULT_DETAILS: &str = "#{{ id }} by {{ author_name }} ({{ author_id }})
Trigger: {{ trigger }}
Escape: {{ \"yes\" if escape else \"no\" }}
Content: {{ content }}";
pub const DEFAULT_NOT_FOUND: &str = "Respondent #{{ id }} not found.";
pub const DEFAULT_FORBIDDEN: &str = "You are not allowed to do that.";
pub const DEFAULT_MISSING_TRIGGER: &str = "Please provide the message to match.";
pub const DEFAULT_MISSING_CONTENT: &str = "Please provide the response content.";
pub const DEFAULT_MISSING_ID: &str = "Please provide a respondent id.";
pub const DEFAULT_STORE_FAILURE: &str = "The respondent store is unavailable, try again later.";
pub const DEFAULT_ASSET_FAILURE: &str = "Could not save the attached media: {{ error }}";

/// Names under which each message template is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    PostSuccess,
    DeleteSuccess,
    Details,
    NotFound,
    Forbidden,
    MissingTrigger,
    MissingContent,
    MissingId,
    Response,
    StoreFailure,
    AssetFailure,
}

impl Message {
    const ALL: [Self; 11] = [
        Self::PostSuccess,
        Self::DeleteSuccess,
        Self::Details,
        Self::NotFound,
        Self::Forbidden,
        Self::MissingTrigger,
        Self::MissingContent,
        Self::MissingId,
        Self::Response,
        Self::StoreFailure,
        Self::AssetFailure,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PostSuccess => "post_success",
            Self::DeleteSuccess => "delete_success",
            Self::Details => "details",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::MissingTrigger => "missing_trigger",
            Self::MissingContent => "missing_content",
            Self::MissingId => "missing_id",
            Self::Response => "response",
            Self::StoreFailure => "store_failure",
            Self::AssetFailure => "asset_failure",
        }
    }

    fn source(self, messages: &MessagesConfig) -> &str {
        match self {
            Self::PostSuccess => &messages.post_success,
            Self::DeleteSuccess => &messages.delete_success,
            Self::Details => &messages.details,
            Self::NotFound => &messages.not_found,
            Self::Forbidden => &messages.forbidden,
            Self::MissingTrigger => &messages.missing_trigger,
            Self::MissingContent => &messages.missing_content,
            Self::MissingId => &messages.missing_id,
            Self::Response => &messages.response,
            Self::StoreFailure => &messages.store_failure,
            Self::AssetFailure => &messages.asset_failure,
        }
    }
}

/// Compiled reply templates.
#[derive(Debug)]
pub struct Messages {
    env: Environment<'static>,
}

impl Messages {
    /// Compile every template up front so a bad override fails at startup.
    pub fn new(config: &MessagesConfig) -> anyhow::Result<Self> {
        let mut env = Environment::new();
        // Content escaping is decided per respondent, never by the template.
        env.set_auto_escape_callback(|_: &str| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        for message in Message::ALL {
            env.add_template_owned(message.as_str(), message.source(config).to_string())
                .map_err(|e| anyhow::anyhow!("invalid [messages] {}: {e}", message.as_str()))?;
        }
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, message: Message, ctx: S) -> anyhow::Result<String> {
        let template = self.env.get_template(message.as_str())?;
        Ok(template.render(ctx)?)
    }

    /// Render a message that takes no context.
    pub fn text(&self, message: Message) -> anyhow::Result<String> {
        self.render(message, minijinja::context! {})
    }
}

impl Default for Messages {
    fn default() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_: &str| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        let defaults = MessagesConfig::default();
        for message in Message::ALL {
            // Built-in templates are fixed strings covered by tests.
            let _ = env.add_template_owned(message.as_str(), message.source(&defaults).to_string());
        }
        Self { env }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::respondent::Respondent;

    fn record() -> Respondent {
        Respondent {
            id: 7,
            author_id: 3,
            author_name: "alice".to_string(),
            trigger: "hello".to_string(),
            escape: false,
            content: "<b>hi</b>".to_string(),
        }
    }

    #[test]
    fn all_default_templates_compile() {
        let messages = Messages::new(&MessagesConfig::default()).unwrap();
        for message in Message::ALL {
            messages.render(message, minijinja::context! { id => 1 }).unwrap();
        }
    }

    #[test]
    fn details_render_record_fields_without_escaping() {
        let messages = Messages::default();
        let rendered = messages.render(Message::Details, record()).unwrap();
        assert_eq!(
            rendered,
            "#7 by alice (3)\nTrigger: hello\nEscape: no\nContent: <b>hi</b>"
        );
    }

    #[test]
    fn default_response_prefix_is_empty() {
        let messages = Messages::default();
        assert_eq!(messages.render(Message::Response, record()).unwrap(), "");
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = MessagesConfig {
            not_found: "no #{{ id }} here".to_string(),
            ..MessagesConfig::default()
        };
        let messages = Messages::new(&config).unwrap();
        assert_eq!(
            messages
                .render(Message::NotFound, minijinja::context! { id => 9 })
                .unwrap(),
            "no #9 here"
        );
    }

    #[test]
    fn invalid_override_is_rejected() {
        let config = MessagesConfig {
            details: "{% if %}".to_string(),
            ..MessagesConfig::default()
        };
        let err = Messages::new(&config).unwrap_err();
        assert!(err.to_string().contains("invalid [messages] details"));
    }
}
