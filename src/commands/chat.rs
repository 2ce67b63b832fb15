use clap::Parser;
use serde::Deserialize;

use super::RespondentCommand;
use super::post::PostArgs;
use crate::app::App;
use crate::respondent::Actor;

/// Prefix of in-chat commands, e.g. `dyn-res.post hello hi there`.
pub const COMMAND_PREFIX: &str = "dyn-res.";

// ---------------------------------------------------------------------------
// Message routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    /// `dyn-res.<command> ...`, with the prefix removed.
    Command(&'a str),
    /// Anything else is matched against triggers, untouched.
    Message(&'a str),
}

/// Decide how a message body is handled.
///
/// Only the command prefix is inspected; plain messages are passed on
/// verbatim because triggers match the exact body, whitespace included.
pub fn route_message(body: &str) -> Route<'_> {
    match body.trim_start().strip_prefix(COMMAND_PREFIX) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_alphabetic()) => Route::Command(rest),
        _ => Route::Message(body),
    }
}

#[derive(Debug, Parser)]
#[command(name = "dyn-res", no_binary_name = true, disable_version_flag = true)]
struct ChatCli {
    #[command(subcommand)]
    command: RespondentCommand,
}

/// Parse the text after the command prefix. `Err` carries the usage text to
/// send back.
///
/// `post` is read by hand so its content survives exactly as typed; the other
/// commands only take ids and flags and go through shell-style splitting.
pub fn parse_command(text: &str) -> Result<RespondentCommand, String> {
    let text = text.trim_start();
    if let Some(rest) = text.strip_prefix("post")
        && (rest.is_empty() || rest.starts_with(char::is_whitespace))
    {
        return PostArgs::from_line(rest).map(RespondentCommand::Post);
    }
    let tokens = shell_words::split(text).map_err(|e| format!("{e}"))?;
    ChatCli::try_parse_from(tokens)
        .map(|cli| cli.command)
        .map_err(|e| e.render().to_string().trim_end().to_string())
}

// ---------------------------------------------------------------------------
// Session events
// ---------------------------------------------------------------------------

/// A message received from a chat session.
#[derive(Debug, Clone, Deserialize)]
pub struct Incoming {
    /// Opaque correlation id echoed back with the reply.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub user_id: u64,
    #[serde(default)]
    pub user_name: String,
    #[serde(default = "default_authority")]
    pub authority: u8,
    pub content: String,
}

const fn default_authority() -> u8 {
    1
}

impl Incoming {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, &self.user_name, self.authority)
    }
}

/// Handle one incoming message. `None` means no reply is sent.
pub async fn handle_message(app: &App, event: &Incoming) -> anyhow::Result<Option<String>> {
    match route_message(&event.content) {
        Route::Command(text) => {
            let command = match parse_command(text) {
                Ok(command) => command,
                Err(usage) => return Ok(Some(usage)),
            };
            let output = command.respond(app, &event.actor()).await?;
            Ok(Some(output.text))
        }
        Route::Message(body) => match app.dispatcher.dispatch(body).await {
            Ok(Some(reply)) => Ok(Some(app.render_reply(&reply)?)),
            Ok(None) => Ok(None),
            Err(e) => {
                // Never break the message pipeline over a lookup failure.
                tracing::warn!("dispatch failed: {e}");
                Ok(None)
            }
        },
    }
}
