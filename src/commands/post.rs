use clap::Args;

use crate::app::App;
use crate::error::RespondentError;
use crate::respondent::{Actor, Respondent};
use crate::service::PostRequest;

#[derive(Debug, Clone, Args)]
pub struct PostArgs {
    /// Exact message text that triggers the response
    pub trigger: Option<String>,
    /// Response content (remaining words are joined with spaces)
    pub content: Vec<String>,
    /// Deliver content as markup instead of escaping it
    #[arg(short = 'n', long)]
    pub no_escape: bool,
    /// Store content as given, without saving embedded media locally
    #[arg(short = 'r', long)]
    pub raw: bool,
}

impl PostArgs {
    pub fn request(&self) -> PostRequest {
        PostRequest {
            trigger: self.trigger.clone().unwrap_or_default(),
            content: self.content.join(" "),
            no_escape: self.no_escape,
            raw: self.raw,
        }
    }

    pub async fn run(&self, app: &App, actor: &Actor) -> Result<Respondent, RespondentError> {
        app.service.post(actor, self.request()).await
    }

    /// Read the text of an in-chat `post`. Flags may come before the trigger,
    /// right after it, or at the end of the line. The content is everything
    /// in between, kept as written.
    pub fn from_line(line: &str) -> Result<Self, String> {
        let mut args = Self {
            trigger: None,
            content: Vec::new(),
            no_escape: false,
            raw: false,
        };

        let mut rest = line.trim_start();
        while !rest.is_empty() {
            let (token, after) = next_token(rest);
            rest = after.trim_start();
            if args.apply_flag(token) {
                continue;
            }
            args.trigger = Some(unquote(token)?.to_string());
            break;
        }
        if args.trigger.is_none() {
            return Ok(args);
        }

        while !rest.is_empty() {
            let (token, after) = next_token(rest);
            if !args.apply_flag(token) {
                break;
            }
            rest = after.trim_start();
        }

        let mut content = rest;
        while let Some((head, last)) = content.trim_end().rsplit_once(char::is_whitespace) {
            if !args.apply_flag(last) {
                break;
            }
            content = head.trim_end();
        }
        if !content.is_empty() {
            args.content.push(content.to_string());
        }
        Ok(args)
    }

    fn apply_flag(&mut self, token: &str) -> bool {
        match token {
            "-n" | "--no-escape" => self.no_escape = true,
            "-r" | "--raw" => self.raw = true,
            "-nr" | "-rn" => {
                self.no_escape = true;
                self.raw = true;
            }
            _ => return false,
        }
        true
    }
}

/// Split off the first token. A token opening with `"` runs to its closing quote.
fn next_token(text: &str) -> (&str, &str) {
    if let Some(quoted) = text.strip_prefix('"')
        && let Some(end) = quoted.find('"')
    {
        return text.split_at(end + 2);
    }
    text.split_once(char::is_whitespace)
        .map_or((text, ""), |(token, _)| text.split_at(token.len()))
}

fn unquote(token: &str) -> Result<&str, String> {
    match token.strip_prefix('"') {
        Some(inner) => inner
            .strip_suffix('"')
            .ok_or_else(|| "missing closing quote".to_string()),
        None => Ok(token),
    }
}
