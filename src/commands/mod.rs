pub mod chat;
pub mod delete;
pub mod init;
pub mod list;
pub mod post;
pub mod schema;
pub mod serve;
pub mod show;

use clap::Subcommand;
use tracing::Instrument;

use crate::app::App;
use crate::error::RespondentError;
use crate::respondent::{Actor, Respondent};
use crate::template::Message;

use delete::DeleteArgs;
use post::PostArgs;
use show::ShowArgs;

/// Respondent commands, shared by the command line and in-chat `dyn-res.*` messages.
#[derive(Debug, Clone, Subcommand)]
pub enum RespondentCommand {
    /// Add a response for a trigger message
    Post(PostArgs),
    /// Show a respondent by id
    Show(ShowArgs),
    /// Delete a respondent by id
    Del(DeleteArgs),
}

/// Successful outcome of a respondent command.
#[derive(Debug)]
pub enum Done {
    Posted(Respondent),
    Shown(Respondent),
    Deleted(Respondent),
}

/// Rendered reply of a respondent command.
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    pub error: Option<RespondentError>,
}

impl RespondentCommand {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::Show(_) => "show",
            Self::Del(_) => "del",
        }
    }

    pub async fn run(&self, app: &App, actor: &Actor) -> Result<Done, RespondentError> {
        match self {
            Self::Post(args) => args.run(app, actor).await.map(Done::Posted),
            Self::Show(args) => args.run(app).await.map(Done::Shown),
            Self::Del(args) => args.run(app, actor).await.map(Done::Deleted),
        }
    }

    /// Run the command and render its reply, failures included.
    pub async fn respond(&self, app: &App, actor: &Actor) -> anyhow::Result<CommandOutput> {
        let span = tracing::info_span!("respondent_command", name = self.name(), actor = actor.id);
        match self.run(app, actor).instrument(span).await {
            Ok(done) => Ok(CommandOutput {
                text: render_done(app, &done)?,
                error: None,
            }),
            Err(err) => Ok(CommandOutput {
                text: app.render_error(&err)?,
                error: Some(err),
            }),
        }
    }
}

fn render_done(app: &App, done: &Done) -> anyhow::Result<String> {
    match done {
        Done::Posted(record) => Ok(format!(
            "{}\n{}",
            app.messages.render(Message::PostSuccess, record)?,
            app.render_details(record)?
        )),
        Done::Shown(record) => app.render_details(record),
        Done::Deleted(record) => app.messages.render(Message::DeleteSuccess, record),
    }
}
