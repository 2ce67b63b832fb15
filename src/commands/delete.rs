use clap::Args;

use crate::app::App;
use crate::error::RespondentError;
use crate::respondent::{Actor, Respondent};

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    /// Respondent id
    pub id: Option<u64>,
    /// Delete a respondent posted by someone else (needs authority)
    #[arg(short, long)]
    pub force: bool,
}

impl DeleteArgs {
    pub async fn run(&self, app: &App, actor: &Actor) -> Result<Respondent, RespondentError> {
        app.service
            .delete(actor, self.id.unwrap_or_default(), self.force)
            .await
    }
}
