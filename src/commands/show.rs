use clap::Args;

use crate::app::App;
use crate::error::RespondentError;
use crate::respondent::Respondent;

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// Respondent id
    pub id: Option<u64>,
}

impl ShowArgs {
    pub async fn run(&self, app: &App) -> Result<Respondent, RespondentError> {
        app.service.show(self.id.unwrap_or_default()).await
    }
}
