use std::io::IsTerminal;

use clap::Args;

use crate::app::App;
use crate::error::ExitError;
use crate::respondent::{Respondent, RespondentFilter};

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only respondents with exactly this trigger
    #[arg(long)]
    pub trigger: Option<String>,
    /// Only respondents posted by this user id
    #[arg(long)]
    pub author: Option<u64>,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Text,
    Json,
}

impl ListArgs {
    pub fn filter(&self) -> RespondentFilter {
        RespondentFilter {
            trigger: self.trigger.clone(),
            author_id: self.author,
        }
    }

    pub async fn execute(&self, app: &App) -> anyhow::Result<()> {
        let format = self.format.unwrap_or_else(|| {
            if std::io::stdout().is_terminal() {
                OutputFormat::Pretty
            } else {
                OutputFormat::Text
            }
        });

        let records = match app.service.list(&self.filter()).await {
            Ok(records) => records,
            Err(e) => {
                let message = app.render_error(&e)?;
                return Err(ExitError::from_respondent(&e, message).into());
            }
        };
        print!("{}", render(app, &records, format)?);
        Ok(())
    }
}

fn render(app: &App, records: &[Respondent], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(records)?)),
        OutputFormat::Text => Ok(records
            .iter()
            .map(|r| format!("{}\t{}\t{}\t{}\n", r.id, r.author_id, r.trigger, r.content.replace('\n', "\\n")))
            .collect()),
        OutputFormat::Pretty => {
            if records.is_empty() {
                return Ok("No respondents.\n".to_string());
            }
            let mut blocks = Vec::with_capacity(records.len());
            for record in records {
                blocks.push(app.render_details(record)?);
            }
            Ok(format!("{}\n", blocks.join("\n\n")))
        }
    }
}
