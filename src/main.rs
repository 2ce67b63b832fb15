use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::Instrument;

use dynres::app::App;
use dynres::commands::RespondentCommand;
use dynres::commands::init::InitArgs;
use dynres::commands::list::ListArgs;
use dynres::commands::serve::ServeArgs;
use dynres::config::Config;
use dynres::error::{self, ExitError};
use dynres::respondent::Actor;
use dynres::telemetry;

#[derive(Debug, Parser)]
#[command(
    name = "dynres",
    version,
    about = "User-defined trigger/response pairs for chat sessions"
)]
struct Cli {
    /// Config file (default: .dynres.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(flatten)]
    actor: ActorArgs,
    #[command(subcommand)]
    command: Commands,
}

/// Identity for one-shot commands; defaults come from `[operator]`.
#[derive(Debug, Args)]
struct ActorArgs {
    /// Acting user id
    #[arg(long, global = true)]
    user_id: Option<u64>,
    /// Acting user name
    #[arg(long, global = true)]
    user_name: Option<String>,
    /// Acting user's authority level
    #[arg(long, global = true)]
    authority: Option<u8>,
}

impl ActorArgs {
    fn resolve(&self, config: &Config) -> Actor {
        let mut actor = config.operator.actor();
        if let Some(id) = self.user_id {
            actor.id = id;
        }
        if let Some(name) = &self.user_name {
            actor.name.clone_from(name);
        }
        if let Some(authority) = self.authority {
            actor.authority = authority;
        }
        actor
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(flatten)]
    Respondent(RespondentCommand),
    /// List stored respondents
    List(ListArgs),
    /// Answer chat events read as JSON lines from stdin
    Serve(ServeArgs),
    /// Write a default .dynres.toml
    Init(InitArgs),
    /// Print the JSON Schema for .dynres.toml
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Respondent(command) => command.name(),
            Self::List(_) => "list",
            Self::Serve(_) => "serve",
            Self::Init(_) => "init",
            Self::Schema => "schema",
        }
    }
}

async fn open(config_path: Option<&Path>) -> anyhow::Result<App> {
    let cwd = std::env::current_dir().context("resolving current directory")?;
    let (config, source) = Config::discover(config_path, &cwd)?;
    if let Some(path) = &source {
        tracing::debug!(path = %path.display(), "config loaded");
    }
    App::open(config).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Respondent(command) => {
            let app = open(config_path).await?;
            let actor = cli.actor.resolve(&app.config);
            let output = command.respond(&app, &actor).await?;
            match output.error {
                None => {
                    println!("{}", output.text);
                    Ok(())
                }
                Some(err) => Err(ExitError::from_respondent(&err, output.text).into()),
            }
        }
        Commands::List(args) => args.execute(&open(config_path).await?).await,
        Commands::Serve(args) => args.execute(Arc::new(open(config_path).await?)).await,
        Commands::Init(args) => args.execute(),
        Commands::Schema => dynres::commands::schema::run_schema(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse();

    let span = tracing::info_span!("command", name = cli.command.name());
    let result = run(cli).instrument(span).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
