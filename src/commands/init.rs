use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::config::{Config, CONFIG_TOML};
use crate::error::ExitError;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to write .dynres.toml into
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("resolving current directory")?,
        };
        let path = dir.join(CONFIG_TOML);
        if path.exists() && !self.force {
            return Err(ExitError::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            ))
            .into());
        }

        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let contents = Config::default().to_toml()?;
        std::fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "config written");
        println!("Wrote {}", path.display());
        Ok(())
    }
}
