use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ExitError;
use crate::respondent::Actor;
use crate::template;

/// Config file name constants.
pub const CONFIG_TOML: &str = ".dynres.toml";
pub const CONFIG_JSON: &str = ".dynres.json";

/// Find the config file path, preferring .dynres.toml over .dynres.json.
/// Returns None if neither exists.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let toml_path = dir.join(CONFIG_TOML);
    if toml_path.exists() {
        return Some(toml_path);
    }
    let json_path = dir.join(CONFIG_JSON);
    if json_path.exists() {
        return Some(json_path);
    }
    None
}

/// Find config in the standard locations.
///
/// Priority order (highest first):
/// 1. `<dir>/.dynres.toml`, then `<dir>/.dynres.json`
/// 2. `<user config dir>/dynres/config.toml`, then `config.json`
pub fn find_config_in(dir: &Path) -> Option<PathBuf> {
    if let Some(found) = find_config(dir) {
        return Some(found);
    }
    let user_dir = dirs::config_dir()?.join("dynres");
    ["config.toml", "config.json"]
        .into_iter()
        .map(|name| user_dir.join(name))
        .find(|path| path.exists())
}

/// Top-level .dynres.toml config. Every section is optional.
///
/// Keys are snake_case (TOML native) with `alias` attributes for the
/// camelCase spelling used by older JSON configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub authority: AuthorityConfig,
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite database file, relative to the config file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Local asset storage for unescaped respondents.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetsConfig {
    #[serde(default = "default_true", alias = "storeAssets")]
    pub store_assets: bool,
    #[serde(default = "default_assets_dir")]
    pub dir: PathBuf,
    /// Public URL prefix for stored assets; `file://` URLs when unset.
    #[serde(default, alias = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(default = "default_assets_timeout", alias = "timeoutSecs")]
    pub timeout_secs: u64,
    #[serde(default = "default_assets_max_bytes", alias = "maxBytes")]
    pub max_bytes: u64,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            store_assets: true,
            dir: default_assets_dir(),
            base_url: None,
            timeout_secs: default_assets_timeout(),
            max_bytes: default_assets_max_bytes(),
        }
    }
}

/// Authority levels required for privileged command options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuthorityConfig {
    /// Needed for `--no-escape` and `--raw` on post.
    #[serde(default = "default_post_options_authority", alias = "postOptions")]
    pub post_options: u8,
    /// Needed for `--force` on delete.
    #[serde(default = "default_force_delete_authority", alias = "forceDelete")]
    pub force_delete: u8,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            post_options: default_post_options_authority(),
            force_delete: default_force_delete_authority(),
        }
    }
}

impl AuthorityConfig {
    pub const fn can_use_post_options(&self, actor: &Actor) -> bool {
        actor.authority >= self.post_options
    }

    pub const fn can_force_delete(&self, actor: &Actor) -> bool {
        actor.authority >= self.force_delete
    }
}

/// Identity used for commands issued from the command line.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OperatorConfig {
    #[serde(default = "default_operator_id")]
    pub id: u64,
    #[serde(default = "default_operator_name")]
    pub name: String,
    #[serde(default = "default_operator_authority")]
    pub authority: u8,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            id: default_operator_id(),
            name: default_operator_name(),
            authority: default_operator_authority(),
        }
    }
}

impl OperatorConfig {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, &self.name, self.authority)
    }
}

/// Reply templates (minijinja syntax). Unset keys use the built-in text.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessagesConfig {
    #[serde(default = "default_msg_post_success")]
    pub post_success: String,
    #[serde(default = "default_msg_delete_success")]
    pub delete_success: String,
    #[serde(default = "default_msg_details")]
    pub details: String,
    #[serde(default = "default_msg_not_found")]
    pub not_found: String,
    #[serde(default = "default_msg_forbidden")]
    pub forbidden: String,
    #[serde(default = "default_msg_missing_trigger")]
    pub missing_trigger: String,
    #[serde(default = "default_msg_missing_content")]
    pub missing_content: String,
    #[serde(default = "default_msg_missing_id")]
    pub missing_id: String,
    /// Prefix placed before every delivered response.
    #[serde(default)]
    pub response: String,
    #[serde(default = "default_msg_store_failure")]
    pub store_failure: String,
    #[serde(default = "default_msg_asset_failure")]
    pub asset_failure: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            post_success: default_msg_post_success(),
            delete_success: default_msg_delete_success(),
            details: default_msg_details(),
            not_found: default_msg_not_found(),
            forbidden: default_msg_forbidden(),
            missing_trigger: default_msg_missing_trigger(),
            missing_content: default_msg_missing_content(),
            missing_id: default_msg_missing_id(),
            response: String::new(),
            store_failure: default_msg_store_failure(),
            asset_failure: default_msg_asset_failure(),
        }
    }
}

fn default_true() -> bool { true }
fn default_store_path() -> PathBuf { PathBuf::from("dynres.db") }
fn default_assets_dir() -> PathBuf { PathBuf::from("assets") }
fn default_assets_timeout() -> u64 { 30 }
fn default_assets_max_bytes() -> u64 { 10 * 1024 * 1024 }
fn default_post_options_authority() -> u8 { 3 }
fn default_force_delete_authority() -> u8 { 2 }
fn default_operator_id() -> u64 { 1 }
fn default_operator_name() -> String { "operator".into() }
fn default_operator_authority() -> u8 { 4 }
fn default_msg_post_success() -> String { template::DEFAULT_POST_SUCCESS.into() }
fn default_msg_delete_success() -> String { template::DEFAULT_DELETE_SUCCESS.into() }
fn default_msg_details() -> String { template::DEFAULT_DETAILS.into() }
fn default_msg_not_found() -> String { template::DEFAULT_NOT_FOUND.into() }
fn default_msg_forbidden() -> String { template::DEFAULT_FORBIDDEN.into() }
fn default_msg_missing_trigger() -> String { template::DEFAULT_MISSING_TRIGGER.into() }
fn default_msg_missing_content() -> String { template::DEFAULT_MISSING_CONTENT.into() }
fn default_msg_missing_id() -> String { template::DEFAULT_MISSING_ID.into() }
fn default_msg_store_failure() -> String { template::DEFAULT_STORE_FAILURE.into() }
fn default_msg_asset_failure() -> String { template::DEFAULT_ASSET_FAILURE.into() }

impl Config {
    /// Load config from a file (TOML or JSON, auto-detected by extension).
    /// Relative paths inside the file are resolved against its directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let mut config = match ext {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => {
                // Try TOML first, then JSON
                Self::parse_toml(&contents).or_else(|_| Self::parse_json(&contents))
            }
        }?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Load the explicit path if given, else the first config found from
    /// `dir`, else defaults. Returns the config and the file it came from.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        match find_config_in(dir) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => {
                tracing::debug!(dir = %dir.display(), "no config file found, using defaults");
                let mut config = Self::default();
                config.rebase(dir);
                Ok((config, None))
            }
        }
    }

    /// Parse config from a TOML string.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).map_err(|e| {
            ExitError::Config(format!("invalid .dynres.toml: {e}")).into()
        })
    }

    /// Parse config from a JSON string.
    pub fn parse_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExitError::Config(format!("invalid .dynres.json: {e}")).into())
    }

    /// Serialize config to a TOML string with helpful comments.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let raw = toml::to_string_pretty(self).context("serializing config to TOML")?;

        let mut doc: toml_edit::DocumentMut =
            raw.parse().context("parsing generated TOML for comment injection")?;

        doc.decor_mut().set_prefix("# dynres configuration\n\n");

        fn set_table_comment(doc: &mut toml_edit::DocumentMut, key: &str, comment: &str) {
            if let Some(tbl) = doc.get_mut(key).and_then(|item| item.as_table_mut()) {
                tbl.decor_mut().set_prefix(comment);
            }
        }

        set_table_comment(&mut doc, "store", "# Respondent storage (backend = \"sqlite\" or \"memory\")\n");
        set_table_comment(&mut doc, "assets", "\n# Local copies of remote media in unescaped respondents\n");
        set_table_comment(&mut doc, "authority", "\n# Authority levels required for privileged options\n");
        set_table_comment(&mut doc, "operator", "\n# Identity used by one-shot CLI commands\n");
        set_table_comment(&mut doc, "messages", "\n# Reply templates (minijinja syntax)\n");

        Ok(doc.to_string())
    }

    /// Make relative store and asset paths relative to `base`.
    fn rebase(&mut self, base: &Path) {
        if self.store.path.is_relative() {
            self.store.path = base.join(&self.store.path);
        }
        if self.assets.dir.is_relative() {
            self.assets.dir = base.join(&self.assets.dir);
        }
    }
}
