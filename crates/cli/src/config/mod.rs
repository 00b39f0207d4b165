use clap::Parser;
use engine::{CalculatorConfig, ForcingMode, PercentMode};
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/cli.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Bearer token for the sync backend; empty means offline-only.
    pub token: String,
    pub state_dir: String,
    /// "unary" (n / 100) or "binary" (percent-of-previous).
    pub percent_mode: String,
    /// "persistent" or "one_shot".
    pub forcing_mode: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            token: String::new(),
            state_dir: "config/state".to_string(),
            percent_mode: "unary".to_string(),
            forcing_mode: "persistent".to_string(),
        }
    }
}

impl AppConfig {
    /// Maps the string settings onto engine options. Unknown values fall
    /// back to the defaults rather than aborting startup.
    pub fn calculator_config(&self) -> CalculatorConfig {
        let percent_mode = match self.percent_mode.as_str() {
            "binary" => PercentMode::Binary,
            _ => PercentMode::Unary,
        };
        let forcing_mode = match self.forcing_mode.as_str() {
            "one_shot" => ForcingMode::OneShot,
            _ => ForcingMode::Persistent,
        };
        CalculatorConfig {
            percent_mode,
            forcing_mode,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "prestidigit_cli", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:3000).
    #[arg(long)]
    base_url: Option<String>,
    /// Override the bearer token.
    #[arg(long)]
    token: Option<String>,
    /// Override the local state directory.
    #[arg(long)]
    state_dir: Option<String>,
    /// Override percent behavior: unary or binary.
    #[arg(long)]
    percent_mode: Option<String>,
    /// Override forcing behavior: persistent or one_shot.
    #[arg(long)]
    forcing_mode: Option<String>,
}

pub fn load() -> Result<AppConfig> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("PRESTIDIGIT_CLI"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(token) = args.token {
        settings.token = token;
    }
    if let Some(state_dir) = args.state_dir {
        settings.state_dir = state_dir;
    }
    if let Some(percent_mode) = args.percent_mode {
        settings.percent_mode = percent_mode;
    }
    if let Some(forcing_mode) = args.forcing_mode {
        settings.forcing_mode = forcing_mode;
    }

    Ok(settings)
}
