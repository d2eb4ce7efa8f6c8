//! Utility functions for CLI commands.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use xvanon_pseudo::{PseudoConfig, ReductionTarget};

use crate::Cli;

/// Value that disables the model cache.
const NO_MODEL_FILE: &str = "None";

/// Loads the `--config` file, or the built-in defaults without one.
pub fn get_config(cli: &Cli) -> anyhow::Result<PseudoConfig> {
    let Some(path) = cli.config.as_deref() else {
        return Ok(PseudoConfig::default());
    };
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config {path}"))?;
    serde_yaml::from_str(&content).with_context(|| format!("invalid config {path}"))
}

/// Parses the literal `true` / `false` switches of the recipe scripts.
pub fn parse_switch(s: &str) -> Result<bool, String> {
    match s {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected 'true' or 'false', got '{other}'")),
    }
}

/// Resolves `--model-file`; `None` disables caching.
pub fn model_path(arg: Option<&str>) -> Option<PathBuf> {
    arg.filter(|s| *s != NO_MODEL_FILE).map(PathBuf::from)
}

/// Model options shared by `gen` and `train`.
///
/// Flags left unset keep the value from `--config`.
#[derive(Args, Debug, Default)]
pub struct ModelArgs {
    /// PCA target: variance proportion in (0, 1) or whole component count [default: 0.9]
    #[arg(long)]
    pub pca_size: Option<ReductionTarget>,

    /// Number of Gaussian mixture components [default: 2]
    #[arg(long)]
    pub gmm_size: Option<usize>,

    /// Fit a single model for both genders (true|false) [default: false]
    #[arg(long, value_parser = parse_switch)]
    pub combine_genders: Option<bool>,

    /// Non-converged mixture fits tolerated before giving up [default: 50]
    #[arg(long)]
    pub max_fit_retries: Option<usize>,
}

impl ModelArgs {
    pub fn apply(&self, cfg: &mut PseudoConfig) {
        if let Some(v) = self.pca_size {
            cfg.pca_size = v;
        }
        if let Some(v) = self.gmm_size {
            cfg.gmm_size = v;
        }
        if let Some(v) = self.combine_genders {
            cfg.combine_genders = v;
        }
        if let Some(v) = self.max_fit_retries {
            cfg.max_fit_retries = v;
        }
    }
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(
    result: &T,
    output_path: Option<&str>,
    as_json: bool,
) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };

    match output_path {
        Some(path) => {
            std::fs::write(path, output).with_context(|| format!("failed to write {path}"))?
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}
