//! Model inspection command.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use xvanon_pseudo::{FittedModel, ModelBundle, model_io};

use super::output_result;
use crate::Cli;

/// Print a summary of a saved model file (YAML, or JSON with --json).
#[derive(Args)]
pub struct InspectCommand {
    /// Model file written by `train` or `gen --model-file`
    model_file: PathBuf,

    /// Output file (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct BundleSummary {
    shape: &'static str,
    models: Vec<ModelSummary>,
}

#[derive(Debug, Serialize)]
struct ModelSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
    dim: usize,
    reduced_dim: usize,
    retained_variance: f64,
    explained_variance_ratio: Vec<f64>,
    mixture: MixtureSummary,
}

#[derive(Debug, Serialize)]
struct MixtureSummary {
    components: usize,
    weights: Vec<f64>,
    converged: bool,
    iterations: usize,
    lower_bound: f64,
}

impl ModelSummary {
    fn new(gender: Option<String>, model: &FittedModel) -> Self {
        let pca = model.pca();
        let gmm = model.gmm();
        Self {
            gender,
            dim: model.dim(),
            reduced_dim: model.reduced_dim(),
            retained_variance: pca.explained_variance_ratio().iter().sum(),
            explained_variance_ratio: pca.explained_variance_ratio().to_vec(),
            mixture: MixtureSummary {
                components: gmm.n_components(),
                weights: gmm.weights().to_vec(),
                converged: gmm.converged(),
                iterations: gmm.n_iter(),
                lower_bound: gmm.lower_bound(),
            },
        }
    }
}

fn summarize(bundle: &ModelBundle) -> BundleSummary {
    BundleSummary {
        shape: bundle.shape(),
        models: bundle
            .models()
            .into_iter()
            .map(|(gender, model)| ModelSummary::new(gender.map(|g| g.to_string()), model))
            .collect(),
    }
}

impl InspectCommand {
    pub fn run(&self, _cli: &Cli) -> anyhow::Result<()> {
        let path = &self.model_file;
        let mut f = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let bundle = model_io::load(&mut f)
            .with_context(|| format!("failed to load models from {}", path.display()))?;
        output_result(&summarize(&bundle), self.output.as_deref(), self.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use xvanon_pseudo::{FitConfig, GenderPool, ReductionTarget, fit_pool};

    use crate::Commands;
    use crate::corpus::testdata::xvector;

    fn bundle(combine_genders: bool) -> ModelBundle {
        let mut rng = StdRng::seed_from_u64(4);
        let mut pool = GenderPool::default();
        for _ in 0..10 {
            pool.push(xvanon_pseudo::Gender::Male, xvector(&mut rng, 1.0));
            pool.push(xvanon_pseudo::Gender::Female, xvector(&mut rng, -1.0));
        }
        let cfg = FitConfig {
            reduction: ReductionTarget::Components(2),
            seed: Some(1),
            ..FitConfig::default()
        };
        fit_pool(&pool, &cfg, combine_genders).unwrap()
    }

    #[test]
    fn per_gender_summary() {
        let summary = summarize(&bundle(false));
        assert_eq!(summary.shape, "per-gender");
        assert_eq!(summary.models.len(), 2);
        let genders: Vec<_> = summary.models.iter().map(|m| m.gender.clone()).collect();
        assert!(genders.contains(&Some("m".to_string())));
        assert!(genders.contains(&Some("f".to_string())));

        let m = &summary.models[0];
        assert_eq!(m.reduced_dim, 2);
        assert_eq!(m.mixture.weights.len(), 2);
        assert!((m.mixture.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(m.retained_variance > 0.0 && m.retained_variance <= 1.0 + 1e-9);
    }

    #[test]
    fn combined_summary_as_yaml() {
        let summary = summarize(&bundle(true));
        let yaml = serde_yaml::to_string(&summary).unwrap();
        assert!(yaml.contains("shape: combined"), "{yaml}");
        assert!(!yaml.contains("gender:"), "{yaml}");

        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["models"][0]["mixture"]["components"], 2);
    }

    #[test]
    fn json_summary_written_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.bin");
        let mut f = File::create(&model).unwrap();
        model_io::save(&bundle(false), &mut f).unwrap();
        drop(f);

        let out = dir.path().join("summary.json");
        let args = [
            "xvanon",
            "inspect",
            model.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match &cli.command {
            Commands::Inspect(cmd) => cmd.run(&cli).unwrap(),
            _ => unreachable!(),
        }

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["shape"], "per-gender");
        assert_eq!(json["models"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn output_flags_belong_to_inspect_only() {
        assert!(Cli::try_parse_from(["xvanon", "train", "pool", "xv", "model", "--json"]).is_err());
        assert!(Cli::try_parse_from(["xvanon", "--json", "inspect", "model"]).is_err());
        assert!(Cli::try_parse_from(["xvanon", "inspect", "model", "--json"]).is_ok());
    }
}
