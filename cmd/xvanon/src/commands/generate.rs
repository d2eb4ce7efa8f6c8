//! Pseudo-speaker generation command.

use std::path::PathBuf;

use clap::{ArgAction, Args};
use tracing::info;
use xvanon_pseudo::{Granularity, assign};

use super::{ModelArgs, get_config, model_path, parse_switch, print_success};
use crate::{Cli, corpus};

/// Generate pseudo-speaker x-vectors.
///
/// Fits (or loads) the pool models, draws a pseudo-speaker for every source
/// speaker and writes pseudo_xvector.{ark,scp} and spk2gender into
/// PSEUDO_XVECS_DIR once every draw has completed.
#[derive(Args)]
pub struct GenCommand {
    /// Source data directory with spk2gender and spk2utt
    src_data: PathBuf,

    /// Directory of pool data directories (each with wav.scp and spk2gender)
    pool_data: PathBuf,

    /// Directory holding xvectors_<pool source>/spk_xvector.scp
    xvec_out_dir: PathBuf,

    /// Output directory
    pseudo_xvecs_dir: PathBuf,

    /// Directory holding the source speakers' spk_xvector.scp
    src_xvec_dir: PathBuf,

    /// One pseudo-speaker per speaker (spk) or per utterance (utt)
    rand_level: Granularity,

    /// Sample from the opposite gender (true|false)
    #[arg(action = ArgAction::Set, value_parser = parse_switch)]
    cross_gender: bool,

    /// Seed for fitting and sampling
    random_seed: u64,

    #[command(flatten)]
    model: ModelArgs,

    /// Redraw while cosine similarity to the original exceeds this [default: 1.01]
    #[arg(long)]
    threshold: Option<f32>,

    /// Draws per pseudo-speaker before keeping the least similar [default: 1000]
    #[arg(long)]
    max_attempts: Option<usize>,

    /// Model cache; fitted models are saved here when absent ('None' disables)
    #[arg(long)]
    model_file: Option<String>,
}

impl GenCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = get_config(cli)?;
        self.model.apply(&mut cfg);
        cfg.rand_level = self.rand_level;
        cfg.cross_gender = self.cross_gender;
        cfg.random_seed = Some(self.random_seed);
        if let Some(v) = self.threshold {
            cfg.threshold = v;
        }
        if let Some(v) = self.max_attempts {
            cfg.max_attempts = v;
        }

        if cfg.cross_gender {
            info!("opposite gender speakers will be selected");
        } else {
            info!("same gender speakers will be selected");
        }

        // Source inputs are checked before any pool is read or model fitted.
        let speakers = corpus::load_speakers(&self.src_data)?;
        let originals = corpus::load_xvectors(&self.src_xvec_dir)?;

        let model_file = model_path(self.model_file.as_deref());
        let bundle = corpus::load_or_fit(
            &self.pool_data,
            &self.xvec_out_dir,
            model_file.as_deref(),
            &cfg,
        )?;

        let mut rng = cfg.fit_config().rng();
        let assignment = assign(&bundle, &originals, &speakers, &cfg.assign_options(), &mut rng)?;

        let scp = corpus::write_outputs(&self.pseudo_xvecs_dir, &assignment)?;
        print_success(&format!(
            "wrote {} pseudo x-vectors for {} speakers to {}",
            assignment.embeddings.len(),
            assignment.genders.len(),
            scp.display()
        ));
        Ok(())
    }
}
