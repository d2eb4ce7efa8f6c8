//! Model training command.

use std::path::PathBuf;

use clap::Args;
use xvanon_pseudo::fit_pool;

use super::{ModelArgs, get_config, print_success};
use crate::{Cli, corpus};

/// Fit pool models and save them for later `gen --model-file` runs.
#[derive(Args)]
pub struct TrainCommand {
    /// Directory of pool data directories (each with wav.scp and spk2gender)
    pool_data: PathBuf,

    /// Directory holding xvectors_<pool source>/spk_xvector.scp
    xvec_out_dir: PathBuf,

    /// Where to write the fitted models
    model_file: PathBuf,

    #[command(flatten)]
    model: ModelArgs,

    /// Seed for fitting [default: 2020]
    #[arg(long)]
    random_seed: Option<u64>,
}

impl TrainCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = get_config(cli)?;
        self.model.apply(&mut cfg);
        if self.random_seed.is_some() {
            cfg.random_seed = self.random_seed;
        }

        let pool = corpus::load_pool(&self.pool_data, &self.xvec_out_dir)?;
        let bundle = fit_pool(&pool, &cfg.fit_config(), cfg.combine_genders)?;
        corpus::save_bundle(&bundle, &self.model_file)?;

        print_success(&format!(
            "saved {} models to {}",
            bundle.shape(),
            self.model_file.display()
        ));
        Ok(())
    }
}
