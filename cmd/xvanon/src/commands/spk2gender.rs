//! VoxCeleb spk2gender preparation command.

use std::path::PathBuf;

use clap::Args;

use super::print_success;
use crate::Cli;
use crate::voxceleb::{self, VoxSet};

/// Write OUT_DIR/spk2gender from VoxCeleb metadata.
///
/// Reads INPUT_DIR/vox{1,2}_meta.csv. An existing spk2gender is left as is.
#[derive(Args)]
pub struct Spk2genderCommand {
    /// Directory holding vox1_meta.csv / vox2_meta.csv
    input_dir: PathBuf,

    /// VoxCeleb version
    #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
    version: u8,

    /// Subset to keep
    #[arg(value_enum)]
    set: VoxSet,

    /// Data directory receiving spk2gender
    out_dir: PathBuf,
}

impl Spk2genderCommand {
    pub fn run(&self, _cli: &Cli) -> anyhow::Result<()> {
        if let Some(path) =
            voxceleb::write_spk2gender(&self.input_dir, self.version, self.set, &self.out_dir)?
        {
            print_success(&format!("wrote {}", path.display()));
        }
        Ok(())
    }
}
