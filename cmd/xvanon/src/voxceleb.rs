//! VoxCeleb metadata to Kaldi `spk2gender`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use tracing::info;
use xvanon_kaldi::write_lines;

/// VoxCeleb2 test identities listed in the metadata but absent from the
/// released audio.
const WITHDRAWN_VOX2_TEST: [&str; 2] = ["id04170", "id05348"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VoxSet {
    Dev,
    Test,
}

impl VoxSet {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
        }
    }
}

pub fn meta_file(input_dir: &Path, version: u8) -> PathBuf {
    input_dir.join(format!("vox{version}_meta.csv"))
}

/// Converts a metadata table into `id gender` lines for one subset.
///
/// Version 1 metadata is tab-separated, version 2 comma-separated. Header
/// and cell whitespace is ignored.
pub fn spk2gender_lines(meta: &str, version: u8, set: VoxSet) -> anyhow::Result<Vec<String>> {
    let sep = if version == 1 { '\t' } else { ',' };
    let id_column = format!("VoxCeleb{version} ID");

    let mut rows = meta.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let (_, header) = rows.next().context("metadata is empty")?;
    let header: Vec<&str> = header.split(sep).map(str::trim).collect();
    let column = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .with_context(|| format!("metadata has no '{name}' column"))
    };
    let id_idx = column(&id_column)?;
    let gender_idx = column("Gender")?;
    let set_idx = column("Set")?;

    let mut lines = Vec::new();
    for (i, row) in rows {
        let cells: Vec<&str> = row.split(sep).map(str::trim).collect();
        let cell = |idx: usize| {
            cells
                .get(idx)
                .copied()
                .with_context(|| format!("metadata line {} has {} fields", i + 1, cells.len()))
        };
        if cell(set_idx)? != set.as_str() {
            continue;
        }
        let id = cell(id_idx)?;
        if version == 2 && set == VoxSet::Test && WITHDRAWN_VOX2_TEST.contains(&id) {
            continue;
        }
        lines.push(format!("{id} {}", cell(gender_idx)?));
    }
    Ok(lines)
}

/// Writes `out_dir/spk2gender` unless it already exists.
///
/// Returns the written path, or `None` when the file was already there.
pub fn write_spk2gender(
    input_dir: &Path,
    version: u8,
    set: VoxSet,
    out_dir: &Path,
) -> anyhow::Result<Option<PathBuf>> {
    let out = out_dir.join("spk2gender");
    if out.is_file() {
        info!(path = %out.display(), "spk2gender exists, skipping");
        return Ok(None);
    }

    let meta = meta_file(input_dir, version);
    let text =
        fs::read_to_string(&meta).with_context(|| format!("failed to read {}", meta.display()))?;
    let lines = spk2gender_lines(&text, version, set)
        .with_context(|| format!("invalid metadata {}", meta.display()))?;
    write_lines(&out, &lines)?;
    info!(path = %out.display(), speakers = lines.len(), set = set.as_str(), "wrote spk2gender");
    Ok(Some(out))
}
