//! Kaldi data directories: pool discovery, source metadata and outputs.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use tracing::info;
use xvanon_kaldi::{load_scp, read_table, write_ark_scp, write_lines};
use xvanon_pseudo::{
    Gender, GenderPool, ModelBundle, PseudoAssignment, PseudoConfig, SpeakerRecord, fit_pool,
    model_io,
};

/// Speaker-level x-vector script inside an x-vector directory.
pub const SPK_XVECTOR_SCP: &str = "spk_xvector.scp";

/// Output archive/script base name.
pub const PSEUDO_XVECTOR: &str = "pseudo_xvector";

/// Sub-directories of `pool_data` that contain a `wav.scp`, sorted by name.
pub fn pool_sources(pool_data: &Path) -> anyhow::Result<Vec<String>> {
    let entries = fs::read_dir(pool_data)
        .with_context(|| format!("failed to read pool directory {}", pool_data.display()))?;

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() && path.join("wav.scp").is_file() {
            sources.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    sources.sort();
    Ok(sources)
}

/// Reads a `spk2gender` table. Labels other than `m` / `f` are rejected.
fn read_genders(path: &Path) -> anyhow::Result<BTreeMap<String, Gender>> {
    let rows = read_table(path).with_context(|| format!("failed to read {}", path.display()))?;
    rows.into_iter()
        .map(|(spk, values)| -> anyhow::Result<(String, Gender)> {
            let label = values
                .first()
                .with_context(|| format!("{}: speaker '{spk}' has no gender", path.display()))?;
            let gender = label
                .parse::<Gender>()
                .with_context(|| format!("{}: speaker '{spk}'", path.display()))?;
            Ok((spk, gender))
        })
        .collect()
}

/// Loads every pool speaker x-vector, partitioned by gender.
///
/// Each pool source `S` reads `pool_data/S/spk2gender` and
/// `xvec_out_dir/xvectors_S/spk_xvector.scp`.
pub fn load_pool(pool_data: &Path, xvec_out_dir: &Path) -> anyhow::Result<GenderPool> {
    let sources = pool_sources(pool_data)?;
    if sources.is_empty() {
        bail!("no pool sources with a wav.scp under {}", pool_data.display());
    }

    let mut pool = GenderPool::default();
    for source in &sources {
        let source_dir = pool_data.join(source);
        info!(source = %source_dir.display(), "adding to the pool");
        let genders = read_genders(&source_dir.join("spk2gender"))?;

        let scp = xvec_out_dir
            .join(format!("xvectors_{source}"))
            .join(SPK_XVECTOR_SCP);
        if !scp.is_file() {
            bail!("x-vector file {} does not exist", scp.display());
        }
        let xvectors =
            load_scp(&scp).with_context(|| format!("failed to load {}", scp.display()))?;
        for (spk, xvec) in xvectors {
            let gender = genders.get(&spk).with_context(|| {
                format!("pool speaker '{spk}' of {source} is missing from spk2gender")
            })?;
            pool.push(*gender, xvec);
        }
    }

    info!(
        male = pool.male.len(),
        female = pool.female.len(),
        "read pool x-vectors"
    );
    Ok(pool)
}

/// Loads the bundle cached at `model_file`, or fits one over the pool.
///
/// A freshly fitted bundle is written to `model_file` when one is given.
pub fn load_or_fit(
    pool_data: &Path,
    xvec_out_dir: &Path,
    model_file: Option<&Path>,
    cfg: &PseudoConfig,
) -> anyhow::Result<ModelBundle> {
    if let Some(path) = model_file.filter(|p| p.exists()) {
        info!(path = %path.display(), "loading existing models");
        let mut f =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        return model_io::load_for(&mut f, cfg.combine_genders)
            .with_context(|| format!("failed to load models from {}", path.display()));
    }

    let pool = load_pool(pool_data, xvec_out_dir)?;
    let bundle = fit_pool(&pool, &cfg.fit_config(), cfg.combine_genders)?;
    if let Some(path) = model_file {
        save_bundle(&bundle, path)?;
    }
    Ok(bundle)
}

pub fn save_bundle(bundle: &ModelBundle, path: &Path) -> anyhow::Result<()> {
    let mut f = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    model_io::save(bundle, &mut f)?;
    info!(path = %path.display(), shape = bundle.shape(), "saved models");
    Ok(())
}

/// Loads `src_data/spk2gender` and `src_data/spk2utt`.
pub fn load_speakers(src_data: &Path) -> anyhow::Result<SpeakerRecord> {
    let spk2gender = src_data.join("spk2gender");
    if !spk2gender.is_file() {
        bail!("{} does not exist", spk2gender.display());
    }
    let spk2utt = src_data.join("spk2utt");
    if !spk2utt.is_file() {
        bail!("{} does not exist", spk2utt.display());
    }

    let genders = read_genders(&spk2gender)?;
    let utterances = read_table(&spk2utt)
        .with_context(|| format!("failed to read {}", spk2utt.display()))?
        .into_iter()
        .collect();
    Ok(SpeakerRecord::new(genders, utterances))
}

/// Loads `xvec_dir/spk_xvector.scp` keyed by speaker.
pub fn load_xvectors(xvec_dir: &Path) -> anyhow::Result<HashMap<String, Vec<f32>>> {
    let scp = xvec_dir.join(SPK_XVECTOR_SCP);
    if !scp.is_file() {
        bail!("x-vector file {} does not exist", scp.display());
    }
    let xvectors = load_scp(&scp).with_context(|| format!("failed to load {}", scp.display()))?;
    Ok(xvectors.into_iter().collect())
}

/// Writes `pseudo_xvector.{ark,scp}` and `spk2gender` into `dir`.
pub fn write_outputs(dir: &Path, assignment: &PseudoAssignment) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    info!(dir = %dir.display(), "writing pseudo-speaker x-vectors");
    let entries = assignment
        .embeddings
        .iter()
        .map(|(utt, xvec)| (utt.as_str(), xvec.as_slice()));
    let (_, scp) = write_ark_scp(dir, PSEUDO_XVECTOR, entries)?;

    write_lines(dir.join("spk2gender"), &assignment.gender_lines())?;
    Ok(scp)
}


#[cfg(test)]
mod tests {
    use super::testdata::*;
    use super::*;
    use xvanon_pseudo::ReductionTarget;

    fn small_config(combine_genders: bool) -> PseudoConfig {
        PseudoConfig {
            pca_size: ReductionTarget::Components(2),
            combine_genders,
            ..PseudoConfig::default()
        }
    }

    #[test]
    fn discovers_sources_with_wav_scp() {
        let dir = tempfile::tempdir().unwrap();
        let pool = dir.path().join("pool");
        let xvec = dir.path().join("exp");
        write_pool_source(&pool, &xvec, "b_src", 3, 1);
        write_pool_source(&pool, &xvec, "a_src", 3, 2);
        fs::create_dir_all(pool.join("no_wav")).unwrap();
        fs::write(pool.join("stray.txt"), "").unwrap();

        assert_eq!(pool_sources(&pool).unwrap(), vec!["a_src", "b_src"]);

        let loaded = load_pool(&pool, &xvec).unwrap();
        assert_eq!(loaded.male.len(), 6);
        assert_eq!(loaded.female.len(), 6);
        assert!(loaded.male.iter().all(|v| v.len() == DIM));
    }

    #[test]
    fn pool_speaker_without_gender_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pool = dir.path().join("pool");
        let xvec = dir.path().join("exp");
        write_pool_source(&pool, &xvec, "src", 2, 1);
        fs::write(pool.join("src").join("spk2gender"), "src-m00 m\n").unwrap();

        let err = load_pool(&pool, &xvec).unwrap_err();
        assert!(err.to_string().contains("missing from spk2gender"), "{err}");
    }

    #[test]
    fn pool_without_xvectors_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pool = dir.path().join("pool");
        fs::create_dir_all(pool.join("src")).unwrap();
        fs::write(pool.join("src").join("wav.scp"), "").unwrap();
        fs::write(pool.join("src").join("spk2gender"), "a m\n").unwrap();

        let err = load_pool(&pool, &dir.path().join("exp")).unwrap_err();
        assert!(err.to_string().contains("does not exist"), "{err}");
    }

    #[test]
    fn unknown_gender_label_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("spk2gender"), "s1 x\n").unwrap();
        fs::write(src.join("spk2utt"), "s1 u1\n").unwrap();
        assert!(load_speakers(&src).is_err());
    }

    #[test]
    fn missing_source_tables_named() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_speakers(dir.path()).unwrap_err();
        assert!(err.to_string().contains("spk2gender"), "{err}");

        fs::write(dir.path().join("spk2gender"), "s1 m\n").unwrap();
        let err = load_speakers(dir.path()).unwrap_err();
        assert!(err.to_string().contains("spk2utt"), "{err}");
    }

    #[test]
    fn model_file_is_written_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let pool = dir.path().join("pool");
        let xvec = dir.path().join("exp");
        write_pool_source(&pool, &xvec, "src", 12, 3);
        let model_file = dir.path().join("models.bin");

        let fitted = load_or_fit(&pool, &xvec, Some(&model_file), &small_config(false)).unwrap();
        assert!(!fitted.is_combined());
        assert!(model_file.is_file());

        // The pool is no longer needed once the cache exists.
        fs::remove_dir_all(&pool).unwrap();
        let cached = load_or_fit(&pool, &xvec, Some(&model_file), &small_config(false)).unwrap();
        assert_eq!(cached.model_for(Gender::Male).dim(), DIM);

        let err = load_or_fit(&pool, &xvec, Some(&model_file), &small_config(true)).unwrap_err();
        assert!(format!("{err:#}").contains("per-gender"), "{err:#}");
    }

    #[test]
    fn outputs_written_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pseudo");
        let mut assignment = PseudoAssignment::default();
        assignment.embeddings.insert("u2".into(), vec![1.0, 2.0]);
        assignment.embeddings.insert("u1".into(), vec![3.0, 4.0]);
        assignment.genders.insert("spk10".into(), Gender::Female);
        assignment.genders.insert("spk1".into(), Gender::Male);

        let scp = write_outputs(&out, &assignment).unwrap();
        assert_eq!(scp, out.join("pseudo_xvector.scp"));
        assert_eq!(
            fs::read_to_string(out.join("spk2gender")).unwrap(),
            "spk1 m\nspk10 f\n"
        );
        let loaded = load_scp(&scp).unwrap();
        assert_eq!(loaded[0], ("u1".to_string(), vec![3.0, 4.0]));
        assert_eq!(loaded[1], ("u2".to_string(), vec![1.0, 2.0]));
    }
}
