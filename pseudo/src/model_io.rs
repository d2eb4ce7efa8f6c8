use std::io::{BufReader, BufWriter, Read, Write};

use crate::PseudoError;
use crate::model::ModelBundle;

const MODEL_MAGIC: [u8; 4] = [b'X', b'V', b'P', b'M'];
const MODEL_VERSION: u32 = 1;

/// Serializes a model bundle.
///
/// ```text
/// [4B magic "XVPM"] [4B version=1, little-endian]
/// [msgpack ModelBundle, named fields]
/// ```
pub fn save(bundle: &ModelBundle, w: &mut dyn Write) -> Result<(), PseudoError> {
    let payload =
        rmp_serde::to_vec_named(bundle).map_err(|e| PseudoError::Serialization(e.to_string()))?;

    let mut bw = BufWriter::new(w);
    bw.write_all(&MODEL_MAGIC)?;
    bw.write_all(&MODEL_VERSION.to_le_bytes())?;
    bw.write_all(&payload)?;
    bw.flush()?;
    Ok(())
}

/// Deserializes a model bundle written by [`save`].
pub fn load(r: &mut dyn Read) -> Result<ModelBundle, PseudoError> {
    let mut br = BufReader::new(r);

    let mut buf4 = [0u8; 4];
    br.read_exact(&mut buf4)?;
    if buf4 != MODEL_MAGIC {
        return Err(PseudoError::InvalidFormat(format!("invalid magic {buf4:?}")));
    }

    br.read_exact(&mut buf4)?;
    let version = u32::from_le_bytes(buf4);
    if version != MODEL_VERSION {
        return Err(PseudoError::InvalidFormat(format!(
            "unsupported version {version} (want {MODEL_VERSION})"
        )));
    }

    let mut payload = Vec::new();
    br.read_to_end(&mut payload)?;
    rmp_serde::from_slice(&payload).map_err(|e| PseudoError::Serialization(e.to_string()))
}

/// Loads a bundle and checks it matches the requested gender mode.
pub fn load_for(r: &mut dyn Read, combine_genders: bool) -> Result<ModelBundle, PseudoError> {
    let bundle = load(r)?;
    bundle.ensure_shape(combine_genders)?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitter::{FitConfig, fit};
    use crate::model::Gender;
    use crate::pca::ReductionTarget;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn model(offset: f32) -> crate::FittedModel {
        let data: Vec<Vec<f32>> = (0..12)
            .map(|i| {
                let t = i as f32;
                vec![offset + t, offset - 0.5 * t + (i % 3) as f32, offset + (i % 4) as f32]
            })
            .collect();
        let cfg = FitConfig {
            reduction: ReductionTarget::Components(2),
            n_components: 1,
            seed: Some(0),
            ..FitConfig::default()
        };
        fit(&data, &cfg).unwrap()
    }

    #[test]
    fn save_load_preserves_sampling() {
        let bundle = ModelBundle::PerGender {
            male: model(0.0),
            female: model(10.0),
        };
        let mut buf = Vec::new();
        save(&bundle, &mut buf).unwrap();
        assert_eq!(&buf[..4], b"XVPM");

        let loaded = load(&mut buf.as_slice()).unwrap();
        assert!(!loaded.is_combined());
        for g in Gender::ALL {
            let a = bundle.model_for(g).draw(&mut StdRng::seed_from_u64(1));
            let b = loaded.model_for(g).draw(&mut StdRng::seed_from_u64(1));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn load_for_checks_shape() {
        let mut buf = Vec::new();
        save(&ModelBundle::Combined(model(0.0)), &mut buf).unwrap();
        assert!(load_for(&mut buf.as_slice(), true).is_ok());
        assert!(matches!(
            load_for(&mut buf.as_slice(), false),
            Err(PseudoError::ModelShapeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let err = load(&mut &b"NOPE\x01\x00\x00\x00"[..]).unwrap_err();
        assert!(matches!(err, PseudoError::InvalidFormat(_)));

        let err = load(&mut &b"XVPM\x09\x00\x00\x00"[..]).unwrap_err();
        assert!(matches!(err, PseudoError::InvalidFormat(_)));

        let err = load(&mut &b"XV"[..]).unwrap_err();
        assert!(matches!(err, PseudoError::Io(_)));
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut buf = Vec::new();
        save(&ModelBundle::Combined(model(0.0)), &mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(matches!(
            load(&mut buf.as_slice()),
            Err(PseudoError::Serialization(_))
        ));
    }
}
