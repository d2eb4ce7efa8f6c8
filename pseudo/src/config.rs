use serde::{Deserialize, Serialize};

use crate::assign::{AssignOptions, Granularity};
use crate::fitter::FitConfig;
use crate::pca::ReductionTarget;
use crate::sampler::SampleOptions;

/// Every knob of a pseudo-speaker run, passed explicitly to each stage.
///
/// Deserializes from YAML/JSON with every field optional:
///
/// ```yaml
/// pca_size: 0.9          # proportion in (0, 1) or whole component count
/// gmm_size: 2
/// threshold: 1.01
/// max_attempts: 1000
/// combine_genders: false
/// cross_gender: false
/// rand_level: spk        # spk | utt
/// random_seed: 2020
/// max_fit_retries: 50
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PseudoConfig {
    pub pca_size: ReductionTarget,
    pub gmm_size: usize,
    pub threshold: f32,
    pub max_attempts: usize,
    pub combine_genders: bool,
    pub cross_gender: bool,
    pub rand_level: Granularity,
    pub random_seed: Option<u64>,
    pub max_fit_retries: usize,
}

impl Default for PseudoConfig {
    fn default() -> Self {
        let fit = FitConfig::default();
        let sampling = SampleOptions::default();
        Self {
            pca_size: fit.reduction,
            gmm_size: fit.n_components,
            threshold: sampling.threshold,
            max_attempts: sampling.max_attempts,
            combine_genders: false,
            cross_gender: false,
            rand_level: Granularity::Speaker,
            random_seed: Some(2020),
            max_fit_retries: fit.max_retries,
        }
    }
}

impl PseudoConfig {
    pub fn fit_config(&self) -> FitConfig {
        FitConfig {
            reduction: self.pca_size,
            n_components: self.gmm_size,
            seed: self.random_seed,
            max_retries: self.max_fit_retries,
            ..FitConfig::default()
        }
    }

    pub fn sample_options(&self) -> SampleOptions {
        SampleOptions {
            threshold: self.threshold,
            max_attempts: self.max_attempts,
        }
    }

    pub fn assign_options(&self) -> AssignOptions {
        AssignOptions {
            cross_gender: self.cross_gender,
            granularity: self.rand_level,
            sampling: self.sample_options(),
        }
    }
}
