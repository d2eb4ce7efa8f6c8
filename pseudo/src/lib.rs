//! Pseudo-speaker x-vector synthesis for speaker anonymization.
//!
//! A pool of real speaker embeddings is reduced with PCA and modelled with a
//! diagonal Gaussian mixture (per gender, or combined). New identities are
//! drawn from the mixture and rejected while they are too close, by cosine
//! similarity, to the speaker they replace.
//!
//! # Usage
//!
//! ```ignore
//! use xvanon_pseudo::{assign, fit_pool, PseudoConfig};
//!
//! let cfg = PseudoConfig::default();
//! let bundle = fit_pool(&pool, &cfg.fit_config(), cfg.combine_genders)?;
//! let out = assign(&bundle, &sources, &speakers, &cfg.assign_options(), &mut rng)?;
//! ```
//!
//! # Design
//!
//! Non-convergence of the mixture is retried with escalating tolerance and
//! random initialisation, up to [`FitConfig::max_retries`]. Rejection
//! sampling is bounded by [`SampleOptions::max_attempts`]; on exhaustion the
//! least similar candidate is used rather than failing.

mod assign;
mod config;
mod cosine;
mod error;
mod fitter;
mod gmm;
mod kmeans;
mod linalg;
mod model;
pub mod model_io;
mod pca;
mod sampler;

pub use assign::{AssignOptions, Granularity, PseudoAssignment, SpeakerRecord, assign};
pub use config::PseudoConfig;
pub use cosine::{cosine_similarity, mean_vector};
pub use error::PseudoError;
pub use fitter::{FitConfig, GenderPool, escalate, fit, fit_pool, fit_with_rng};
pub use gmm::{GaussianMixture, GmmParams, InitStrategy};
pub use model::{FittedModel, Gender, ModelBundle};
pub use pca::{Pca, ReductionTarget};
pub use sampler::{PseudoSample, PseudoSampler, SampleOptions};
