use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::PseudoError;
use crate::gmm::{GaussianMixture, GmmParams, InitStrategy};
use crate::model::{FittedModel, Gender, ModelBundle};
use crate::pca::{Pca, ReductionTarget};

/// Controls model fitting.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Reduction target: variance proportion or component count.
    pub reduction: ReductionTarget,

    /// Number of mixture components (default: 2).
    pub n_components: usize,

    /// Seed for k-means seeding, random initialisation and retries.
    /// `None` draws a seed from the OS.
    pub seed: Option<u64>,

    /// EM tolerance of the first attempt (default: 1e-15).
    pub initial_tol: f64,

    /// EM iteration cap of the first attempt (default: 1000).
    pub initial_max_iter: usize,

    /// Escalations tried after the first non-converged fit before giving up
    /// (default: 50).
    pub max_retries: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            reduction: ReductionTarget::default(),
            n_components: 2,
            seed: None,
            initial_tol: 1e-15,
            initial_max_iter: 1000,
            max_retries: 50,
        }
    }
}

impl FitConfig {
    /// Creates the RNG a fitting session draws from.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn first_attempt(&self) -> GmmParams {
        GmmParams {
            tol: self.initial_tol,
            max_iter: self.initial_max_iter,
            init: InitStrategy::KMeans,
            n_init: 1,
            ..GmmParams::new(self.n_components)
        }
    }
}

/// Parameters for the next attempt after a non-converged fit:
/// doubled tolerance, 10% more iterations, random initialisation, two inits.
pub fn escalate(params: &GmmParams) -> GmmParams {
    GmmParams {
        tol: params.tol * 2.0,
        max_iter: (params.max_iter as f64 * 1.1) as usize,
        init: InitStrategy::Random,
        n_init: 2,
        ..params.clone()
    }
}

/// Fits a reduction transform and mixture over `embeddings`.
pub fn fit(embeddings: &[Vec<f32>], cfg: &FitConfig) -> Result<FittedModel, PseudoError> {
    let mut rng = cfg.rng();
    fit_with_rng(embeddings, cfg, &mut rng)
}

/// Like [`fit`], drawing from a caller-owned RNG.
pub fn fit_with_rng<R: Rng + ?Sized>(
    embeddings: &[Vec<f32>],
    cfg: &FitConfig,
    rng: &mut R,
) -> Result<FittedModel, PseudoError> {
    if embeddings.is_empty() {
        return Err(PseudoError::EmptyPool);
    }
    if embeddings.len() < cfg.n_components {
        return Err(PseudoError::InsufficientSamples {
            need: cfg.n_components,
            got: embeddings.len(),
        });
    }

    let data: Vec<Vec<f64>> = embeddings
        .iter()
        .map(|e| e.iter().map(|&x| x as f64).collect())
        .collect();

    let pca = Pca::fit(&data, cfg.reduction)?;
    let reduced: Vec<Vec<f64>> = data.iter().map(|row| pca.transform(row)).collect();

    let mut params = cfg.first_attempt();
    let mut gmm = GaussianMixture::fit(&reduced, &params, rng)?;
    let mut retries = 0;
    while !gmm.converged() {
        if retries == cfg.max_retries {
            return Err(PseudoError::NotConverged { retries });
        }
        retries += 1;
        params = escalate(&params);
        warn!(
            retry = retries,
            tol = params.tol,
            max_iter = params.max_iter,
            "mixture did not converge, retrying with random init"
        );
        gmm = GaussianMixture::fit(&reduced, &params, rng)?;
    }

    info!(
        samples = embeddings.len(),
        dim = pca.dim(),
        reduced_dim = pca.n_components(),
        components = gmm.n_components(),
        iterations = gmm.n_iter(),
        retries,
        "fitted pseudo-speaker model"
    );
    Ok(FittedModel::new(pca, gmm))
}

/// Pool embeddings partitioned by gender.
#[derive(Debug, Clone, Default)]
pub struct GenderPool {
    pub male: Vec<Vec<f32>>,
    pub female: Vec<Vec<f32>>,
}

impl GenderPool {
    pub fn push(&mut self, gender: Gender, embedding: Vec<f32>) {
        match gender {
            Gender::Male => self.male.push(embedding),
            Gender::Female => self.female.push(embedding),
        }
    }

    pub fn get(&self, gender: Gender) -> &[Vec<f32>] {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }

    pub fn len(&self) -> usize {
        self.male.len() + self.female.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every embedding regardless of gender, males first.
    pub fn all(&self) -> Vec<Vec<f32>> {
        self.male.iter().chain(self.female.iter()).cloned().collect()
    }
}

/// Fits one combined model, or one model per gender, over a pool.
pub fn fit_pool(
    pool: &GenderPool,
    cfg: &FitConfig,
    combine_genders: bool,
) -> Result<ModelBundle, PseudoError> {
    info!(
        male = pool.male.len(),
        female = pool.female.len(),
        combine_genders,
        "fitting pool"
    );
    let mut rng = cfg.rng();
    if combine_genders {
        let model = fit_with_rng(&pool.all(), cfg, &mut rng)?;
        return Ok(ModelBundle::Combined(model));
    }
    let male = fit_with_rng(pool.get(Gender::Male), cfg, &mut rng)?;
    let female = fit_with_rng(pool.get(Gender::Female), cfg, &mut rng)?;
    Ok(ModelBundle::PerGender { male, female })
}
