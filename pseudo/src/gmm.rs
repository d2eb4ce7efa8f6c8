use std::f64::consts::PI;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::PseudoError;
use crate::kmeans::kmeans_labels;

/// How initial responsibilities are assigned before EM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitStrategy {
    /// Hard assignment from a k-means partition.
    KMeans,
    /// Uniform random responsibilities, normalised per sample.
    Random,
}

/// EM parameters for [`GaussianMixture::fit`].
#[derive(Debug, Clone)]
pub struct GmmParams {
    /// Number of mixture components.
    pub n_components: usize,
    /// Convergence threshold on the change of the mean log-likelihood.
    pub tol: f64,
    /// Maximum EM iterations per initialisation.
    pub max_iter: usize,
    pub init: InitStrategy,
    /// Number of independent initialisations; the best lower bound wins.
    pub n_init: usize,
    /// Added to every variance for numerical stability.
    pub reg_covar: f64,
}

impl GmmParams {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            tol: 1e-3,
            max_iter: 100,
            init: InitStrategy::KMeans,
            n_init: 1,
            reg_covar: 1e-6,
        }
    }
}

/// Finite Gaussian mixture with diagonal covariance per component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianMixture {
    weights: Vec<f64>,
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
    converged: bool,
    n_iter: usize,
    lower_bound: f64,
}

impl GaussianMixture {
    /// Fits the mixture by expectation-maximisation.
    ///
    /// A non-converged fit is still returned; check [`GaussianMixture::converged`].
    pub fn fit<R: Rng + ?Sized>(
        data: &[Vec<f64>],
        params: &GmmParams,
        rng: &mut R,
    ) -> Result<Self, PseudoError> {
        let k = params.n_components;
        if k == 0 {
            return Err(PseudoError::NoComponents);
        }
        if data.is_empty() {
            return Err(PseudoError::EmptyPool);
        }
        if data.len() < k {
            return Err(PseudoError::InsufficientSamples {
                need: k,
                got: data.len(),
            });
        }
        let dim = data[0].len();
        if let Some(bad) = data.iter().find(|r| r.len() != dim) {
            return Err(PseudoError::DimensionMismatch {
                expected: dim,
                got: bad.len(),
            });
        }

        let mut best: Option<Self> = None;
        for _ in 0..params.n_init.max(1) {
            let run = Self::fit_once(data, params, rng);
            let better = match &best {
                None => true,
                Some(b) => run.lower_bound > b.lower_bound,
            };
            if better {
                best = Some(run);
            }
        }
        best.ok_or(PseudoError::NoComponents)
    }

    fn fit_once<R: Rng + ?Sized>(data: &[Vec<f64>], params: &GmmParams, rng: &mut R) -> Self {
        let k = params.n_components;
        let n = data.len();

        let mut resp = match params.init {
            InitStrategy::KMeans => {
                let labels = kmeans_labels(data, k, rng);
                let mut resp = vec![vec![0.0f64; k]; n];
                for (row, &l) in resp.iter_mut().zip(labels.iter()) {
                    row[l] = 1.0;
                }
                resp
            }
            InitStrategy::Random => (0..n)
                .map(|_| {
                    let mut row: Vec<f64> = (0..k).map(|_| rng.gen_range(0.0..1.0)).collect();
                    let sum: f64 = row.iter().sum();
                    if sum > 0.0 {
                        for r in &mut row {
                            *r /= sum;
                        }
                    } else {
                        row.fill(1.0 / k as f64);
                    }
                    row
                })
                .collect(),
        };

        let mut model = Self::m_step(data, &resp, params.reg_covar);
        let mut lower_bound = f64::NEG_INFINITY;
        let mut converged = false;
        let mut n_iter = 0;

        for iter in 1..=params.max_iter {
            n_iter = iter;
            let prev = lower_bound;
            let (mean_log_prob, log_resp) = model.e_step(data);
            for (row, log_row) in resp.iter_mut().zip(log_resp.iter()) {
                for (r, &lr) in row.iter_mut().zip(log_row.iter()) {
                    *r = lr.exp();
                }
            }
            model = Self::m_step(data, &resp, params.reg_covar);
            lower_bound = mean_log_prob;

            if (lower_bound - prev).abs() < params.tol {
                converged = true;
                break;
            }
        }

        model.converged = converged;
        model.n_iter = n_iter;
        model.lower_bound = lower_bound;
        model
    }

    /// Weights, means and variances from soft responsibilities.
    fn m_step(data: &[Vec<f64>], resp: &[Vec<f64>], reg_covar: f64) -> Self {
        let n = data.len();
        let k = resp[0].len();
        let dim = data[0].len();

        let mut nk = vec![10.0 * f64::EPSILON; k];
        let mut means = vec![vec![0.0f64; dim]; k];
        for (row, r) in data.iter().zip(resp.iter()) {
            for c in 0..k {
                nk[c] += r[c];
                for (m, &x) in means[c].iter_mut().zip(row.iter()) {
                    *m += r[c] * x;
                }
            }
        }
        for c in 0..k {
            for m in &mut means[c] {
                *m /= nk[c];
            }
        }

        let mut variances = vec![vec![0.0f64; dim]; k];
        for (row, r) in data.iter().zip(resp.iter()) {
            for c in 0..k {
                for ((v, &x), &m) in variances[c].iter_mut().zip(row.iter()).zip(means[c].iter()) {
                    *v += r[c] * (x - m) * (x - m);
                }
            }
        }
        for c in 0..k {
            for v in &mut variances[c] {
                *v = *v / nk[c] + reg_covar;
            }
        }

        let weights = nk.iter().map(|w| w / n as f64).collect();
        Self {
            weights,
            means,
            variances,
            converged: false,
            n_iter: 0,
            lower_bound: f64::NEG_INFINITY,
        }
    }

    /// Returns the mean per-sample log-likelihood and log responsibilities.
    fn e_step(&self, data: &[Vec<f64>]) -> (f64, Vec<Vec<f64>>) {
        let mut total = 0.0;
        let log_resp = data
            .iter()
            .map(|row| {
                let weighted = self.weighted_log_prob(row);
                let norm = log_sum_exp(&weighted);
                total += norm;
                weighted.into_iter().map(|w| w - norm).collect()
            })
            .collect();
        (total / data.len() as f64, log_resp)
    }

    fn weighted_log_prob(&self, x: &[f64]) -> Vec<f64> {
        let dim = x.len() as f64;
        self.means
            .iter()
            .zip(self.variances.iter())
            .zip(self.weights.iter())
            .map(|((mean, var), &w)| {
                let mut quad = 0.0;
                let mut log_det = 0.0;
                for ((&xi, &mi), &vi) in x.iter().zip(mean.iter()).zip(var.iter()) {
                    quad += (xi - mi) * (xi - mi) / vi;
                    log_det += vi.ln();
                }
                -0.5 * (dim * (2.0 * PI).ln() + log_det + quad) + w.ln()
            })
            .collect()
    }

    /// Log density of a single point under the mixture.
    pub fn log_likelihood(&self, x: &[f64]) -> f64 {
        log_sum_exp(&self.weighted_log_prob(x))
    }

    /// Draws one point: a component by weight, then a diagonal Gaussian draw.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let c = self.pick_component(rng);
        self.means[c]
            .iter()
            .zip(self.variances[c].iter())
            .map(|(&m, &v)| {
                let z: f64 = rng.sample(StandardNormal);
                m + v.sqrt() * z
            })
            .collect()
    }

    fn pick_component<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let total: f64 = self.weights.iter().sum();
        let mut u = rng.gen_range(0.0..1.0) * total;
        for (i, &w) in self.weights.iter().enumerate() {
            if u < w {
                return i;
            }
            u -= w;
        }
        self.weights.len() - 1
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// EM iterations used by the winning initialisation.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn n_components(&self) -> usize {
        self.weights.len()
    }

    pub fn dim(&self) -> usize {
        self.means.first().map_or(0, |m| m.len())
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn means(&self) -> &[Vec<f64>] {
        &self.means
    }

    pub fn variances(&self) -> &[Vec<f64>] {
        &self.variances
    }
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
