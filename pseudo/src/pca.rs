use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PseudoError;
use crate::cosine::mean_vector;
use crate::linalg::{dot, symmetric_eigen};

/// How many principal components the reduction keeps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum ReductionTarget {
    /// Smallest number of components whose cumulative explained variance
    /// ratio exceeds this proportion, in (0, 1).
    Variance(f64),
    /// Exact number of components.
    Components(usize),
}

impl ReductionTarget {
    /// Interprets a numeric target: whole numbers >= 1 are component
    /// counts, values in (0, 1) are variance proportions.
    pub fn from_value(v: f64) -> Result<Self, PseudoError> {
        if !v.is_finite() || v <= 0.0 {
            return Err(PseudoError::InvalidReduction(v));
        }
        if v.fract() == 0.0 {
            return Ok(Self::Components(v as usize));
        }
        if v < 1.0 {
            return Ok(Self::Variance(v));
        }
        Err(PseudoError::InvalidReduction(v))
    }
}

impl Default for ReductionTarget {
    fn default() -> Self {
        Self::Variance(0.9)
    }
}

impl TryFrom<f64> for ReductionTarget {
    type Error = PseudoError;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Self::from_value(v)
    }
}

impl From<ReductionTarget> for f64 {
    fn from(t: ReductionTarget) -> Self {
        match t {
            ReductionTarget::Variance(p) => p,
            ReductionTarget::Components(k) => k as f64,
        }
    }
}

impl FromStr for ReductionTarget {
    type Err = PseudoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: f64 = s
            .trim()
            .parse()
            .map_err(|_| PseudoError::InvalidReduction(f64::NAN))?;
        Self::from_value(v)
    }
}

impl fmt::Display for ReductionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variance(p) => write!(f, "{p}"),
            Self::Components(k) => write!(f, "{k}"),
        }
    }
}

/// Linear dimensionality reduction by principal component analysis.
///
/// Data is mean-centred and projected onto the leading eigenvectors of the
/// sample covariance (no whitening). The transform is lossy but
/// [`Pca::inverse_transform`] always returns vectors of the original
/// dimensionality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    mean: Vec<f64>,
    /// `k x dim`, each row a unit principal axis.
    components: Vec<Vec<f64>>,
    explained_variance: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl Pca {
    /// Fits the transform over `data` (one row per sample).
    pub fn fit(data: &[Vec<f64>], target: ReductionTarget) -> Result<Self, PseudoError> {
        let n = data.len();
        if n == 0 {
            return Err(PseudoError::EmptyPool);
        }
        if n < 2 {
            return Err(PseudoError::InsufficientSamples { need: 2, got: n });
        }
        let dim = data[0].len();
        for row in data {
            if row.len() != dim {
                return Err(PseudoError::DimensionMismatch {
                    expected: dim,
                    got: row.len(),
                });
            }
        }
        let max_k = n.min(dim);
        if let ReductionTarget::Components(k) = target {
            if k == 0 || k > max_k {
                return Err(PseudoError::TooManyComponents {
                    requested: k,
                    max: max_k,
                });
            }
        }

        let mean = mean_vector(data);

        // Sample covariance with ddof = 1.
        let mut cov = vec![0.0f64; dim * dim];
        let mut centred = vec![0.0f64; dim];
        for row in data {
            for (c, (&x, &m)) in centred.iter_mut().zip(row.iter().zip(mean.iter())) {
                *c = x - m;
            }
            for i in 0..dim {
                let ci = centred[i];
                if ci == 0.0 {
                    continue;
                }
                for j in i..dim {
                    cov[i * dim + j] += ci * centred[j];
                }
            }
        }
        let denom = (n - 1) as f64;
        for i in 0..dim {
            for j in i..dim {
                let v = cov[i * dim + j] / denom;
                cov[i * dim + j] = v;
                cov[j * dim + i] = v;
            }
        }

        let total: f64 = (0..dim).map(|i| cov[i * dim + i]).sum();
        let (values, vectors) = symmetric_eigen(cov, dim);

        let values: Vec<f64> = values.into_iter().take(max_k).map(|v| v.max(0.0)).collect();
        let ratios: Vec<f64> = if total > 0.0 {
            values.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; values.len()]
        };

        let k = match target {
            ReductionTarget::Components(k) => k,
            ReductionTarget::Variance(p) => {
                if total <= 0.0 {
                    return Err(PseudoError::ZeroVariance);
                }
                let mut cumsum = 0.0;
                let below = ratios
                    .iter()
                    .take_while(|&&r| {
                        cumsum += r;
                        cumsum <= p
                    })
                    .count();
                (below + 1).min(max_k)
            }
        };

        let components = vectors
            .into_iter()
            .take(k)
            .map(|mut axis| {
                // Deterministic sign: largest-magnitude entry positive.
                let pivot = axis
                    .iter()
                    .copied()
                    .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
                if pivot < 0.0 {
                    for x in &mut axis {
                        *x = -*x;
                    }
                }
                axis
            })
            .collect();

        Ok(Self {
            mean,
            components,
            explained_variance: values[..k].to_vec(),
            explained_variance_ratio: ratios[..k].to_vec(),
        })
    }

    /// Projects an embedding into reduced coordinates.
    pub fn transform(&self, x: &[f64]) -> Vec<f64> {
        let centred: Vec<f64> = x.iter().zip(self.mean.iter()).map(|(a, m)| a - m).collect();
        self.components.iter().map(|c| dot(c, &centred)).collect()
    }

    /// Maps reduced coordinates back into embedding space.
    pub fn inverse_transform(&self, z: &[f64]) -> Vec<f64> {
        let mut out = self.mean.clone();
        for (&zi, axis) in z.iter().zip(self.components.iter()) {
            for (o, &a) in out.iter_mut().zip(axis.iter()) {
                *o += zi * a;
            }
        }
        out
    }

    /// Dimensionality of the embedding space.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Number of kept components.
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }
}
