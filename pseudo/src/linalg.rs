/// Eigen-decomposition of a real symmetric matrix via cyclic Jacobi rotations.
///
/// `a` is row-major `n x n` and is consumed. Returns `(values, vectors)`
/// sorted by descending eigenvalue, where `vectors[k]` is the unit
/// eigenvector for `values[k]`.
///
/// # Algorithm
///
/// Each sweep visits every off-diagonal pair `(p, q)` and applies the plane
/// rotation that zeroes `a[p][q]`. Sweeps stop once the off-diagonal mass is
/// negligible relative to the matrix norm, or after [`MAX_SWEEPS`].
pub(crate) fn symmetric_eigen(mut a: Vec<f64>, n: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    debug_assert_eq!(a.len(), n * n);

    let mut v = vec![0.0f64; n * n];
    for i in 0..n {
        v[i * n + i] = 1.0;
    }

    let norm_sq: f64 = a.iter().map(|x| x * x).sum();

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0f64;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[p * n + q] * a[p * n + q];
            }
        }
        if off == 0.0 || off <= norm_sq * OFF_DIAGONAL_EPS {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p * n + q];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let app = a[p * n + p];
                let aqq = a[q * n + q];

                let theta = (aqq - app) / (2.0 * apq);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (theta * theta + 1.0).sqrt())
                } else {
                    -1.0 / (-theta + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // A <- A J
                for k in 0..n {
                    let akp = a[k * n + p];
                    let akq = a[k * n + q];
                    a[k * n + p] = c * akp - s * akq;
                    a[k * n + q] = s * akp + c * akq;
                }
                // A <- J^T A
                for k in 0..n {
                    let apk = a[p * n + k];
                    let aqk = a[q * n + k];
                    a[p * n + k] = c * apk - s * aqk;
                    a[q * n + k] = s * apk + c * aqk;
                }
                // V <- V J
                for k in 0..n {
                    let vkp = v[k * n + p];
                    let vkq = v[k * n + q];
                    v[k * n + p] = c * vkp - s * vkq;
                    v[k * n + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        a[j * n + j]
            .partial_cmp(&a[i * n + i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let values = order.iter().map(|&k| a[k * n + k]).collect();
    let vectors = order
        .iter()
        .map(|&k| (0..n).map(|i| v[i * n + k]).collect())
        .collect();
    (values, vectors)
}

const MAX_SWEEPS: usize = 64;
const OFF_DIAGONAL_EPS: f64 = 1e-30;

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(values: &[f64], vectors: &[Vec<f64>], n: usize) -> Vec<f64> {
        let mut out = vec![0.0; n * n];
        for (lambda, vec) in values.iter().zip(vectors.iter()) {
            for i in 0..n {
                for j in 0..n {
                    out[i * n + j] += lambda * vec[i] * vec[j];
                }
            }
        }
        out
    }

    #[test]
    fn diagonal_matrix() {
        let m = vec![1.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 2.0];
        let (values, vectors) = symmetric_eigen(m, 3);
        assert_eq!(values, vec![3.0, 2.0, 1.0]);
        assert!((vectors[0][1].abs() - 1.0).abs() < 1e-12);
        assert!((vectors[1][2].abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn two_by_two() {
        // [[2, 1], [1, 2]] has eigenvalues 3 and 1.
        let (values, vectors) = symmetric_eigen(vec![2.0, 1.0, 1.0, 2.0], 2);
        assert!((values[0] - 3.0).abs() < 1e-12);
        assert!((values[1] - 1.0).abs() < 1e-12);
        let r = std::f64::consts::FRAC_1_SQRT_2;
        assert!((vectors[0][0].abs() - r).abs() < 1e-12);
        assert!((vectors[0][1].abs() - r).abs() < 1e-12);
    }

    #[test]
    fn reconstructs_dense_matrix() {
        let n = 5;
        let mut a = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                a[i * n + j] = 1.0 / (1.0 + i as f64 + j as f64) + if i == j { 1.0 } else { 0.0 };
            }
        }
        let (values, vectors) = symmetric_eigen(a.clone(), n);

        for w in values.windows(2) {
            assert!(w[0] >= w[1], "eigenvalues should be descending: {values:?}");
        }
        for (i, vi) in vectors.iter().enumerate() {
            assert!((dot(vi, vi) - 1.0).abs() < 1e-10);
            for vj in &vectors[i + 1..] {
                assert!(dot(vi, vj).abs() < 1e-10, "eigenvectors should be orthogonal");
            }
        }
        let back = reconstruct(&values, &vectors, n);
        for (x, y) in a.iter().zip(back.iter()) {
            assert!((x - y).abs() < 1e-9, "reconstruction mismatch: {x} vs {y}");
        }
    }
}
