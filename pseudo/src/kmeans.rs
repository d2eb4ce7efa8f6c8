use rand::Rng;

const MAX_ITER: usize = 300;
const TOL: f64 = 1e-4;

/// Partitions `data` into `k` clusters and returns the label of each row.
///
/// k-means++ seeding followed by Lloyd iterations. Used only to seed the
/// mixture responsibilities, so a single initialisation is enough.
/// Callers guarantee `1 <= k <= data.len()`.
pub(crate) fn kmeans_labels<R: Rng + ?Sized>(
    data: &[Vec<f64>],
    k: usize,
    rng: &mut R,
) -> Vec<usize> {
    let n = data.len();
    let mut centers = seed_plus_plus(data, k, rng);
    let mut labels = vec![0usize; n];

    // Scale the shift tolerance by the data's mean per-feature variance.
    let tol = TOL * mean_variance(data);

    for _ in 0..MAX_ITER {
        for (label, row) in labels.iter_mut().zip(data.iter()) {
            *label = nearest(row, &centers).0;
        }

        let dim = data[0].len();
        let mut sums = vec![vec![0.0f64; dim]; k];
        let mut counts = vec![0usize; k];
        for (&label, row) in labels.iter().zip(data.iter()) {
            counts[label] += 1;
            for (s, &x) in sums[label].iter_mut().zip(row.iter()) {
                *s += x;
            }
        }

        let mut shift = 0.0f64;
        for c in 0..k {
            if counts[c] == 0 {
                // Empty cluster keeps its previous center.
                continue;
            }
            let inv = 1.0 / counts[c] as f64;
            let updated: Vec<f64> = sums[c].iter().map(|s| s * inv).collect();
            shift += sq_dist(&updated, &centers[c]);
            centers[c] = updated;
        }
        if shift <= tol {
            break;
        }
    }

    for (label, row) in labels.iter_mut().zip(data.iter()) {
        *label = nearest(row, &centers).0;
    }
    labels
}

fn seed_plus_plus<R: Rng + ?Sized>(data: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centers = Vec::with_capacity(k);
    centers.push(data[rng.gen_range(0..n)].clone());

    let mut dist: Vec<f64> = data.iter().map(|row| sq_dist(row, &centers[0])).collect();
    while centers.len() < k {
        let total: f64 = dist.iter().sum();
        let idx = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = n - 1;
            for (i, &d) in dist.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // All remaining points coincide with a center.
            rng.gen_range(0..n)
        };
        let center = data[idx].clone();
        for (d, row) in dist.iter_mut().zip(data.iter()) {
            *d = d.min(sq_dist(row, &center));
        }
        centers.push(center);
    }
    centers
}

fn nearest(row: &[f64], centers: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0usize, f64::INFINITY);
    for (i, c) in centers.iter().enumerate() {
        let d = sq_dist(row, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn mean_variance(data: &[Vec<f64>]) -> f64 {
    let n = data.len() as f64;
    let dim = data[0].len();
    if dim == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for d in 0..dim {
        let mean = data.iter().map(|r| r[d]).sum::<f64>() / n;
        total += data.iter().map(|r| (r[d] - mean) * (r[d] - mean)).sum::<f64>() / n;
    }
    total / dim as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn separates_two_blobs() {
        let mut data = Vec::new();
        for i in 0..10 {
            let e = i as f64 * 0.01;
            data.push(vec![0.0 + e, 0.0 - e]);
        }
        for i in 0..10 {
            let e = i as f64 * 0.01;
            data.push(vec![10.0 - e, 10.0 + e]);
        }

        let mut rng = StdRng::seed_from_u64(7);
        let labels = kmeans_labels(&data, 2, &mut rng);
        assert_eq!(labels.len(), 20);
        assert!(labels[..10].iter().all(|&l| l == labels[0]));
        assert!(labels[10..].iter().all(|&l| l == labels[10]));
        assert_ne!(labels[0], labels[10]);
    }

    #[test]
    fn duplicate_points() {
        let data = vec![vec![1.0, 1.0]; 5];
        let mut rng = StdRng::seed_from_u64(0);
        let labels = kmeans_labels(&data, 3, &mut rng);
        assert_eq!(labels.len(), 5);
        assert!(labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn single_cluster() {
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(kmeans_labels(&data, 1, &mut rng), vec![0, 0, 0]);
    }
}
