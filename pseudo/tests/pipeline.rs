use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use xvanon_pseudo::{
    AssignOptions, FitConfig, Gender, GenderPool, Granularity, ReductionTarget, SampleOptions,
    SpeakerRecord, assign, fit_pool, mean_vector, model_io,
};

/// 20 male + 20 female 10-dimensional embeddings around two centres.
fn pool(seed: u64) -> GenderPool {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pool = GenderPool::default();
    for (gender, centre) in [(Gender::Male, -1.0f32), (Gender::Female, 1.0)] {
        for i in 0..20 {
            let e: Vec<f32> = (0..10)
                .map(|d| {
                    let z: f32 = rng.sample(StandardNormal);
                    let lobe = if d < 2 && i % 2 == 0 { 2.0 } else { 0.0 };
                    centre + lobe + z
                })
                .collect();
            pool.push(gender, e);
        }
    }
    pool
}

fn fit_cfg() -> FitConfig {
    FitConfig {
        reduction: ReductionTarget::Components(3),
        n_components: 2,
        seed: Some(2020),
        ..FitConfig::default()
    }
}

#[test]
fn sampled_mean_tracks_reduced_pool_mean() {
    let pool = pool(1);
    let bundle = fit_pool(&pool, &fit_cfg(), false).unwrap();

    for gender in Gender::ALL {
        let model = bundle.model_for(gender);
        assert_eq!(model.dim(), 10);
        assert_eq!(model.reduced_dim(), 3);
        assert!(model.gmm().converged());

        let reduced: Vec<Vec<f64>> = pool
            .get(gender)
            .iter()
            .map(|e| model.pca().transform(&e.iter().map(|&x| x as f64).collect::<Vec<_>>()))
            .collect();
        let pool_mean = mean_vector(&reduced);

        let mut rng = StdRng::seed_from_u64(99);
        let draws: Vec<Vec<f64>> = (0..1000).map(|_| model.gmm().sample(&mut rng)).collect();
        let draw_mean = mean_vector(&draws);

        for (p, d) in pool_mean.iter().zip(draw_mean.iter()) {
            assert!((p - d).abs() < 0.25, "reduced mean {p} vs sampled mean {d}");
        }
    }
}

#[test]
fn reduced_training_coordinates_invert_to_full_dimension() {
    let pool = pool(2);
    let bundle = fit_pool(&pool, &fit_cfg(), true).unwrap();
    let model = bundle.model_for(Gender::Male);
    for e in pool.all() {
        let x: Vec<f64> = e.iter().map(|&v| v as f64).collect();
        let z = model.pca().transform(&x);
        assert_eq!(z.len(), 3);
        assert_eq!(model.pca().inverse_transform(&z).len(), 10);
    }
}

#[test]
fn variance_target_yields_closure_size() {
    let pool = pool(3);
    for p in [0.3, 0.6, 0.9] {
        let cfg = FitConfig {
            reduction: ReductionTarget::Variance(p),
            ..fit_cfg()
        };
        let bundle = fit_pool(&pool, &cfg, true).unwrap();
        let pca = bundle.model_for(Gender::Female).pca();
        let ratios = pca.explained_variance_ratio();
        let total: f64 = ratios.iter().sum();
        let without_last: f64 = ratios[..ratios.len() - 1].iter().sum();
        assert!(total > p, "kept {total} should exceed {p}");
        assert!(without_last <= p, "one fewer component ({without_last}) should not exceed {p}");
    }
}

#[test]
fn female_speaker_cross_gender_per_speaker() {
    let bundle = fit_pool(&pool(4), &fit_cfg(), false).unwrap();

    let mut sources = HashMap::new();
    sources.insert("s1".to_string(), vec![0.5f32; 10]);
    let mut genders = BTreeMap::new();
    genders.insert("s1".to_string(), Gender::Female);
    let mut utts = BTreeMap::new();
    utts.insert(
        "s1".to_string(),
        vec!["s1-a".to_string(), "s1-b".to_string(), "s1-c".to_string()],
    );
    let record = SpeakerRecord::new(genders, utts);

    let opts = AssignOptions {
        cross_gender: true,
        granularity: "spk".parse::<Granularity>().unwrap(),
        sampling: SampleOptions::default(),
    };
    let mut rng = StdRng::seed_from_u64(5);
    let out = assign(&bundle, &sources, &record, &opts, &mut rng).unwrap();

    assert_eq!(out.gender_lines(), vec!["s1 m"]);
    let keys: Vec<&str> = out.embeddings.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["s1-a", "s1-b", "s1-c"]);
    assert!(out.embeddings.values().all(|e| e.len() == 10));
}

#[test]
fn cached_bundle_reproduces_assignment() {
    let bundle = fit_pool(&pool(6), &fit_cfg(), false).unwrap();
    let mut blob = Vec::new();
    model_io::save(&bundle, &mut blob).unwrap();
    let cached = model_io::load_for(&mut blob.as_slice(), false).unwrap();

    let mut sources = HashMap::new();
    sources.insert("s".to_string(), vec![1.0f32; 10]);
    let record = SpeakerRecord::new(
        BTreeMap::from([("s".to_string(), Gender::Male)]),
        BTreeMap::from([("s".to_string(), vec!["u1".to_string(), "u2".to_string()])]),
    );
    let opts = AssignOptions {
        cross_gender: false,
        granularity: Granularity::Utterance,
        sampling: SampleOptions {
            threshold: 0.5,
            max_attempts: 100,
        },
    };

    let a = assign(&bundle, &sources, &record, &opts, &mut StdRng::seed_from_u64(7)).unwrap();
    let b = assign(&cached, &sources, &record, &opts, &mut StdRng::seed_from_u64(7)).unwrap();
    assert_eq!(a.embeddings, b.embeddings);
}
