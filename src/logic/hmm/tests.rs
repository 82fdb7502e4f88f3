//! Property tests for the HMM engine
//!
//! Randomized (seeded) models check the relations that must hold between
//! the Forward and Viterbi results in both scales.

use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{decode, evaluate, HiddenMarkovModel, Scale};

fn random_distribution(rng: &mut StdRng, len: usize) -> Vec<f64> {
    let mut row: Vec<f64> = (0..len).map(|_| rng.gen_range(0.05..1.0)).collect();
    let sum: f64 = row.iter().sum();
    row.iter_mut().for_each(|v| *v /= sum);
    row
}

fn random_model(rng: &mut StdRng) -> HiddenMarkovModel {
    let n = rng.gen_range(1..=5);
    let m = rng.gen_range(2..=4);
    let initial = random_distribution(rng, n);
    let transitions = (0..n).map(|_| random_distribution(rng, n)).collect();
    let emissions = (0..n).map(|_| random_distribution(rng, m)).collect();
    HiddenMarkovModel::discrete(initial, transitions, emissions).unwrap()
}

fn random_sequence(rng: &mut StdRng, model: &HiddenMarkovModel, max_len: usize) -> Vec<usize> {
    let len = rng.gen_range(1..=max_len);
    (0..len).map(|_| rng.gen_range(0..model.symbols())).collect()
}

#[test]
fn test_log_and_linear_evaluate_agree() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let model = random_model(&mut rng);
        let obs = random_sequence(&mut rng, &model, 30);

        let linear = evaluate(&model, &obs, Scale::Linear).unwrap();
        let log = evaluate(&model, &obs, Scale::Log).unwrap();
        let relative = (linear - log.exp()).abs() / linear;
        assert!(relative < 1e-6, "linear {} vs log {} (T = {})", linear, log.exp(), obs.len());
    }
}

#[test]
fn test_log_and_linear_decode_agree() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let model = random_model(&mut rng);
        let obs = random_sequence(&mut rng, &model, 20);

        let (linear_path, linear) = decode(&model, &obs, Scale::Linear).unwrap();
        let (log_path, log) = decode(&model, &obs, Scale::Log).unwrap();
        assert_eq!(linear_path.len(), obs.len());
        assert_eq!(log_path.len(), obs.len());
        assert!((linear - log.exp()).abs() / linear < 1e-6);
    }
}

#[test]
fn test_viterbi_bounded_by_forward() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..200 {
        let model = random_model(&mut rng);
        let obs = random_sequence(&mut rng, &model, 25);

        let (_, best_path) = decode(&model, &obs, Scale::Log).unwrap();
        let total = evaluate(&model, &obs, Scale::Log).unwrap();
        assert!(best_path <= total + 1e-12, "path {} > total {}", best_path, total);
    }
}

#[test]
fn test_repeated_calls_are_bit_identical() {
    let mut rng = StdRng::seed_from_u64(31);
    let model = random_model(&mut rng);
    let obs = random_sequence(&mut rng, &model, 40);

    for scale in [Scale::Linear, Scale::Log] {
        let first = evaluate(&model, &obs, scale).unwrap();
        let (first_path, first_p) = decode(&model, &obs, scale).unwrap();
        for _ in 0..5 {
            assert_eq!(evaluate(&model, &obs, scale).unwrap().to_bits(), first.to_bits());
            let (path, p) = decode(&model, &obs, scale).unwrap();
            assert_eq!(path, first_path);
            assert_eq!(p.to_bits(), first_p.to_bits());
        }
    }
}

#[test]
fn test_single_symbol_reduces_to_initial_times_emission() {
    let mut rng = StdRng::seed_from_u64(43);
    for _ in 0..50 {
        let model = random_model(&mut rng);
        let symbol = rng.gen_range(0..model.symbols());
        let products: Vec<f64> = (0..model.states())
            .map(|s| model.initial()[s] * model.emission_probability(s, symbol))
            .collect();

        let sum: f64 = products.iter().sum();
        let evaluated = evaluate(&model, &[symbol], Scale::Linear).unwrap();
        assert!((evaluated - sum).abs() < 1e-12);

        let max = products.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let (path, p) = decode(&model, &[symbol], Scale::Linear).unwrap();
        assert_eq!(path.len(), 1);
        assert!((p - max).abs() < 1e-12);
        assert_eq!(products[path[0]], max);
    }
}

#[test]
fn test_long_sequence_stays_finite_in_log_space() {
    let model = HiddenMarkovModel::discrete(
        vec![0.6, 0.4],
        vec![vec![0.7, 0.3], vec![0.4, 0.6]],
        vec![vec![0.5, 0.5], vec![0.1, 0.9]],
    )
    .unwrap();
    let obs: Vec<usize> = (0..5000).map(|i| i % 2).collect();

    let log = evaluate(&model, &obs, Scale::Log).unwrap();
    assert!(log.is_finite());
    assert!(log < -1000.0);

    let (path, lp) = decode(&model, &obs, Scale::Log).unwrap();
    assert_eq!(path.len(), 5000);
    assert!(lp.is_finite());
}

#[test]
fn test_concurrent_evaluation_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(59);
    let model = Arc::new(random_model(&mut rng));
    let obs = Arc::new(random_sequence(&mut rng, &model, 30));
    let expected = evaluate(&model, &obs, Scale::Log).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let model = Arc::clone(&model);
            let obs = Arc::clone(&obs);
            thread::spawn(move || evaluate(&model, &obs, Scale::Log).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().to_bits(), expected.to_bits());
    }
}
