//! Forward / Backward algorithms
//!
//! Evaluation problem: P(O | model), summed over every hidden-state path.
//! All lattices returned here are T×N and hold log-probabilities.

use ndarray::Array2;

use super::model::{HiddenMarkovModel, Scale};
use crate::logic::error::HmmError;
use crate::logic::probability::{log_sum_exp, normalize};

/// Probability that `model` generated `observations`
///
/// `Scale::Log` returns the log-likelihood, `Scale::Linear` the likelihood.
pub fn evaluate(
    model: &HiddenMarkovModel,
    observations: &[usize],
    scale: Scale,
) -> Result<f64, HmmError> {
    model.validate()?;
    model.check_observations(observations)?;

    Ok(match scale {
        Scale::Log => log_likelihood(&log_forward(model, observations)),
        Scale::Linear => scaled_forward(model, observations),
    })
}

/// Log forward lattice: `alpha[[t, s]] = ln P(o_0..o_t, q_t = s)`
pub fn forward(model: &HiddenMarkovModel, observations: &[usize]) -> Result<Array2<f64>, HmmError> {
    model.validate()?;
    model.check_observations(observations)?;
    Ok(log_forward(model, observations))
}

/// Log backward lattice: `beta[[t, s]] = ln P(o_t+1..o_T-1 | q_t = s)`
pub fn backward(
    model: &HiddenMarkovModel,
    observations: &[usize],
) -> Result<Array2<f64>, HmmError> {
    model.validate()?;
    model.check_observations(observations)?;
    Ok(log_backward(model, observations))
}

/// State posteriors γ: `gamma[[t, s]] = P(q_t = s | O)`
///
/// Rows sum to 1 unless the sequence is impossible under the model, in
/// which case every entry is 0.
pub fn posteriors(
    model: &HiddenMarkovModel,
    observations: &[usize],
) -> Result<Array2<f64>, HmmError> {
    model.validate()?;
    model.check_observations(observations)?;

    let alpha = log_forward(model, observations);
    let beta = log_backward(model, observations);
    let total = log_likelihood(&alpha);

    if total == f64::NEG_INFINITY {
        return Ok(Array2::zeros(alpha.dim()));
    }

    Ok((alpha + beta).mapv(|v| (v - total).exp()))
}

// ============================================================================
// LATTICES
// ============================================================================

pub(crate) fn log_forward(model: &HiddenMarkovModel, observations: &[usize]) -> Array2<f64> {
    let n = model.states();
    let t_len = observations.len();
    let mut alpha = Array2::from_elem((t_len, n), f64::NEG_INFINITY);
    let mut terms = vec![0.0; n];

    let o0 = observations[0];
    for s in 0..n {
        alpha[[0, s]] = model.ln_initial(s) + model.ln_emission(s, o0);
    }

    for t in 1..t_len {
        let ot = observations[t];
        for s in 0..n {
            for (prev, term) in terms.iter_mut().enumerate() {
                *term = alpha[[t - 1, prev]] + model.ln_transition(prev, s);
            }
            alpha[[t, s]] = model.ln_emission(s, ot) + log_sum_exp(&terms);
        }
    }

    alpha
}

pub(crate) fn log_backward(model: &HiddenMarkovModel, observations: &[usize]) -> Array2<f64> {
    let n = model.states();
    let t_len = observations.len();
    // last row stays at ln 1 = 0
    let mut beta = Array2::zeros((t_len, n));
    let mut terms = vec![0.0; n];

    for t in (0..t_len.saturating_sub(1)).rev() {
        let next = observations[t + 1];
        for s in 0..n {
            for (j, term) in terms.iter_mut().enumerate() {
                *term = model.ln_transition(s, j) + model.ln_emission(j, next) + beta[[t + 1, j]];
            }
            beta[[t, s]] = log_sum_exp(&terms);
        }
    }

    beta
}

fn log_likelihood(alpha: &Array2<f64>) -> f64 {
    let last = alpha.nrows() - 1;
    let row: Vec<f64> = alpha.row(last).to_vec();
    log_sum_exp(&row)
}

/// Linear forward pass with per-step scaling
///
/// Each step is normalized by its coefficient c_t so the lattice never
/// underflows; the likelihood is the product of the coefficients.
fn scaled_forward(model: &HiddenMarkovModel, observations: &[usize]) -> f64 {
    let n = model.states();
    let a = model.transitions();
    let pi = model.initial();

    let mut current: Vec<f64> = (0..n)
        .map(|s| pi[s] * model.emission_probability(s, observations[0]))
        .collect();
    let mut next = vec![0.0; n];

    let mut likelihood = normalize(&mut current);
    if likelihood == 0.0 {
        return 0.0;
    }

    for &ot in &observations[1..] {
        for (s, slot) in next.iter_mut().enumerate() {
            let inbound: f64 = (0..n).map(|prev| current[prev] * a[[prev, s]]).sum();
            *slot = model.emission_probability(s, ot) * inbound;
        }
        let c = normalize(&mut next);
        if c == 0.0 {
            return 0.0;
        }
        likelihood *= c;
        std::mem::swap(&mut current, &mut next);
    }

    likelihood
}
