//! Viterbi decoding
//!
//! Decoding problem: the single most likely hidden-state path for an
//! observation sequence. One dynamic program serves both scales; only the
//! way scores combine differs (product vs. sum of logs).

use ndarray::Array2;

use super::model::{HiddenMarkovModel, Scale};
use crate::logic::error::HmmError;
use crate::logic::probability::argmax;

/// Most likely state path and its probability
///
/// `Scale::Log` returns the path log-probability. The path has one state per
/// observation; argmax ties resolve to the lowest state index.
pub fn decode(
    model: &HiddenMarkovModel,
    observations: &[usize],
    scale: Scale,
) -> Result<(Vec<usize>, f64), HmmError> {
    model.validate()?;
    model.check_observations(observations)?;

    Ok(match scale {
        Scale::Log => viterbi(
            model.states(),
            observations,
            |s| model.ln_initial(s),
            |i, j| model.ln_transition(i, j),
            |s, o| model.ln_emission(s, o),
            |x, y| x + y,
        ),
        Scale::Linear => {
            let transitions = model.transitions();
            let pi = model.initial();
            viterbi(
                model.states(),
                observations,
                |s| pi[s],
                |i, j| transitions[[i, j]],
                |s, o| model.emission_probability(s, o),
                |x, y| x * y,
            )
        }
    })
}

fn viterbi<I, T, E, C>(
    n: usize,
    observations: &[usize],
    initial: I,
    transition: T,
    emission: E,
    combine: C,
) -> (Vec<usize>, f64)
where
    I: Fn(usize) -> f64,
    T: Fn(usize, usize) -> f64,
    E: Fn(usize, usize) -> f64,
    C: Fn(f64, f64) -> f64,
{
    let t_len = observations.len();
    let mut delta = Array2::<f64>::zeros((t_len, n));
    let mut backpointers = Array2::<usize>::zeros((t_len, n));

    for s in 0..n {
        delta[[0, s]] = combine(initial(s), emission(s, observations[0]));
    }

    let mut scores = vec![0.0; n];
    for t in 1..t_len {
        let ot = observations[t];
        for s in 0..n {
            for (prev, score) in scores.iter_mut().enumerate() {
                *score = combine(delta[[t - 1, prev]], transition(prev, s));
            }
            let (best_prev, best_score) = argmax(&scores).unwrap_or_default();
            delta[[t, s]] = combine(best_score, emission(s, ot));
            backpointers[[t, s]] = best_prev;
        }
    }

    let last = t_len - 1;
    let final_scores = delta.row(last).to_vec();
    let (best_state, best_score) = argmax(&final_scores).unwrap_or_default();

    let mut path = vec![0; t_len];
    path[last] = best_state;
    for t in (1..t_len).rev() {
        path[t - 1] = backpointers[[t, path[t]]];
    }

    (path, best_score)
}
