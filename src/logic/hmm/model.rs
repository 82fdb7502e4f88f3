//! Hidden Markov Model parameters
//!
//! Plain immutable arrays for π, A and B. A model can only be obtained
//! through validation, so every instance handed to the engine is well formed.
//! Log-space copies are computed once at construction.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::logic::error::HmmError;
use crate::logic::probability::{check_distribution, safe_ln};

// ============================================================================
// SCALE
// ============================================================================

/// Arithmetic used by `evaluate` / `decode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    /// Plain probabilities; fine for short sequences and small N
    Linear,
    /// Log-probabilities with log-sum-exp
    #[default]
    Log,
}

// ============================================================================
// EMISSION MODEL
// ============================================================================

/// Emission model B
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// N×M table: row = state, column = symbol
    Discrete(Array2<f64>),
}

impl Emission {
    /// Number of states the table covers
    pub fn states(&self) -> usize {
        match self {
            Emission::Discrete(table) => table.nrows(),
        }
    }

    /// Alphabet size
    pub fn symbols(&self) -> usize {
        match self {
            Emission::Discrete(table) => table.ncols(),
        }
    }

    /// b(state, symbol); 0 outside the table
    pub fn probability(&self, state: usize, symbol: usize) -> f64 {
        match self {
            Emission::Discrete(table) => table.get((state, symbol)).copied().unwrap_or(0.0),
        }
    }

    fn validate(&self) -> Result<(), HmmError> {
        match self {
            Emission::Discrete(table) => {
                if table.ncols() == 0 {
                    return Err(HmmError::InvalidModel("emission alphabet is empty".to_string()));
                }
                for (s, row) in table.rows().into_iter().enumerate() {
                    check_distribution(row.iter(), &format!("emission row {}", s))
                        .map_err(HmmError::InvalidModel)?;
                }
                Ok(())
            }
        }
    }

    fn to_log(&self) -> Array2<f64> {
        match self {
            Emission::Discrete(table) => table.mapv(safe_ln),
        }
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// Serializable parameter set, the shape trained models are supplied in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// π
    pub initial: Vec<f64>,
    /// A, row-major
    pub transitions: Vec<Vec<f64>>,
    /// B, one row per state
    pub emissions: Vec<Vec<f64>>,
}

/// Trained discrete HMM, immutable after construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelSpec", into = "ModelSpec")]
pub struct HiddenMarkovModel {
    initial: Array1<f64>,
    transitions: Array2<f64>,
    emission: Emission,
    log_initial: Array1<f64>,
    log_transitions: Array2<f64>,
    log_emissions: Array2<f64>,
}

impl HiddenMarkovModel {
    /// Build and validate a model
    pub fn new(
        initial: Array1<f64>,
        transitions: Array2<f64>,
        emission: Emission,
    ) -> Result<Self, HmmError> {
        validate_parts(&initial, &transitions, &emission)?;

        let log_initial = initial.mapv(safe_ln);
        let log_transitions = transitions.mapv(safe_ln);
        let log_emissions = emission.to_log();

        Ok(Self {
            initial,
            transitions,
            emission,
            log_initial,
            log_transitions,
            log_emissions,
        })
    }

    /// Build a discrete model from nested rows
    pub fn discrete(
        initial: Vec<f64>,
        transitions: Vec<Vec<f64>>,
        emissions: Vec<Vec<f64>>,
    ) -> Result<Self, HmmError> {
        let transitions = to_matrix(transitions, "transition matrix")?;
        let emissions = to_matrix(emissions, "emission table")?;
        Self::new(Array1::from(initial), transitions, Emission::Discrete(emissions))
    }

    /// Re-check π, A and B
    pub fn validate(&self) -> Result<(), HmmError> {
        validate_parts(&self.initial, &self.transitions, &self.emission)
    }

    /// N
    pub fn states(&self) -> usize {
        self.initial.len()
    }

    /// M
    pub fn symbols(&self) -> usize {
        self.emission.symbols()
    }

    pub fn initial(&self) -> ArrayView1<'_, f64> {
        self.initial.view()
    }

    pub fn transitions(&self) -> ArrayView2<'_, f64> {
        self.transitions.view()
    }

    pub fn emission(&self) -> &Emission {
        &self.emission
    }

    pub fn emission_probability(&self, state: usize, symbol: usize) -> f64 {
        self.emission.probability(state, symbol)
    }

    #[inline]
    pub(crate) fn ln_initial(&self, state: usize) -> f64 {
        self.log_initial[state]
    }

    #[inline]
    pub(crate) fn ln_transition(&self, from: usize, to: usize) -> f64 {
        self.log_transitions[[from, to]]
    }

    #[inline]
    pub(crate) fn ln_emission(&self, state: usize, symbol: usize) -> f64 {
        self.log_emissions[[state, symbol]]
    }

    /// Reject empty sequences and symbols outside the alphabet
    pub fn check_observations(&self, observations: &[usize]) -> Result<(), HmmError> {
        if observations.is_empty() {
            return Err(HmmError::EmptySequence);
        }
        let alphabet = self.symbols();
        if let Some((position, &symbol)) = observations
            .iter()
            .enumerate()
            .find(|(_, &o)| o >= alphabet)
        {
            return Err(HmmError::SymbolOutOfRange { symbol, position, alphabet });
        }
        Ok(())
    }
}

impl TryFrom<ModelSpec> for HiddenMarkovModel {
    type Error = HmmError;

    fn try_from(spec: ModelSpec) -> Result<Self, Self::Error> {
        Self::discrete(spec.initial, spec.transitions, spec.emissions)
    }
}

impl From<HiddenMarkovModel> for ModelSpec {
    fn from(model: HiddenMarkovModel) -> Self {
        let rows = |m: &Array2<f64>| -> Vec<Vec<f64>> {
            m.rows().into_iter().map(|r| r.to_vec()).collect()
        };
        let emissions = match &model.emission {
            Emission::Discrete(table) => rows(table),
        };
        ModelSpec {
            initial: model.initial.to_vec(),
            transitions: rows(&model.transitions),
            emissions,
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn validate_parts(
    initial: &Array1<f64>,
    transitions: &Array2<f64>,
    emission: &Emission,
) -> Result<(), HmmError> {
    let n = initial.len();
    if n == 0 {
        return Err(HmmError::InvalidModel("model has no states".to_string()));
    }
    if transitions.dim() != (n, n) {
        return Err(HmmError::InvalidModel(format!(
            "transition matrix is {:?}, expected ({}, {})",
            transitions.dim(),
            n,
            n
        )));
    }
    if emission.states() != n {
        return Err(HmmError::InvalidModel(format!(
            "emission model covers {} states, expected {}",
            emission.states(),
            n
        )));
    }

    check_distribution(initial.iter(), "initial distribution").map_err(HmmError::InvalidModel)?;
    for (i, row) in transitions.rows().into_iter().enumerate() {
        check_distribution(row.iter(), &format!("transition row {}", i))
            .map_err(HmmError::InvalidModel)?;
    }
    emission.validate()
}

fn to_matrix(rows: Vec<Vec<f64>>, what: &str) -> Result<Array2<f64>, HmmError> {
    let nrows = rows.len();
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(HmmError::InvalidModel(format!("{} is not rectangular", what)));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| HmmError::InvalidModel(format!("{}: {}", what, e)))
}
