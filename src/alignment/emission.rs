//! Expansion of raw model scores into the blank/token lattice columns.

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::AlignmentError;

/// Per-frame log-probabilities over lattice positions `blank, tok0, blank, tok1, …, blank`.
///
/// Shape is `(frames, 2K + 1)`. Values are copied from the model output as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionTable {
    log_probs: Array2<f32>,
}

impl EmissionTable {
    pub fn from_array(log_probs: Array2<f32>) -> Result<Self, AlignmentError> {
        if log_probs.ncols() % 2 == 0 {
            return Err(AlignmentError::invalid_input(format!(
                "emission table needs 2K+1 columns, got {}",
                log_probs.ncols()
            )));
        }
        Ok(Self { log_probs })
    }

    pub fn num_frames(&self) -> usize {
        self.log_probs.nrows()
    }

    pub fn num_positions(&self) -> usize {
        self.log_probs.ncols()
    }

    pub fn num_tokens(&self) -> usize {
        (self.log_probs.ncols() - 1) / 2
    }

    pub fn get(&self, frame: usize, position: usize) -> f32 {
        self.log_probs[(frame, position)]
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.log_probs
    }
}

/// Anything that can score the lattice for a token sequence.
pub trait EmissionSource {
    fn num_frames(&self) -> usize;

    /// Class count including the blank.
    fn vocab_size(&self) -> usize;

    fn emission_table(&self, token_ids: &[usize]) -> Result<EmissionTable, AlignmentError>;
}

/// Single `(T, V)` tensor where one column is the blank.
#[derive(Debug, Clone, PartialEq)]
pub struct JointLogProbs {
    pub log_probs: Array2<f32>,
    pub blank_id: usize,
}

/// Separate `(T, V)` transition scores and `(T,)` blank scores.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitLogProbs {
    pub transition_log_probs: Array2<f32>,
    pub blank_log_probs: Array1<f32>,
}

impl EmissionSource for JointLogProbs {
    fn num_frames(&self) -> usize {
        self.log_probs.nrows()
    }

    fn vocab_size(&self) -> usize {
        self.log_probs.ncols()
    }

    fn emission_table(&self, token_ids: &[usize]) -> Result<EmissionTable, AlignmentError> {
        let vocab = self.log_probs.ncols();
        if self.blank_id >= vocab {
            return Err(AlignmentError::invalid_input(format!(
                "blank id {} is outside model vocabulary of size {vocab}",
                self.blank_id
            )));
        }
        check_token_ids(token_ids, vocab)?;
        let blank = self.log_probs.column(self.blank_id);
        Ok(expand(&self.log_probs, blank, token_ids))
    }
}

impl EmissionSource for SplitLogProbs {
    fn num_frames(&self) -> usize {
        self.transition_log_probs.nrows()
    }

    fn vocab_size(&self) -> usize {
        self.transition_log_probs.ncols() + 1
    }

    fn emission_table(&self, token_ids: &[usize]) -> Result<EmissionTable, AlignmentError> {
        let frames = self.transition_log_probs.nrows();
        if self.blank_log_probs.len() != frames {
            return Err(AlignmentError::invalid_input(format!(
                "blank log-probs cover {} frames, transitions cover {frames}",
                self.blank_log_probs.len()
            )));
        }
        check_token_ids(token_ids, self.transition_log_probs.ncols())?;
        Ok(expand(
            &self.transition_log_probs,
            self.blank_log_probs.view(),
            token_ids,
        ))
    }
}

/// Output of an acoustic model run, in whichever layout the model produces.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Joint(JointLogProbs),
    Split(SplitLogProbs),
}

impl ModelOutput {
    pub fn as_source(&self) -> &dyn EmissionSource {
        match self {
            Self::Joint(joint) => joint,
            Self::Split(split) => split,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.as_source().num_frames()
    }

    pub fn vocab_size(&self) -> usize {
        self.as_source().vocab_size()
    }

    pub fn emission_table(&self, token_ids: &[usize]) -> Result<EmissionTable, AlignmentError> {
        self.as_source().emission_table(token_ids)
    }
}

fn check_token_ids(token_ids: &[usize], vocab: usize) -> Result<(), AlignmentError> {
    match token_ids.iter().find(|&&id| id >= vocab) {
        Some(id) => Err(AlignmentError::invalid_input(format!(
            "token id {id} is outside model vocabulary of size {vocab}"
        ))),
        None => Ok(()),
    }
}

fn expand(transitions: &Array2<f32>, blank: ArrayView1<f32>, token_ids: &[usize]) -> EmissionTable {
    let positions = 2 * token_ids.len() + 1;
    let log_probs = Array2::from_shape_fn((transitions.nrows(), positions), |(t, i)| {
        if i % 2 == 0 {
            blank[t]
        } else {
            transitions[(t, token_ids[(i - 1) / 2])]
        }
    });
    EmissionTable { log_probs }
}
