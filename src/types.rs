use serde::Serialize;

#[derive(Debug, Clone)]
pub struct AlignmentInput {
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
    /// Whitespace-separated phoneme symbols, e.g. `"d o w a N g o"`.
    pub phonemes: String,
    /// Minimum frames per phoneme; `None` uses the aligner default.
    pub min_frames_per_phoneme: Option<usize>,
}

/// One labelled interval. Seconds are `[start_sec, end_sec]`; consecutive
/// segments share their boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhonemeSegment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub phoneme: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentWarning {
    /// The requested dwell did not fit the available frames and was lowered.
    InfeasibleDuration { requested: usize, applied: usize },
    /// Backtrace ran out of frames; leading transitions were pinned to frame 0.
    IncompleteAlignment { resolved: usize, expected: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentOutput {
    pub segments: Vec<PhonemeSegment>,
    pub warnings: Vec<AlignmentWarning>,
}

impl AlignmentOutput {
    pub fn is_complete(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| matches!(w, AlignmentWarning::IncompleteAlignment { .. }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenSequence {
    /// Transition token ids, one per adjacent phoneme pair.
    pub ids: Vec<usize>,
    /// Normalized phonemes; always `ids.len() + 1` entries.
    pub phonemes: Vec<String>,
}

/// Decoder result: the frame at which each transition token fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionFrames {
    pub frames: Vec<usize>,
    /// Number of tokens recovered by backtrace, counted from the last one.
    pub resolved: usize,
}

impl TransitionFrames {
    pub fn is_complete(&self) -> bool {
        self.resolved == self.frames.len()
    }
}
