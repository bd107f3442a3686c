use std::path::Path;

use serde::Deserialize;

use crate::error::AlignmentError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    pub model_path: String,
    /// Transition vocabulary file; `None` uses the table embedded in the crate.
    pub transitions_path: Option<String>,
    pub device: String,
    pub expected_sample_rate_hz: u32,
    /// Acoustic model frames per second.
    pub frame_rate_hz: f64,
    pub min_frames_per_phoneme: usize,
    pub output_layout: ModelOutputLayout,
    /// Relabel devoiced `I`/`U` back to `i`/`u` in the final segments.
    pub restore_voiced_vowels: bool,
}

impl AlignerConfig {
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;
    pub const DEFAULT_FRAME_RATE_HZ: f64 = 100.0;
    pub const DEFAULT_MIN_FRAMES_PER_PHONEME: usize = 5;

    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io("read aligner config", e))?;
        serde_json::from_str(&data).map_err(|e| AlignmentError::json("parse aligner config", e))
    }
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            transitions_path: None,
            device: "cpu".to_string(),
            expected_sample_rate_hz: Self::DEFAULT_SAMPLE_RATE_HZ,
            frame_rate_hz: Self::DEFAULT_FRAME_RATE_HZ,
            min_frames_per_phoneme: Self::DEFAULT_MIN_FRAMES_PER_PHONEME,
            output_layout: ModelOutputLayout::default(),
            restore_voiced_vowels: true,
        }
    }
}

/// Shape of the acoustic model's output tensors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelOutputLayout {
    /// Separate `(T, V)` transition and `(T,)` blank log-probabilities.
    Split {
        #[serde(default = "default_input_name")]
        input_name: String,
        #[serde(default = "default_transition_output")]
        transition_output: String,
        #[serde(default = "default_blank_output")]
        blank_output: String,
    },
    /// One `(T, V + 1)` tensor with blank at `blank_id` (the table's blank id if unset).
    Joint {
        #[serde(default)]
        blank_id: Option<usize>,
    },
}

impl Default for ModelOutputLayout {
    fn default() -> Self {
        Self::Split {
            input_name: default_input_name(),
            transition_output: default_transition_output(),
            blank_output: default_blank_output(),
        }
    }
}

fn default_input_name() -> String {
    "input_waveform".to_string()
}
fn default_transition_output() -> String {
    "transition_logprobs".to_string()
}
fn default_blank_output() -> String {
    "blank_logprobs".to_string()
}
