use crate::alignment::emission::{EmissionTable, ModelOutput};
use crate::alignment::tokenization::TransitionTable;
use crate::error::AlignmentError;
use crate::types::{PhonemeSegment, TokenSequence, TransitionFrames};

/// Acoustic model: waveform in, per-frame transition/blank log-probabilities out.
pub trait RuntimeBackend: Send + Sync {
    fn infer(&self, samples: &[f32]) -> Result<ModelOutput, AlignmentError>;

    fn device_label(&self) -> String;
}

pub trait Tokenizer: Send + Sync {
    fn tokenize(
        &self,
        phonemes: &str,
        table: &TransitionTable,
    ) -> Result<TokenSequence, AlignmentError>;
}

pub trait SequenceAligner: Send + Sync {
    fn align_transitions(
        &self,
        emissions: &EmissionTable,
        min_frames: usize,
    ) -> Result<TransitionFrames, AlignmentError>;
}

pub trait LabelAssembler: Send + Sync {
    fn assemble(
        &self,
        transition_frames: &[usize],
        phonemes: &[String],
        frame_rate_hz: f64,
        duration_sec: f64,
    ) -> Result<Vec<PhonemeSegment>, AlignmentError>;
}
