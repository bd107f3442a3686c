use crate::alignment::emission::EmissionTable;
use crate::alignment::labels::{assemble_segments, restore_voiced_vowels};
use crate::alignment::tokenization::{build_token_sequence, TransitionTable};
use crate::alignment::viterbi::forced_align_transitions;
use crate::error::AlignmentError;
use crate::pipeline::traits::{LabelAssembler, SequenceAligner, Tokenizer};
use crate::types::{PhonemeSegment, TokenSequence, TransitionFrames};

pub struct TransitionTokenizer;

impl Tokenizer for TransitionTokenizer {
    fn tokenize(
        &self,
        phonemes: &str,
        table: &TransitionTable,
    ) -> Result<TokenSequence, AlignmentError> {
        build_token_sequence(phonemes, table)
    }
}

pub struct ViterbiSequenceAligner;

impl SequenceAligner for ViterbiSequenceAligner {
    fn align_transitions(
        &self,
        emissions: &EmissionTable,
        min_frames: usize,
    ) -> Result<TransitionFrames, AlignmentError> {
        forced_align_transitions(emissions, min_frames)
    }
}

pub struct DefaultLabelAssembler {
    pub restore_voiced_vowels: bool,
}

impl Default for DefaultLabelAssembler {
    fn default() -> Self {
        Self {
            restore_voiced_vowels: true,
        }
    }
}

impl LabelAssembler for DefaultLabelAssembler {
    fn assemble(
        &self,
        transition_frames: &[usize],
        phonemes: &[String],
        frame_rate_hz: f64,
        duration_sec: f64,
    ) -> Result<Vec<PhonemeSegment>, AlignmentError> {
        let mut segments =
            assemble_segments(transition_frames, phonemes, frame_rate_hz, duration_sec)?;
        if self.restore_voiced_vowels {
            restore_voiced_vowels(&mut segments);
        }
        Ok(segments)
    }
}
