use std::sync::Arc;

use crate::alignment::emission::ModelOutput;
use crate::alignment::tokenization::TransitionTable;
use crate::alignment::viterbi::feasible_min_frames;
use crate::error::AlignmentError;
use crate::pipeline::traits::{LabelAssembler, RuntimeBackend, SequenceAligner, Tokenizer};
use crate::types::{AlignmentInput, AlignmentOutput, AlignmentWarning};

pub struct ForcedAligner {
    runtime_backend: Box<dyn RuntimeBackend>,
    table: Arc<TransitionTable>,
    frame_rate_hz: f64,
    expected_sample_rate_hz: u32,
    min_frames_per_phoneme: usize,
    tokenizer: Box<dyn Tokenizer>,
    sequence_aligner: Box<dyn SequenceAligner>,
    label_assembler: Box<dyn LabelAssembler>,
}

pub(crate) struct ForcedAlignerParts {
    pub runtime_backend: Box<dyn RuntimeBackend>,
    pub table: Arc<TransitionTable>,
    pub frame_rate_hz: f64,
    pub expected_sample_rate_hz: u32,
    pub min_frames_per_phoneme: usize,
    pub tokenizer: Box<dyn Tokenizer>,
    pub sequence_aligner: Box<dyn SequenceAligner>,
    pub label_assembler: Box<dyn LabelAssembler>,
}

impl ForcedAligner {
    pub(crate) fn from_parts(parts: ForcedAlignerParts) -> Self {
        Self {
            runtime_backend: parts.runtime_backend,
            table: parts.table,
            frame_rate_hz: parts.frame_rate_hz,
            expected_sample_rate_hz: parts.expected_sample_rate_hz,
            min_frames_per_phoneme: parts.min_frames_per_phoneme,
            tokenizer: parts.tokenizer,
            sequence_aligner: parts.sequence_aligner,
            label_assembler: parts.label_assembler,
        }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn frame_rate_hz(&self) -> f64 {
        self.frame_rate_hz
    }

    pub fn device_label(&self) -> String {
        self.runtime_backend.device_label()
    }

    /// Run the acoustic model over `input.samples` and align `input.phonemes` to it.
    pub fn align(&self, input: &AlignmentInput) -> Result<AlignmentOutput, AlignmentError> {
        if input.samples.is_empty() {
            return Err(AlignmentError::invalid_input("audio contains no samples"));
        }
        if input.sample_rate_hz == 0 {
            return Err(AlignmentError::invalid_input("sample rate must be positive"));
        }
        if input.sample_rate_hz != self.expected_sample_rate_hz {
            tracing::warn!(
                expected_rate_hz = self.expected_sample_rate_hz,
                actual_rate_hz = input.sample_rate_hz,
                "acoustic model expects a specific sample rate; quality may degrade"
            );
        }

        let model_output = self.runtime_backend.infer(&input.samples)?;
        self.align_model_output(
            &model_output,
            &input.phonemes,
            input.samples.len(),
            input.sample_rate_hz,
            input.min_frames_per_phoneme,
        )
    }

    /// Align against log-probabilities that were already computed.
    ///
    /// `num_samples / sample_rate_hz` is the audio duration used to close the
    /// final segment.
    pub fn align_model_output(
        &self,
        model_output: &ModelOutput,
        phonemes: &str,
        num_samples: usize,
        sample_rate_hz: u32,
        min_frames_per_phoneme: Option<usize>,
    ) -> Result<AlignmentOutput, AlignmentError> {
        if sample_rate_hz == 0 {
            return Err(AlignmentError::invalid_input("sample rate must be positive"));
        }
        let tokens = self.tokenizer.tokenize(phonemes, &self.table)?;
        if tokens.ids.is_empty() {
            return Err(AlignmentError::EmptyAlignment);
        }

        if model_output.vocab_size() != self.table.vocab_size() {
            return Err(AlignmentError::invalid_input(format!(
                "model scores {} classes but the transition table defines {} pairs plus blank",
                model_output.vocab_size(),
                self.table.len()
            )));
        }
        let emissions = model_output.emission_table(&tokens.ids)?;
        let requested = min_frames_per_phoneme.unwrap_or(self.min_frames_per_phoneme);
        let applied = feasible_min_frames(requested, tokens.ids.len(), emissions.num_frames())?;

        let mut warnings = Vec::new();
        if applied != requested {
            warnings.push(AlignmentWarning::InfeasibleDuration { requested, applied });
        }

        let transitions = self
            .sequence_aligner
            .align_transitions(&emissions, applied)?;
        if !transitions.is_complete() {
            warnings.push(AlignmentWarning::IncompleteAlignment {
                resolved: transitions.resolved,
                expected: transitions.frames.len(),
            });
        }

        let decoded = self.table.decode(&tokens.ids)?;
        let duration_sec = num_samples as f64 / f64::from(sample_rate_hz);
        let segments = self.label_assembler.assemble(
            &transitions.frames,
            &decoded,
            self.frame_rate_hz,
            duration_sec,
        )?;
        if segments.is_empty() {
            return Err(AlignmentError::EmptyAlignment);
        }

        tracing::debug!(
            phonemes = segments.len(),
            frames = emissions.num_frames(),
            min_frames = applied,
            duration_sec,
            "phoneme alignment finished"
        );
        Ok(AlignmentOutput { segments, warnings })
    }
}
