use std::path::Path;
use std::sync::Arc;

use crate::alignment::tokenization::{default_table, TransitionTable};
use crate::config::AlignerConfig;
use crate::error::AlignmentError;
use crate::pipeline::defaults::{DefaultLabelAssembler, TransitionTokenizer, ViterbiSequenceAligner};
use crate::pipeline::model_runtime::build_runtime_backend;
use crate::pipeline::runtime::{ForcedAligner, ForcedAlignerParts};
use crate::pipeline::traits::{LabelAssembler, RuntimeBackend, SequenceAligner, Tokenizer};

pub struct ForcedAlignerBuilder {
    config: AlignerConfig,
    runtime_backend: Option<Box<dyn RuntimeBackend>>,
    tokenizer: Option<Box<dyn Tokenizer>>,
    sequence_aligner: Option<Box<dyn SequenceAligner>>,
    label_assembler: Option<Box<dyn LabelAssembler>>,
}

impl ForcedAlignerBuilder {
    pub fn new(config: AlignerConfig) -> Self {
        Self {
            config,
            runtime_backend: None,
            tokenizer: None,
            sequence_aligner: None,
            label_assembler: None,
        }
    }

    pub fn with_runtime_backend(mut self, runtime_backend: Box<dyn RuntimeBackend>) -> Self {
        self.runtime_backend = Some(runtime_backend);
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn with_sequence_aligner(mut self, sequence_aligner: Box<dyn SequenceAligner>) -> Self {
        self.sequence_aligner = Some(sequence_aligner);
        self
    }

    pub fn with_label_assembler(mut self, label_assembler: Box<dyn LabelAssembler>) -> Self {
        self.label_assembler = Some(label_assembler);
        self
    }

    pub fn build(self) -> Result<ForcedAligner, AlignmentError> {
        let expected_sample_rate_hz = if self.config.expected_sample_rate_hz == 0 {
            AlignerConfig::DEFAULT_SAMPLE_RATE_HZ
        } else {
            self.config.expected_sample_rate_hz
        };
        if !(self.config.frame_rate_hz > 0.0) {
            return Err(AlignmentError::invalid_input(format!(
                "frame rate must be positive, got {}",
                self.config.frame_rate_hz
            )));
        }
        if self.config.min_frames_per_phoneme == 0 {
            return Err(AlignmentError::invalid_input(
                "minimum frames per phoneme must be at least 1",
            ));
        }

        let table = match &self.config.transitions_path {
            Some(path) => Arc::new(TransitionTable::load(Path::new(path))?),
            None => default_table()?,
        };

        let runtime_backend = match self.runtime_backend {
            Some(runtime_backend) => runtime_backend,
            None => build_runtime_backend(&self.config, table.blank_id())?,
        };
        tracing::debug!(
            transitions = table.len(),
            device = %runtime_backend.device_label(),
            frame_rate_hz = self.config.frame_rate_hz,
            "forced aligner ready"
        );

        let restore_voiced_vowels = self.config.restore_voiced_vowels;
        Ok(ForcedAligner::from_parts(ForcedAlignerParts {
            runtime_backend,
            table,
            frame_rate_hz: self.config.frame_rate_hz,
            expected_sample_rate_hz,
            min_frames_per_phoneme: self.config.min_frames_per_phoneme,
            tokenizer: self
                .tokenizer
                .unwrap_or_else(|| Box::new(TransitionTokenizer)),
            sequence_aligner: self
                .sequence_aligner
                .unwrap_or_else(|| Box::new(ViterbiSequenceAligner)),
            label_assembler: self.label_assembler.unwrap_or_else(|| {
                Box::new(DefaultLabelAssembler {
                    restore_voiced_vowels,
                })
            }),
        }))
    }
}
