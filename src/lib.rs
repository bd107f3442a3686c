pub mod alignment;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use alignment::emission::{EmissionSource, EmissionTable, JointLogProbs, ModelOutput, SplitLogProbs};
pub use alignment::normalize::{normalize_phonemes, read_phoneme_file};
pub use alignment::tokenization::{default_table, TransitionTable};
pub use config::{AlignerConfig, ModelOutputLayout};
pub use error::AlignmentError;
pub use pipeline::builder::ForcedAlignerBuilder;
pub use pipeline::runtime::ForcedAligner;
pub use pipeline::traits::{LabelAssembler, RuntimeBackend, SequenceAligner, Tokenizer};
pub use types::{
    AlignmentInput, AlignmentOutput, AlignmentWarning, PhonemeSegment, TokenSequence,
    TransitionFrames,
};
