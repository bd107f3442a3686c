pub mod emission;
pub mod labels;
pub mod normalize;
pub mod phonemes;
pub mod tokenization;
pub mod viterbi;
