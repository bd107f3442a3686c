use std::path::Path;

use crate::alignment::phonemes::{devoiced, is_devoicing_follower, is_devoicing_trigger, PAUSE};
use crate::error::AlignmentError;

/// Normalize whitespace-separated phoneme text into a sequence that starts and
/// ends with a pause, carries devoiced vowels and has no adjacent duplicates.
///
/// Pause insertion runs first so the last vowel sees its right context, and
/// devoicing runs before collapsing so `u u` pairs are judged individually.
pub fn normalize_phonemes(text: &str) -> Result<Vec<String>, AlignmentError> {
    let mut phonemes = split_phonemes(text)?;
    insert_pause_both_ends(&mut phonemes);
    devoice_vowels(&mut phonemes);
    collapse_consecutive(&mut phonemes);
    Ok(phonemes)
}

pub fn split_phonemes(text: &str) -> Result<Vec<String>, AlignmentError> {
    let phonemes: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    if phonemes.is_empty() {
        return Err(AlignmentError::invalid_input("phoneme sequence is empty"));
    }
    Ok(phonemes)
}

pub fn insert_pause_both_ends(phonemes: &mut Vec<String>) {
    if phonemes.first().map(String::as_str) != Some(PAUSE) {
        phonemes.insert(0, PAUSE.to_string());
    }
    if phonemes.last().map(String::as_str) != Some(PAUSE) {
        phonemes.push(PAUSE.to_string());
    }
}

/// Rewrite interior `i`/`u` to `I`/`U` between a voiceless consonant and a
/// voiceless consonant or pause. Only interior elements are considered.
pub fn devoice_vowels(phonemes: &mut [String]) {
    if phonemes.len() < 3 {
        return;
    }
    for i in 1..phonemes.len() - 1 {
        let Some(unvoiced) = devoiced(&phonemes[i]) else {
            continue;
        };
        if is_devoicing_trigger(&phonemes[i - 1]) && is_devoicing_follower(&phonemes[i + 1]) {
            phonemes[i] = unvoiced.to_string();
        }
    }
}

/// Drop every element equal to its predecessor (long vowels, doubled pauses).
pub fn collapse_consecutive(phonemes: &mut Vec<String>) {
    phonemes.dedup();
}

pub fn read_phoneme_file(path: &Path) -> Result<String, AlignmentError> {
    if !path.is_file() {
        return Err(AlignmentError::invalid_input(format!(
            "phoneme file is not a regular file: {}",
            path.display()
        )));
    }
    std::fs::read_to_string(path).map_err(|e| AlignmentError::io("read phoneme file", e))
}
