use crate::alignment::phonemes::{is_devoicing_follower, is_devoicing_trigger, voiced};
use crate::error::AlignmentError;
use crate::types::PhonemeSegment;

/// Turn transition frames into contiguous segments covering `[0, duration_sec]`.
///
/// Segment `i` ends where transition `i` fires; the last one ends at the end of
/// the audio. Boundaries past the audio end are pulled back to it.
pub fn assemble_segments(
    transition_frames: &[usize],
    phonemes: &[String],
    frame_rate_hz: f64,
    duration_sec: f64,
) -> Result<Vec<PhonemeSegment>, AlignmentError> {
    if phonemes.len() != transition_frames.len() + 1 {
        return Err(AlignmentError::invalid_input(format!(
            "{} phonemes cannot label {} transitions",
            phonemes.len(),
            transition_frames.len()
        )));
    }
    if !(frame_rate_hz > 0.0) {
        return Err(AlignmentError::invalid_input(format!(
            "frame rate must be positive, got {frame_rate_hz}"
        )));
    }

    let boundaries = transition_frames
        .iter()
        .map(|&frame| (frame as f64 / frame_rate_hz).min(duration_sec))
        .chain(std::iter::once(duration_sec));

    let mut start_sec = 0.0;
    let segments = phonemes
        .iter()
        .zip(boundaries)
        .map(|(phoneme, end_sec)| {
            let segment = PhonemeSegment {
                start_sec,
                end_sec,
                phoneme: phoneme.clone(),
            };
            start_sec = end_sec;
            segment
        })
        .collect();
    Ok(segments)
}

/// Relabel `I`/`U` as `i`/`u` where the neighbouring labels are the same
/// context that devoiced them during normalization.
///
/// Exact inverse of [`devoice_vowels`](crate::alignment::normalize::devoice_vowels).
pub fn restore_voiced_vowels(segments: &mut [PhonemeSegment]) {
    if segments.len() < 3 {
        return;
    }
    for i in 1..segments.len() - 1 {
        let Some(vowel) = voiced(&segments[i].phoneme) else {
            continue;
        };
        if is_devoicing_trigger(&segments[i - 1].phoneme)
            && is_devoicing_follower(&segments[i + 1].phoneme)
        {
            segments[i].phoneme = vowel.to_string();
        }
    }
}
