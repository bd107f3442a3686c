//! Minimum-dwell Viterbi over the blank/transition lattice.
//!
//! Position `2j + 1` is the single frame where transition token `j` fires and
//! position `2j` is the blank run in front of it. Between two firings the path
//! spends at least `N - 1` blank frames, so consecutive transition frames are
//! at least `N` apart.

use ndarray::Array2;

use crate::alignment::emission::EmissionTable;
use crate::error::AlignmentError;
use crate::types::TransitionFrames;


/// Tables produced by the forward pass. Only `transitions` is needed for
/// backtrace; `log_probs` is kept for inspection.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    /// Best cumulative log-probability per `(frame, position)`; `-inf` when unreachable.
    pub log_probs: Array2<f32>,
    /// `transitions[(t, j)]`: the best continuation places token `j` at frame `t`.
    pub transitions: Array2<bool>,
}

/// Align every transition token of `emissions` to a frame, `min_frames` apart.
///
/// The caller is expected to have made `min_frames` feasible with
/// [`feasible_min_frames`]; an infeasible value yields an incomplete result.
pub fn forced_align_transitions(
    emissions: &EmissionTable,
    min_frames: usize,
) -> Result<TransitionFrames, AlignmentError> {
    if emissions.num_tokens() == 0 {
        return Err(AlignmentError::EmptyAlignment);
    }
    if emissions.num_frames() == 0 {
        return Err(AlignmentError::invalid_input("model produced no frames"));
    }
    if min_frames == 0 {
        return Err(AlignmentError::invalid_input(
            "minimum frames per phoneme must be at least 1",
        ));
    }

    let forward = viterbi_forward(emissions, min_frames);
    let result = viterbi_backtrace(&forward.transitions, min_frames);
    tracing::debug!(
        frames = emissions.num_frames(),
        tokens = emissions.num_tokens(),
        min_frames,
        resolved = result.resolved,
        "transition Viterbi finished"
    );
    if !result.is_complete() {
        tracing::warn!(
            resolved = result.resolved,
            expected = result.frames.len(),
            min_frames,
            "backtrace ran out of frames; leading transitions pinned to frame 0"
        );
    }
    Ok(result)
}

/// Lower `requested` to `⌊(T - 1) / K⌋` when `N·K + 1` frames are not available.
pub fn feasible_min_frames(
    requested: usize,
    num_tokens: usize,
    num_frames: usize,
) -> Result<usize, AlignmentError> {
    if requested == 0 {
        return Err(AlignmentError::invalid_input(
            "minimum frames per phoneme must be at least 1",
        ));
    }
    if num_tokens == 0 || requested.saturating_mul(num_tokens) < num_frames {
        return Ok(requested);
    }

    let applied = num_frames.saturating_sub(1) / num_tokens;
    if applied == 0 {
        return Err(AlignmentError::invalid_input(format!(
            "audio too short for transcript: {num_frames} frames < {} required",
            num_tokens + 1
        )));
    }
    tracing::warn!(
        requested,
        applied,
        num_tokens,
        num_frames,
        "minimum frames per phoneme does not fit the audio; lowering it"
    );
    Ok(applied)
}

pub fn viterbi_forward(emissions: &EmissionTable, min_frames: usize) -> ForwardPass {
    let e = emissions.as_array();
    let (t_len, positions) = e.dim();
    let k = emissions.num_tokens();
    let n = min_frames;

    let mut f = Array2::from_elem((t_len, positions), f32::NEG_INFINITY);
    let mut transitions = Array2::from_elem((t_len, k), false);
    if t_len == 0 || k == 0 || n == 0 {
        return ForwardPass {
            log_probs: f,
            transitions,
        };
    }

    // Leading blank, and the first token firing straight out of it.
    f[(0, 0)] = e[(0, 0)];
    f[(0, 1)] = e[(0, 1)];
    for t in 1..t_len {
        f[(t, 0)] = f[(t - 1, 0)] + e[(t, 0)];
        f[(t, 1)] = f[(t - 1, 0)] + e[(t, 1)];
    }

    for j in 1..k {
        let token = 2 * j + 1;
        let dwell = token - 1;
        let prev_token = token - 2;
        for t in n * j..t_len {
            // Previous token fired exactly N frames ago, blanks since.
            let mut fired_n_ago = f[(t - n, prev_token)];
            for s in t + 1 - n..t {
                fired_n_ago += e[(s, dwell)];
            }
            // Previous token fired earlier; one more blank frame.
            let fired_earlier = if t >= 2 {
                f[(t - 2, dwell)] + e[(t - 1, dwell)]
            } else {
                f32::NEG_INFINITY
            };

            transitions[(t - n, j - 1)] = fired_n_ago > fired_earlier;
            let best = fired_n_ago.max(fired_earlier);
            f[(t, token)] = best + e[(t, token)];
            f[(t - 1, dwell)] = best;
        }
    }

    let last_blank = positions - 1;
    let last_token = last_blank - 1;
    for t in n..t_len {
        let from_token = f[(t - 1, last_token)];
        let from_blank = f[(t - 1, last_blank)];
        f[(t, last_blank)] = from_token.max(from_blank) + e[(t, last_blank)];
        transitions[(t - 1, k - 1)] = from_token > from_blank;
    }
    transitions[(t_len - 1, k - 1)] = f[(t_len - 1, last_token)] > f[(t_len - 1, last_blank)];

    ForwardPass {
        log_probs: f,
        transitions,
    }
}

/// Walk the transition flags from the last frame and token backwards.
///
/// A set flag fixes the current token at `t` and jumps `min_frames` back to
/// the previous token; otherwise the search moves one frame back. Tokens left
/// when frames run out stay at frame 0.
pub fn viterbi_backtrace(transitions: &Array2<bool>, min_frames: usize) -> TransitionFrames {
    let (t_len, k) = transitions.dim();
    let mut frames = vec![0usize; k];
    let mut remaining = k;
    let mut cursor = t_len.checked_sub(1);

    while let (Some(t), Some(token)) = (cursor, remaining.checked_sub(1)) {
        if transitions[(t, token)] {
            frames[token] = t;
            remaining = token;
            cursor = t.checked_sub(min_frames);
        } else {
            cursor = t.checked_sub(1);
        }
    }

    TransitionFrames {
        frames,
        resolved: k - remaining,
    }
}
