use std::path::Path;

use domino_rs::PhonemeSegment;
use textgrid::{Interval, TextGrid, Tier, TierType};

use crate::lab_formatter::create_parent_dir;

/// Praat TextGrid with a `phonemes` tier and a `transcript` tier spanning the utterance.
pub fn write_textgrid(
    path: &Path,
    segments: &[PhonemeSegment],
    duration_sec: f64,
) -> Result<(), String> {
    let last_end = segments.last().map_or(0.0, |s| s.end_sec);
    let xmax = duration_sec.max(last_end);

    let mut textgrid = TextGrid::new(0.0, xmax).map_err(|err| {
        format!(
            "Failed to build TextGrid structure '{}': {err}",
            path.display()
        )
    })?;

    let intervals = phoneme_intervals(segments);
    let phonemes_tier = Tier {
        name: "phonemes".to_string(),
        tier_type: TierType::IntervalTier,
        xmin: 0.0,
        xmax,
        intervals,
        points: Vec::new(),
    };
    textgrid.add_tier(phonemes_tier).map_err(|err| {
        format!(
            "Failed to add phonemes tier for '{}': {err}",
            path.display()
        )
    })?;

    let transcript = segments
        .iter()
        .map(|s| s.phoneme.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let transcript_tier = Tier {
        name: "transcript".to_string(),
        tier_type: TierType::IntervalTier,
        xmin: 0.0,
        xmax,
        intervals: vec![Interval {
            xmin: 0.0,
            xmax,
            text: transcript,
        }],
        points: Vec::new(),
    };
    textgrid.add_tier(transcript_tier).map_err(|err| {
        format!(
            "Failed to add transcript tier for '{}': {err}",
            path.display()
        )
    })?;

    create_parent_dir(path)?;
    textgrid
        .to_file(path, false)
        .map_err(|err| format!("Failed to write TextGrid '{}': {err}", path.display()))
}

/// Zero-width segments are dropped; their neighbours already share the boundary.
fn phoneme_intervals(segments: &[PhonemeSegment]) -> Vec<Interval> {
    segments
        .iter()
        .filter(|segment| segment.end_sec > segment.start_sec)
        .map(|segment| Interval {
            xmin: segment.start_sec,
            xmax: segment.end_sec,
            text: segment.phoneme.clone(),
        })
        .collect()
}
