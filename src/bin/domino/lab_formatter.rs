use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use domino_rs::PhonemeSegment;

/// One `start<TAB>end<TAB>phoneme` line per segment, seconds to two decimals.
pub fn write_lab(path: &Path, segments: &[PhonemeSegment]) -> Result<(), String> {
    create_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|err| format!("Failed to create lab file '{}': {err}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for segment in segments {
        writeln!(
            writer,
            "{:.2}\t{:.2}\t{}",
            segment.start_sec, segment.end_sec, segment.phoneme
        )
        .map_err(|err| format!("Failed to write lab file '{}': {err}", path.display()))?;
    }
    writer
        .flush()
        .map_err(|err| format!("Failed to finalize lab file '{}': {err}", path.display()))
}

pub fn create_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create output directory '{}': {err}",
                parent.display()
            )
        })?;
    }
    Ok(())
}
