use std::fs::File;
use std::io::Write;
use std::path::Path;

use domino_rs::AlignmentOutput;

use crate::lab_formatter::create_parent_dir;

pub fn write_json(path: &Path, output: &AlignmentOutput) -> Result<(), String> {
    create_parent_dir(path)?;
    let mut file = File::create(path)
        .map_err(|err| format!("Failed to create JSON file '{}': {err}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, output)
        .map_err(|err| format!("Failed to serialize JSON '{}': {err}", path.display()))?;
    file.write_all(b"\n")
        .map_err(|err| format!("Failed to finalize JSON file '{}': {err}", path.display()))
}
