use std::path::Path;

use hound::{SampleFormat, WavReader};

/// Decode a WAV file to mono f32. Integer PCM is scaled by `2^(bits - 1)`,
/// so 16-bit samples become `s / 32768`; channels are averaged.
pub fn read_wav_mono(path: &Path) -> Result<(u32, Vec<f32>), String> {
    let mut reader = WavReader::open(path)
        .map_err(|err| format!("Failed to open WAV '{}': {err}", path.display()))?;
    let wav_spec = reader.spec();
    let channels = usize::from(wav_spec.channels);
    if channels == 0 {
        return Err(format!("WAV has zero channels: {}", path.display()));
    }

    let interleaved: Vec<f32> = match wav_spec.sample_format {
        SampleFormat::Int => {
            let scale = (1_i64 << (wav_spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()
        }
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>(),
    }
    .map_err(|err| format!("Failed reading samples from '{}': {err}", path.display()))?;

    if channels == 1 {
        return Ok((wav_spec.sample_rate, interleaved));
    }
    let mono = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok((wav_spec.sample_rate, mono))
}
