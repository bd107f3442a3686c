use std::env;

use domino_rs::{
    default_table, normalize_phonemes, AlignerConfig, AlignmentError, AlignmentInput,
    AlignmentOutput, AlignmentWarning, ForcedAligner, ForcedAlignerBuilder, ModelOutput,
    RuntimeBackend, SplitLogProbs,
};
use libtest_mimic::{Arguments, Failed, Trial};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SAMPLE_RATE_HZ: u32 = 16_000;
const SAMPLES_PER_FRAME: usize = 160;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_ROUNDS: u64 = 4;
const SUITE_NAME: &str = "synthetic_alignment_recovers_transition_frames";

const PEAK: f32 = -0.01;
const OFF_PEAK: f32 = -10.0;
const BLANK: f32 = -0.05;
const BLANK_AT_PEAK: f32 = -6.0;

struct Utterance {
    id: &'static str,
    phonemes: &'static str,
    expected_labels: &'static str,
}

const UTTERANCES: &[Utterance] = &[
    Utterance {
        id: "dowango",
        phonemes: "d o w a N g o",
        expected_labels: "pau d o w a N g o pau",
    },
    Utterance {
        id: "tasukete",
        phonemes: "pau t a s u u k e ts u pau",
        expected_labels: "pau t a s u k e ts u pau",
    },
    Utterance {
        id: "ishiki",
        phonemes: "pau i sh i k i pau",
        expected_labels: "pau i sh i k i pau",
    },
    Utterance {
        id: "konnichiwa",
        phonemes: "k o N n i ch i w a",
        expected_labels: "pau k o N n i ch i w a pau",
    },
    Utterance {
        id: "arigatoo",
        phonemes: "a r i g a t o o",
        expected_labels: "pau a r i g a t o pau",
    },
    Utterance {
        id: "shita",
        phonemes: "sh i t a",
        expected_labels: "pau sh i t a pau",
    },
];

/// Replays log-probabilities in which each transition token peaks at a known frame.
struct PeakedBackend {
    transition_log_probs: Array2<f32>,
    blank_log_probs: Array1<f32>,
}

impl PeakedBackend {
    fn new(num_frames: usize, vocab: usize, peaks: &[(usize, usize)]) -> Self {
        let mut transition_log_probs = Array2::from_elem((num_frames, vocab), OFF_PEAK);
        let mut blank_log_probs = Array1::from_elem(num_frames, BLANK);
        for &(frame, id) in peaks {
            transition_log_probs[(frame, id)] = PEAK;
            blank_log_probs[frame] = BLANK_AT_PEAK;
        }
        Self {
            transition_log_probs,
            blank_log_probs,
        }
    }
}

impl RuntimeBackend for PeakedBackend {
    fn infer(&self, samples: &[f32]) -> Result<ModelOutput, AlignmentError> {
        let frames = samples.len() / SAMPLES_PER_FRAME;
        if frames != self.transition_log_probs.nrows() {
            return Err(AlignmentError::InvalidInput {
                message: format!(
                    "backend prepared {} frames, audio has {frames}",
                    self.transition_log_probs.nrows()
                ),
            });
        }
        Ok(ModelOutput::Split(SplitLogProbs {
            transition_log_probs: self.transition_log_probs.clone(),
            blank_log_probs: self.blank_log_probs.clone(),
        }))
    }

    fn device_label(&self) -> String {
        "synthetic".to_string()
    }
}

struct Scenario {
    aligner: ForcedAligner,
    input: AlignmentInput,
    peaks: Vec<usize>,
}

fn main() {
    let args = Arguments::from_args();
    let seed = env_u64("DOMINO_IT_SEED", DEFAULT_SEED);
    let rounds = env_u64("DOMINO_IT_ROUNDS", DEFAULT_ROUNDS);

    let mut tests = Vec::new();
    for utterance in UTTERANCES {
        for round in 0..rounds {
            let name = format!("{SUITE_NAME}::{}::round{round}", utterance.id);
            let case_seed = seed.wrapping_mul(31).wrapping_add(round);
            tests.push(Trial::test(name, move || {
                run_recovery_case(utterance, case_seed).map_err(Failed::from)
            }));
        }
    }
    tests.push(Trial::test("undefined_transition_is_rejected", || {
        run_undefined_transition_case().map_err(Failed::from)
    }));
    tests.push(Trial::test("audio_shorter_than_transcript_is_rejected", || {
        run_too_short_case().map_err(Failed::from)
    }));
    tests.push(Trial::test("infeasible_dwell_is_lowered_and_reported", || {
        run_lowered_dwell_case().map_err(Failed::from)
    }));
    tests.push(Trial::test("output_serializes_segments_and_warnings", || {
        run_json_shape_case().map_err(Failed::from)
    }));

    libtest_mimic::run(&args, tests).exit();
}

fn build_scenario(
    phonemes: &str,
    min_frames: usize,
    rng: &mut StdRng,
) -> Result<Scenario, String> {
    let table = default_table().map_err(|err| err.to_string())?;
    let normalized = normalize_phonemes(phonemes).map_err(|err| err.to_string())?;
    let ids = table.encode(&normalized).map_err(|err| err.to_string())?;

    let mut peaks = Vec::with_capacity(ids.len());
    let mut frame = rng.gen_range(1..10usize);
    for _ in 0..ids.len() {
        peaks.push(frame);
        frame += min_frames + rng.gen_range(0..8usize);
    }
    let num_frames = frame + rng.gen_range(0..12usize);

    let peak_ids: Vec<(usize, usize)> = peaks.iter().copied().zip(ids.iter().copied()).collect();
    let backend = PeakedBackend::new(num_frames, table.len(), &peak_ids);
    let config = AlignerConfig {
        min_frames_per_phoneme: min_frames,
        ..AlignerConfig::default()
    };
    let aligner = ForcedAlignerBuilder::new(config)
        .with_runtime_backend(Box::new(backend))
        .build()
        .map_err(|err| format!("Failed to build aligner: {err}"))?;

    Ok(Scenario {
        aligner,
        input: AlignmentInput {
            sample_rate_hz: SAMPLE_RATE_HZ,
            samples: vec![0.0f32; num_frames * SAMPLES_PER_FRAME],
            phonemes: phonemes.to_string(),
            min_frames_per_phoneme: None,
        },
        peaks,
    })
}

fn run_recovery_case(utterance: &Utterance, seed: u64) -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let min_frames = rng.gen_range(1..=5usize);
    let scenario = build_scenario(utterance.phonemes, min_frames, &mut rng)?;
    let output = scenario
        .aligner
        .align(&scenario.input)
        .map_err(|err| format!("{}: align() failed: {err}", utterance.id))?;

    if !output.warnings.is_empty() {
        return Err(format!("unexpected warnings {:?}", output.warnings));
    }
    let labels: Vec<&str> = output.segments.iter().map(|s| s.phoneme.as_str()).collect();
    let expected: Vec<&str> = utterance.expected_labels.split_whitespace().collect();
    if labels != expected {
        return Err(format!("labels {labels:?}, expected {expected:?}"));
    }

    let duration_sec = scenario.input.samples.len() as f64 / f64::from(SAMPLE_RATE_HZ);
    check_coverage(&output, duration_sec)?;
    for (i, &peak) in scenario.peaks.iter().enumerate() {
        let expected_end = peak as f64 / AlignerConfig::DEFAULT_FRAME_RATE_HZ;
        let end = output.segments[i].end_sec;
        if (end - expected_end).abs() > 1e-9 {
            return Err(format!(
                "segment {i} ({}) ends at {end}, transition peaked at {expected_end} (N={min_frames}, peaks {:?})",
                output.segments[i].phoneme, scenario.peaks
            ));
        }
    }
    Ok(())
}

fn check_coverage(output: &AlignmentOutput, duration_sec: f64) -> Result<(), String> {
    let first = output.segments.first().ok_or("no segments")?;
    let last = output.segments.last().ok_or("no segments")?;
    if first.start_sec != 0.0 {
        return Err(format!("first segment starts at {}", first.start_sec));
    }
    if (last.end_sec - duration_sec).abs() > 1e-9 {
        return Err(format!(
            "last segment ends at {}, audio lasts {duration_sec}",
            last.end_sec
        ));
    }
    for pair in output.segments.windows(2) {
        if pair[0].end_sec != pair[1].start_sec || pair[0].start_sec > pair[0].end_sec {
            return Err(format!("segments not contiguous: {:?}", pair));
        }
    }
    Ok(())
}

fn run_undefined_transition_case() -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
    let scenario = build_scenario("d o w a N g o", 3, &mut rng)?;
    match scenario.aligner.align(&AlignmentInput {
        phonemes: "h o i n ky o m a".to_string(),
        ..scenario.input.clone()
    }) {
        Err(AlignmentError::UndefinedTransition { from, to }) if from == "n" && to == "ky" => {
            Ok(())
        }
        other => Err(format!("expected undefined n -> ky, got {other:?}")),
    }
}

fn run_too_short_case() -> Result<(), String> {
    let table = default_table().map_err(|err| err.to_string())?;
    // 5 frames for "pau d o w a N g o pau": 8 transitions need at least 9.
    let backend = PeakedBackend::new(5, table.len(), &[]);
    let aligner = ForcedAlignerBuilder::new(AlignerConfig::default())
        .with_runtime_backend(Box::new(backend))
        .build()
        .map_err(|err| err.to_string())?;
    let input = AlignmentInput {
        sample_rate_hz: SAMPLE_RATE_HZ,
        samples: vec![0.0f32; 5 * SAMPLES_PER_FRAME],
        phonemes: "d o w a N g o".to_string(),
        min_frames_per_phoneme: Some(1),
    };
    match aligner.align(&input) {
        Err(AlignmentError::InvalidInput { message }) if message.contains("too short") => Ok(()),
        other => Err(format!("expected a too-short error, got {other:?}")),
    }
}

fn run_lowered_dwell_case() -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + 1);
    let scenario = build_scenario("pau i sh i k i pau", 2, &mut rng)?;
    let frames = scenario.input.samples.len() / SAMPLES_PER_FRAME;
    let tokens = scenario.peaks.len();
    let requested = frames;
    let input = AlignmentInput {
        min_frames_per_phoneme: Some(requested),
        ..scenario.input.clone()
    };
    let output = scenario
        .aligner
        .align(&input)
        .map_err(|err| format!("align() failed: {err}"))?;

    let applied = (frames - 1) / tokens;
    let expected = AlignmentWarning::InfeasibleDuration { requested, applied };
    if output.warnings.first() != Some(&expected) {
        return Err(format!(
            "expected {expected:?} first, got {:?}",
            output.warnings
        ));
    }
    for pair in output.segments[..tokens].windows(2) {
        let gap = ((pair[1].end_sec - pair[0].end_sec) * 100.0).round() as usize;
        if output.is_complete() && gap < applied {
            return Err(format!("transitions {gap} frames apart, dwell {applied}"));
        }
    }
    check_coverage(&output, frames as f64 / 100.0)
}

fn run_json_shape_case() -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + 2);
    let scenario = build_scenario("sh i t a", 3, &mut rng)?;
    let output = scenario
        .aligner
        .align(&scenario.input)
        .map_err(|err| format!("align() failed: {err}"))?;
    let value = serde_json::to_value(&output).map_err(|err| err.to_string())?;

    let segments = value["segments"]
        .as_array()
        .ok_or("segments is not an array")?;
    if segments.len() != output.segments.len() {
        return Err(format!("serialized {} segments", segments.len()));
    }
    if segments[1]["phoneme"] != "sh" || !segments[1]["start_sec"].is_number() {
        return Err(format!("unexpected segment shape {}", segments[1]));
    }
    if value["warnings"] != serde_json::json!([]) {
        return Err(format!("unexpected warnings {}", value["warnings"]));
    }

    let warning = serde_json::to_value(AlignmentWarning::IncompleteAlignment {
        resolved: 2,
        expected: 5,
    })
    .map_err(|err| err.to_string())?;
    if warning != serde_json::json!({"kind": "incomplete_alignment", "resolved": 2, "expected": 5}) {
        return Err(format!("unexpected warning shape {warning}"));
    }
    Ok(())
}

fn env_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(value) => value.trim().parse::<u64>().unwrap_or_else(|err| {
            panic!(
                "Invalid value for {}='{}' (expected u64): {}",
                name, value, err
            )
        }),
        Err(_) => default,
    }
}
