//! Sequencer pipeline tests.
//!
//! Loads stimulation configurations from disk and runs them through
//! normalize → generate → encode, checking the timing-budget arithmetic on
//! the flattened sequences.

use estim_common::config::{ConfigError, ConfigLoader};
use estim_common::prelude::*;
use estim_common::stim::encoding::encode_program;
use estim_common::stim::sequence::generate;
use serde::Deserialize;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct StimFile {
    stimulation: StimulationConfig,
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const MONOPHASIC: &str = r#"
[stimulation]
modulation = "current"
amplitude = { value = 100, unit = "uA" }
event_count = 3
inter_event_gap = { value = 100, unit = "us" }
train_count = 2
train_duration = { value = 2, unit = "ms" }
external_trigger_duration = { value = 500, unit = "us" }

[stimulation.waveform]
kind = "monophasic"
pulse_duration = { value = 100, unit = "us" }
"#;

fn pairs(seq: &[PulseEvent]) -> Vec<(i32, u64)> {
    seq.iter().map(|e| (e.amplitude, e.duration_us)).collect()
}

#[test]
fn monophasic_file_to_sequences() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "stim.toml", MONOPHASIC);
    let file = StimFile::load(&path).unwrap();

    let program = PulseProgram::from_config(&file.stimulation).unwrap();
    assert_eq!(
        pairs(&program.stim_sequence()),
        vec![
            (100, 100),
            (0, 100),
            (100, 100),
            (0, 100),
            (100, 100),
            (0, 1500),
            (100, 100),
            (0, 100),
            (100, 100),
            (0, 100),
            (100, 100),
        ]
    );
    assert_eq!(
        pairs(&program.sync_sequence()),
        vec![(1, 500), (0, 1500), (1, 500)]
    );
}

#[test]
fn every_non_final_train_fills_the_budget() {
    for (kind, extra) in [
        ("monophasic", "pulse_duration = { value = 0.25, unit = \"ms\" }"),
        ("biphasic", "pulse_duration = { value = 75, unit = \"us\" }"),
        ("sinusoidal", "timing = { mode = \"frequency\", hz = 5000 }"),
    ] {
        let toml = format!(
            r#"
[stimulation]
amplitude = {{ value = -1.2, unit = "mA" }}
event_count = 4
inter_event_gap = {{ value = 50, unit = "us" }}
train_count = 5
train_duration = {{ value = 10, unit = "ms" }}
external_trigger_duration = {{ value = 1, unit = "ms" }}

[stimulation.waveform]
kind = "{kind}"
{extra}
"#
        );
        let file = StimFile::from_toml_str(&toml).unwrap();
        let program = PulseProgram::from_config(&file.stimulation).unwrap();
        let plan = program.plan;

        assert_eq!(program.train_count(), 5);
        for train in &program.trains[..4] {
            assert_eq!(train.stim_duration_us(), 10_000, "{kind}");
            assert_eq!(train.sync_duration_us(), 10_000, "{kind}");
        }
        let last = &program.trains[4];
        assert_eq!(last.stim_duration_us(), plan.active_train_us(), "{kind}");
        assert_eq!(last.sync_duration_us(), 1_000, "{kind}");
        assert_eq!(
            program.total_duration_us(),
            4 * 10_000 + plan.active_train_us()
        );
        assert!(program.stim_sequence().iter().all(|e| e.duration_us > 0));
    }
}

#[test]
fn json_config_matches_toml() {
    let dir = TempDir::new().unwrap();
    let json = r#"{
        "stimulation": {
            "modulation": "current",
            "amplitude": { "value": 100, "unit": "uA" },
            "event_count": 3,
            "inter_event_gap": { "value": 100, "unit": "us" },
            "train_count": 2,
            "train_duration": { "value": 2, "unit": "ms" },
            "external_trigger_duration": { "value": 500, "unit": "us" },
            "waveform": { "kind": "monophasic", "pulse_duration": { "value": 100, "unit": "us" } }
        }
    }"#;
    let from_json = StimFile::load(&write(&dir, "stim.json", json)).unwrap();
    let from_toml = StimFile::from_toml_str(MONOPHASIC).unwrap();
    assert_eq!(from_json.stimulation, from_toml.stimulation);
}

#[test]
fn budget_errors_surface_before_generation() {
    let short = MONOPHASIC.replace(
        "train_duration = { value = 2, unit = \"ms\" }",
        "train_duration = { value = 400, unit = \"us\" }",
    );
    let file = StimFile::from_toml_str(&short).unwrap();
    assert!(matches!(
        file.stimulation.normalize(),
        Err(StimError::InsufficientTrainBudget { .. })
    ));
}

#[test]
fn unknown_waveform_is_a_parse_error() {
    let bad = MONOPHASIC.replace("kind = \"monophasic\"", "kind = \"triangle\"");
    assert!(matches!(
        StimFile::from_toml_str(&bad),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn encoded_frames_decode_to_program() {
    let biphasic = MONOPHASIC.replace("kind = \"monophasic\"", "kind = \"biphasic\"");
    let file = StimFile::from_toml_str(&biphasic).unwrap();
    let plan = file.stimulation.normalize().unwrap();
    let program = generate(&plan).unwrap();

    for sign_bit in [12, 15] {
        let encoder = SignMagnitude::new(sign_bit).unwrap();
        let encoded = encode_program(&program, &encoder).unwrap();
        let decoded: Vec<i32> = encoded
            .stim
            .amplitudes
            .iter()
            .map(|&w| encoder.decode(w))
            .collect();
        let expected: Vec<i32> = program.stim_sequence().iter().map(|e| e.amplitude).collect();
        assert_eq!(decoded, expected);
        assert_eq!(encoded.stim.duration_us(), program.total_duration_us());
        assert_eq!(encoded.sync.amplitudes, vec![1, 0, 1]);
    }
}
