/// Integration tests for the measurement CLI.
///
/// These run the binary end to end and check:
/// 1. Rendered WAV format and length
/// 2. More feedback leaves a louder tail
/// 3. A design written to JSON loads back and reproduces the DC gain
/// 4. Invalid configurations exit with an error
use std::process::Command;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-q", "-p", "brigade-bench", "--"]);
    cmd
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(name)
}

fn read_wav_samples(path: &std::path::Path) -> Vec<f64> {
    let mut reader = hound::WavReader::open(path).expect("failed to open WAV");
    let max_val = (1i32 << (reader.spec().bits_per_sample - 1)) as f64;
    reader
        .samples::<i32>()
        .map(|s| s.unwrap() as f64 / max_val)
        .collect()
}

#[test]
fn test_cli_renders_wav() {
    let output_path = temp_path("brigade_integration_render.wav");
    let _ = std::fs::remove_file(&output_path);

    let status = cargo_bin()
        .args(["render", "-d", "0.5", "-o"])
        .arg(&output_path)
        .status()
        .expect("failed to run brigade-bench");

    assert!(status.success(), "brigade-bench exited with error");
    assert!(output_path.exists(), "WAV file not created");

    let reader = hound::WavReader::open(&output_path).expect("invalid WAV file");
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().sample_rate, 44100);
    assert_eq!(reader.spec().bits_per_sample, 24);
    assert_eq!(reader.len(), 22050);

    std::fs::remove_file(&output_path).ok();
}

#[test]
fn test_feedback_lengthens_tail() {
    let dry_path = temp_path("brigade_fb_low.wav");
    let wet_path = temp_path("brigade_fb_high.wav");

    for (path, feedback) in [(&dry_path, "0.0"), (&wet_path, "0.7")] {
        let status = cargo_bin()
            .args(["render", "-d", "1.0", "--mix", "1.0", "--feedback", feedback, "-o"])
            .arg(path)
            .status()
            .unwrap();
        assert!(status.success());
    }

    let energy = |path: &std::path::Path| -> f64 {
        let samples = read_wav_samples(path);
        samples[samples.len() / 2..].iter().map(|s| s * s).sum()
    };
    let low = energy(&dry_path);
    let high = energy(&wet_path);
    assert!(high > low, "feedback 0.7 tail ({high}) should exceed feedback 0 ({low})");

    std::fs::remove_file(&dry_path).ok();
    std::fs::remove_file(&wet_path).ok();
}

#[test]
fn test_design_json_round_trips() {
    let design_path = temp_path("brigade_design.json");
    let _ = std::fs::remove_file(&design_path);

    let status = cargo_bin()
        .args(["design", "--stages", "64", "-o"])
        .arg(&design_path)
        .status()
        .unwrap();
    assert!(status.success());
    let text = std::fs::read_to_string(&design_path).unwrap();
    assert!(text.contains("\"stages\": 64"), "unexpected design file:\n{text}");

    let output = cargo_bin()
        .args(["dc", "--clock", "20000", "--design"])
        .arg(&design_path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let error_line = stdout
        .lines()
        .find(|l| l.trim_start().starts_with("Error:"))
        .expect("no error line in dc output");
    let err: f64 = error_line.split_whitespace().last().unwrap().parse().unwrap();
    assert!(err < 1e-6, "DC error {err}");

    std::fs::remove_file(&design_path).ok();
}

#[test]
fn test_zero_stages_is_rejected() {
    let output = cargo_bin().args(["dc", "--stages", "0"]).output().unwrap();
    assert!(!output.status.success(), "zero stages should fail");
}
