use std::error::Error;
use std::fs::{self, File};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::Path;

use tempfile::tempdir;
use timeplot_core::wav::{self, FormatError};
use timeplot_core::{
    run, run_with_progress, Config, ProgressEvent, RenderSettings, TimePlotError,
};

/// Generate lightweight audio fixtures for the tests at runtime.
///
/// The WAV data is synthesised procedurally so that no binary test assets
/// need to be stored in the repository. A JUNK chunk is placed in front of
/// "fmt " so the chunk scan is exercised on every run.
fn write_test_tone<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
    channels: u16,
) -> Result<(), Box<dyn Error>> {
    let total_frames = sample_rate as u64 * duration_ms / 1_000;
    let mut samples = Vec::with_capacity(total_frames as usize * 2 * channels as usize);

    for n in 0..total_frames {
        let theta = (n as f32 / sample_rate as f32) * 2.0 * std::f32::consts::PI * 440.0;
        let sample = (theta.sin() * 0.8 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            samples.extend_from_slice(&sample.to_le_bytes());
        }
    }

    let mut file = File::create(path)?;
    let data_len = samples.len() as u32;
    let block_align = 2 * channels;
    file.write_all(b"RIFF")?;
    file.write_all(&(48u32 + data_len).to_le_bytes())?;
    file.write_all(b"WAVE")?;
    file.write_all(b"JUNK")?;
    file.write_all(&4u32.to_le_bytes())?;
    file.write_all(&[0; 4])?;
    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&1u16.to_le_bytes())?;
    file.write_all(&channels.to_le_bytes())?;
    file.write_all(&sample_rate.to_le_bytes())?;
    file.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    file.write_all(&block_align.to_le_bytes())?;
    file.write_all(&16u16.to_le_bytes())?;
    file.write_all(b"data")?;
    file.write_all(&data_len.to_le_bytes())?;
    file.write_all(&samples)?;
    Ok(())
}

#[test]
fn run_renders_and_saves_normalized_audio() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("input.wav");
    write_test_tone(&input_path, 8_000, 1_000, 2)?;

    let output_path = work_dir.path().join("out").join("input_output.wav");
    let settings = RenderSettings::builder()
        .segment_count(6)
        .falloff_exponent(0.5)
        .seed(Some(99))
        .build()?;
    let config = Config::builder(&input_path, settings)
        .output_path(&output_path)
        .bit_depth(24)
        .build()?;

    let summary = run(config)?;
    assert_eq!(summary.output_path, output_path);
    assert_eq!(summary.sample_rate, 8_000);
    assert_eq!(summary.channels, 2);

    let bytes = fs::read(&output_path)?;
    let header = wav::read_header(&bytes)?;
    assert_eq!(header.bit_depth, 24);
    let (rate, audio) = wav::decode(&bytes)?;
    assert_eq!(rate, 8_000);
    assert_eq!(audio.frames(), summary.frames);
    if summary.frames > 0 {
        assert!((audio.peak() - 1.0).abs() < 1e-6);
    }

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_never_overwrites_previous_output() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("tone.wav");
    write_test_tone(&input_path, 8_000, 500, 1)?;
    let output_path = work_dir.path().join("tone_output.wav");

    let mut saved = Vec::new();
    for seed in 0..3 {
        let settings = RenderSettings::builder().seed(Some(seed)).build()?;
        let config = Config::builder(&input_path, settings)
            .output_path(&output_path)
            .build()?;
        saved.push(run(config)?.output_path);
    }

    assert_eq!(
        saved,
        vec![
            work_dir.path().join("tone_output.wav"),
            work_dir.path().join("tone_output (1).wav"),
            work_dir.path().join("tone_output (2).wav"),
        ]
    );

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_reports_every_stage_for_the_job() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("measures.wav");
    write_test_tone(&input_path, 8_000, 2_000, 1)?;

    let settings = RenderSettings::builder()
        .by_measure(120.0, 4.0)
        .display_plot(true)
        .job_id("nightly")
        .seed(Some(5))
        .build()?;
    let config = Config::builder(&input_path, settings)
        .output_path(work_dir.path().join("measures_output"))
        .threads(NonZeroUsize::new(2).expect("non-zero"))
        .build()?;

    let mut messages = Vec::new();
    let mut edges = 0;
    let summary = run_with_progress(config, |event: ProgressEvent<'_>| match event {
        ProgressEvent::Status { job_id, message } => {
            assert_eq!(job_id, "nightly");
            messages.push(message.to_owned());
        }
        ProgressEvent::WalkEdge { .. } => edges += 1,
    })?;

    // 2 s at 120 BPM in 4/4 is exactly one measure.
    assert_eq!(edges, 1);
    assert_eq!(
        messages,
        [
            "parsing wav file...",
            "splitting audio...",
            "creating base output audio...",
            "starting plot display...",
            "writing projected audio...",
            "normalizing...",
            "saving...",
            "finished processing.",
        ]
    );
    assert_eq!(summary.output_path, work_dir.path().join("measures_output.wav"));

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_rejects_float_wav_input() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("float.wav");
    write_test_tone(&input_path, 8_000, 100, 1)?;

    // Patch the format code (after RIFF header and 12-byte JUNK chunk) to IEEE float.
    let mut bytes = fs::read(&input_path)?;
    bytes[32..34].copy_from_slice(&3u16.to_le_bytes());
    fs::write(&input_path, bytes)?;

    let config = Config::new(&input_path, RenderSettings::default())?;
    let err = run(config).expect_err("float input should be rejected");
    assert!(matches!(
        err,
        TimePlotError::Format(FormatError::UnsupportedEncoding(3))
    ));

    work_dir.close()?;
    Ok(())
}

#[test]
fn config_rejects_missing_input_and_bad_bit_depth() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;

    let err = Config::new(work_dir.path().join("missing.wav"), RenderSettings::default())
        .expect_err("missing input should fail");
    assert!(matches!(err, TimePlotError::Io(_)));

    let input_path = work_dir.path().join("tone.wav");
    write_test_tone(&input_path, 8_000, 100, 1)?;
    let err = Config::builder(&input_path, RenderSettings::default())
        .bit_depth(12)
        .build()
        .expect_err("12-bit output should be rejected");
    assert!(matches!(
        err,
        TimePlotError::Format(FormatError::UnsupportedBitDepth(12))
    ));

    work_dir.close()?;
    Ok(())
}
