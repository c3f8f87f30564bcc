mod cli;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::warn;
use timeplot_core::{
    run_with_progress, Config, ProgressEvent, RenderSettings, RenderSettingsBuilder,
};

use crate::cli::{build_cli, default_output_path};

/// Start from the settings file, if any, and apply explicit flags on top.
fn settings_from_matches(matches: &ArgMatches) -> anyhow::Result<RenderSettings> {
    let mut builder: RenderSettingsBuilder = match matches.get_one::<PathBuf>("settings") {
        Some(path) => RenderSettings::from_json_file(path)
            .with_context(|| format!("failed to load settings from '{}'", path.display()))?
            .to_builder(),
        None => RenderSettings::builder(),
    };

    if let Some(&count) = matches.get_one::<usize>("segments") {
        builder = builder.segment_count(count);
    }
    if matches.get_flag("by-measure") {
        builder = builder.split_by_measure(true);
    }
    if let Some(&tempo) = matches.get_one::<f64>("tempo") {
        builder = builder.tempo(tempo);
    }
    if let Some(&beats) = matches.get_one::<f64>("beats-per-measure") {
        builder = builder.beats_per_measure(beats);
    }
    if let Some(&exponent) = matches.get_one::<f64>("falloff") {
        builder = builder.falloff_exponent(exponent);
    }
    if let Some(&multiplier) = matches.get_one::<f64>("angle-multiplier") {
        builder = builder.angle_multiplier(multiplier);
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        builder = builder.seed(Some(seed));
    }
    if let Some(job_id) = matches.get_one::<String>("job-id") {
        builder = builder.job_id(job_id.as_str());
    }
    if matches.get_flag("plot") {
        builder = builder.display_plot(true);
    }

    builder.build().context("invalid render settings")
}

fn play(player: &str, path: &Path) {
    match ProcessCommand::new(player).arg(path).status() {
        Ok(status) if status.success() => {}
        Ok(status) => warn!("'{player}' exited with {status}"),
        Err(err) => warn!("failed to start '{player}': {err}"),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = build_cli().get_matches();

    let input_path = matches
        .get_one::<PathBuf>("file_path")
        .expect("required argument");
    if !input_path.is_file() {
        return Err(anyhow!(
            "input file does not exist: {}",
            input_path.display()
        ));
    }

    let settings = settings_from_matches(&matches)?;
    let job_id = settings.job_id.clone();
    let output_path = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| default_output_path(input_path));
    let bit_depth = *matches
        .get_one::<u16>("bit-depth")
        .expect("defaulted argument");

    let mut builder = Config::builder(input_path, settings)
        .output_path(&output_path)
        .bit_depth(bit_depth);
    if let Some(&threads) = matches.get_one::<NonZeroUsize>("threads") {
        builder = builder.threads(threads);
    }
    let config = builder.build().with_context(|| {
        format!(
            "failed to create configuration for '{}'",
            input_path.display()
        )
    })?;

    let progress = ProgressBar::new_spinner();
    progress.set_draw_target(ProgressDrawTarget::stderr());
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {prefix}: {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_prefix(format!("timeplot_{job_id}"));
    progress.enable_steady_tick(Duration::from_millis(100));

    let progress_handle = progress.clone();
    let result = run_with_progress(config, move |event: ProgressEvent<'_>| match event {
        ProgressEvent::Status { message, .. } => {
            progress_handle.set_message(message.to_owned());
        }
        ProgressEvent::WalkEdge { index, from, to } => {
            progress_handle.suspend(|| {
                println!(
                    "edge {index}: ({:.4}, {:.4}) -> ({:.4}, {:.4})",
                    from.x, from.y, to.x, to.y
                );
            });
        }
    })
    .with_context(|| format!("failed to render '{}'", input_path.display()));

    progress.finish_and_clear();

    let summary = result?;
    println!(
        "Saved {} ({} frames, {} channel(s), {} Hz)",
        summary.output_path.display(),
        summary.frames,
        summary.channels,
        summary.sample_rate
    );

    if let Some(player) = matches.get_one::<String>("play-with") {
        play(player, &summary.output_path);
    }

    Ok(())
}
