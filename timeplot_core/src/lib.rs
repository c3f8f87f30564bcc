//! Random-walk "time plotting" of uncompressed PCM audio.
//!
//! A source waveform is cut into segments, each segment is bound to one edge
//! of a 2-D random walk, and the walk's geometry decides how fast, in which
//! direction and where on the output timeline every segment plays. See
//! [`render`] for the transform itself and [`run`] for the file-to-file
//! pipeline.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

mod buffer;
pub mod normalize;
pub mod progress;
pub mod render;
pub mod resample;
pub mod settings;
pub mod split;
pub mod walk;
pub mod wav;

pub use buffer::AudioBuffer;
pub use normalize::normalize;
pub use progress::{ProgressEvent, ProgressReporter, SilentProgress};
pub use render::{render, Renderer};
pub use resample::resample;
pub use settings::{RenderSettings, RenderSettingsBuilder};
pub use split::{split_by_count, split_by_measure, Split};
pub use walk::{RandomWalk, WalkPoint};
pub use wav::FormatError;

/// Bit depth written when none is configured.
pub const DEFAULT_BIT_DEPTH: u16 = 16;

/// Errors produced while decoding, transforming or writing audio.
#[derive(Debug, Error)]
pub enum TimePlotError {
    /// The input bytes are not a supported PCM WAV container.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A sample handed to the encoder lies outside `[-1.0, 1.0]`.
    #[error("sample {index} of channel {channel} is {value}, outside [-1.0, 1.0]")]
    SampleOutOfRange {
        channel: usize,
        index: usize,
        value: f64,
    },

    /// Channels of one buffer disagree in length.
    #[error("channel {channel} has {found} samples but channel 0 has {expected}")]
    ChannelLength {
        channel: usize,
        expected: usize,
        found: usize,
    },

    /// The resampler was asked for a zero (or NaN) speed.
    #[error("resampling speed must be non-zero, got {0}")]
    InvalidSpeed(f64),

    /// A walk edge produced a playback speed of zero.
    #[error("walk edge {segment} produced a playback speed of zero")]
    ZeroSpeed { segment: usize },

    /// The audio cannot be split into the requested number of segments.
    #[error("segment count must be at least 1, got {0}")]
    InvalidSegmentCount(usize),

    /// A parameter is outside the range an operation accepts.
    #[error("{0}")]
    InvalidArgument(String),

    /// A settings file could not be parsed.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// The resampling worker pool could not be created.
    #[error("failed to start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Wrapper around IO errors encountered while reading or writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration for rendering one file.
#[derive(Clone, Debug)]
pub struct Config {
    /// Canonicalized path of the source WAV file.
    pub input_path: PathBuf,
    /// Where to save the result; a numbered name is generated when absent.
    /// An existing file is never overwritten.
    pub output_path: Option<PathBuf>,
    pub bit_depth: u16,
    /// Worker threads used for resampling; rayon's default when absent.
    pub threads: Option<NonZeroUsize>,
    pub settings: RenderSettings,
}

impl Config {
    /// Construct a [`Config`] with default output options.
    pub fn new<P: AsRef<Path>>(input: P, settings: RenderSettings) -> Result<Self, TimePlotError> {
        Self::builder(input, settings).build()
    }

    pub fn builder<P: AsRef<Path>>(input: P, settings: RenderSettings) -> ConfigBuilder {
        ConfigBuilder {
            input_path: input.as_ref().to_path_buf(),
            output_path: None,
            bit_depth: DEFAULT_BIT_DEPTH,
            threads: None,
            settings,
        }
    }
}

/// Builder for [`Config`].
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    input_path: PathBuf,
    output_path: Option<PathBuf>,
    bit_depth: u16,
    threads: Option<NonZeroUsize>,
    settings: RenderSettings,
}

impl ConfigBuilder {
    pub fn output_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn bit_depth(mut self, bit_depth: u16) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn threads(mut self, threads: NonZeroUsize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Validate the options and canonicalize the input path.
    pub fn build(self) -> Result<Config, TimePlotError> {
        if !matches!(self.bit_depth, 8 | 16 | 24 | 32) {
            return Err(FormatError::UnsupportedBitDepth(self.bit_depth).into());
        }
        self.settings.validate()?;

        Ok(Config {
            input_path: fs::canonicalize(&self.input_path)?,
            output_path: self.output_path,
            bit_depth: self.bit_depth,
            threads: self.threads,
            settings: self.settings,
        })
    }
}

/// Outcome of a successful [`run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Path the rendered audio was saved under.
    pub output_path: PathBuf,
    pub sample_rate: u32,
    pub channels: usize,
    /// Length of the rendered audio in frames.
    pub frames: usize,
}

/// Render the configured input file and save the result.
pub fn run(config: Config) -> Result<RunSummary, TimePlotError> {
    run_with_progress(config, SilentProgress)
}

/// [`run`], reporting progress to `progress`.
pub fn run_with_progress<P: ProgressReporter>(
    config: Config,
    mut progress: P,
) -> Result<RunSummary, TimePlotError> {
    let job_id = config.settings.job_id.clone();

    progress::status(&mut progress, &job_id, "parsing wav file...");
    let (sample_rate, audio) = wav::read_wav(&config.input_path)?;
    info!(
        "read '{}': {} frame(s), {} channel(s), {sample_rate} Hz",
        config.input_path.display(),
        audio.frames(),
        audio.channel_count()
    );

    let settings = config.settings.to_builder().sample_rate(sample_rate).build()?;
    let pool = config
        .threads
        .map(|threads| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads.get())
                .build()
        })
        .transpose()?;

    let mut renderer = Renderer::new(&settings);
    if let Some(pool) = pool.as_ref() {
        renderer = renderer.with_pool(pool);
    }
    let rendered = renderer.render(audio, &mut progress)?;

    progress::status(&mut progress, &job_id, "saving...");
    if let Some(parent) = config
        .output_path
        .as_deref()
        .and_then(Path::parent)
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)?;
    }
    let output_path = wav::save_wav(
        &rendered,
        config.output_path.as_deref(),
        config.bit_depth,
        sample_rate,
    )?;
    progress::status(&mut progress, &job_id, "finished processing.");

    Ok(RunSummary {
        output_path,
        sample_rate,
        channels: rendered.channel_count(),
        frames: rendered.frames(),
    })
}
