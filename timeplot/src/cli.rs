use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::{builder::ValueParser, value_parser, Arg, ArgAction, Command};

/// Directory rendered files go to when no output path is given.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Output bit depths accepted on the command line.
const BIT_DEPTHS: [u16; 4] = [8, 16, 24, 32];

/// Parse a segment count, which must be at least one.
pub fn parse_segment_count(value: &str) -> Result<usize, String> {
    let count = value
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid segment count '{value}'"))?;
    if count == 0 {
        return Err("segment count must be at least 1".into());
    }
    Ok(count)
}

/// Parse a finite number strictly greater than zero.
pub fn parse_positive(value: &str) -> Result<f64, String> {
    let number = parse_finite(value)?;
    if number <= 0.0 {
        return Err(format!("'{value}' must be greater than zero"));
    }
    Ok(number)
}

/// Parse any finite number.
pub fn parse_finite(value: &str) -> Result<f64, String> {
    let number = value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{value}'"))?;
    if !number.is_finite() {
        return Err(format!("'{value}' must be a finite number"));
    }
    Ok(number)
}

pub fn parse_bit_depth(value: &str) -> Result<u16, String> {
    value
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|depth| BIT_DEPTHS.contains(depth))
        .ok_or_else(|| format!("bit depth must be one of 8, 16, 24 or 32, got '{value}'"))
}

/// `output/<input stem>_output.wav`, relative to the working directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("timeplot"));
    Path::new(DEFAULT_OUTPUT_DIR).join(format!("{stem}_output.wav"))
}

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .about("Scatter an audio file along a random walk and render the result")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT")
                .help("Where to save the rendered WAV file [default: output/<name>_output.wav]")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("segments")
                .short('n')
                .long("segments")
                .value_name("COUNT")
                .help("Number of segments (and walk steps) to cut the audio into [default: 8]")
                .conflicts_with("by-measure")
                .value_parser(ValueParser::new(parse_segment_count)),
        )
        .arg(
            Arg::new("by-measure")
                .long("by-measure")
                .help("Cut the audio into one segment per measure")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tempo")
                .long("tempo")
                .value_name("BPM")
                .help("Tempo used by --by-measure [default: 120]")
                .value_parser(ValueParser::new(parse_positive)),
        )
        .arg(
            Arg::new("beats-per-measure")
                .long("beats-per-measure")
                .value_name("BEATS")
                .help("Beats per measure used by --by-measure [default: 4]")
                .value_parser(ValueParser::new(parse_positive)),
        )
        .arg(
            Arg::new("falloff")
                .long("falloff")
                .value_name("EXPONENT")
                .help("Attenuate segments far from the walk's baseline; 0 disables [default: 0]")
                .value_parser(ValueParser::new(parse_finite)),
        )
        .arg(
            Arg::new("angle-multiplier")
                .long("angle-multiplier")
                .value_name("FACTOR")
                .help("Scale the range of walk directions; 0 walks straight [default: 1]")
                .value_parser(ValueParser::new(parse_finite)),
        )
        .arg(
            Arg::new("bit-depth")
                .long("bit-depth")
                .value_name("BITS")
                .help("Bit depth of the rendered file")
                .default_value("16")
                .value_parser(ValueParser::new(parse_bit_depth)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed the random walk for a reproducible render")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("job-id")
                .long("job-id")
                .value_name("ID")
                .help("Identifier shown with progress messages [default: default]"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_name("COUNT")
                .help("Worker threads used for resampling")
                .value_parser(value_parser!(NonZeroUsize)),
        )
        .arg(
            Arg::new("plot")
                .long("plot")
                .help("Print each walk edge as it is rendered")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("FILE")
                .help("JSON settings file; other flags override its values")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("play-with")
                .long("play-with")
                .value_name("COMMAND")
                .help("Program to play the rendered file with"),
        )
        .arg(
            Arg::new("file_path")
                .value_name("FILE_PATH")
                .help("Path to the input WAV file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
}
