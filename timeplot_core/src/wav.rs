//! Byte-exact codec for uncompressed linear PCM WAV containers.
//!
//! Samples are stored as little-endian signed integers of `bit_depth / 8`
//! bytes and mapped to floats by dividing by `2^(bit_depth - 1) - 1`.
//! Every whole-byte depth from 8 to 64 bits is accepted, including 8-bit
//! data, which is read as signed like every other depth.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::{AudioBuffer, TimePlotError};

/// Prefix used for generated file names when no output path is given.
pub const GENERATED_NAME_PREFIX: &str = "timeplot_output_";

const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;
const RIFF_HEADER_LEN: usize = 12;

/// Faults in the container bytes handed to [`decode`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("input is not a RIFF/WAVE container")]
    NotWave,

    #[error("could not find the \"fmt \" chunk")]
    MissingFmtChunk,

    #[error("unsupported audio format code {0}; only uncompressed PCM (1) is accepted")]
    UnsupportedEncoding(u16),

    #[error("unsupported bit depth {0}; it must be a multiple of 8 between 8 and 64")]
    UnsupportedBitDepth(u16),

    #[error("the container declares zero channels")]
    NoChannels,

    #[error("could not find the \"data\" chunk")]
    MissingDataChunk,

    #[error("the container ends inside the \"{0}\" chunk header")]
    Truncated(&'static str),
}

/// Stream parameters read from the `fmt ` chunk, plus the location of the
/// sample data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
    data_offset: usize,
    data_len: usize,
}

impl WavHeader {
    fn bytes_per_sample(&self) -> usize {
        usize::from(self.bit_depth / 8)
    }
}

/// Parse and validate the container header without decoding any samples.
pub fn read_header(bytes: &[u8]) -> Result<WavHeader, FormatError> {
    if bytes.len() < RIFF_HEADER_LEN || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(FormatError::NotWave);
    }

    // Optional chunks such as JUNK may precede "fmt ", so it is found by scanning.
    let fmt = bytes[RIFF_HEADER_LEN..]
        .windows(4)
        .position(|window| window == b"fmt ")
        .map(|index| index + RIFF_HEADER_LEN)
        .ok_or(FormatError::MissingFmtChunk)?;
    if fmt + 24 > bytes.len() {
        return Err(FormatError::Truncated("fmt "));
    }

    let format = read_u16_le(bytes, fmt + 8);
    if format != PCM_FORMAT {
        return Err(FormatError::UnsupportedEncoding(format));
    }
    let channels = read_u16_le(bytes, fmt + 10);
    let sample_rate = read_u32_le(bytes, fmt + 12);
    let bit_depth = read_u16_le(bytes, fmt + 22);
    validate_bit_depth(bit_depth)?;
    if channels == 0 {
        return Err(FormatError::NoChannels);
    }

    let fmt_len = read_u32_le(bytes, fmt + 4).max(FMT_CHUNK_LEN) as usize;
    let (data_offset, data_len) = find_data_chunk(bytes, fmt + 8 + fmt_len + fmt_len % 2)?;

    Ok(WavHeader {
        channels,
        sample_rate,
        bit_depth,
        data_offset,
        data_len,
    })
}

fn find_data_chunk(bytes: &[u8], mut pos: usize) -> Result<(usize, usize), FormatError> {
    while pos.saturating_add(8) <= bytes.len() {
        let chunk_len = read_u32_le(bytes, pos + 4) as usize;
        let body = pos + 8;
        if &bytes[pos..pos + 4] == b"data" {
            return Ok((body, chunk_len.min(bytes.len() - body)));
        }
        pos = body
            .saturating_add(chunk_len)
            .saturating_add(chunk_len % 2);
    }

    if pos < bytes.len() {
        Err(FormatError::Truncated("data"))
    } else {
        Err(FormatError::MissingDataChunk)
    }
}

fn validate_bit_depth(bit_depth: u16) -> Result<(), FormatError> {
    if bit_depth == 0 || bit_depth % 8 != 0 || bit_depth > 64 {
        return Err(FormatError::UnsupportedBitDepth(bit_depth));
    }
    Ok(())
}

/// Largest positive sample value at `bit_depth`, used as the float scale.
fn full_scale(bit_depth: u16) -> f64 {
    ((1u64 << (bit_depth - 1)) - 1) as f64
}

/// Decode WAV bytes into the sample rate and de-interleaved channels.
pub fn decode(bytes: &[u8]) -> Result<(u32, AudioBuffer), TimePlotError> {
    let header = read_header(bytes)?;
    let bytes_per_sample = header.bytes_per_sample();
    let channel_count = usize::from(header.channels);
    let frame_len = bytes_per_sample * channel_count;
    let raw = &bytes[header.data_offset..header.data_offset + header.data_len];
    let scale = full_scale(header.bit_depth);

    let frames = raw.len() / frame_len;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in raw.chunks_exact(frame_len) {
        for (channel, sample) in channels.iter_mut().zip(frame.chunks_exact(bytes_per_sample)) {
            channel.push(read_sample(sample) as f64 / scale);
        }
    }

    debug!(
        "decoded {frames} frames, {} channel(s), {} Hz, {} bit",
        header.channels, header.sample_rate, header.bit_depth
    );

    Ok((header.sample_rate, AudioBuffer::from_channels(channels)?))
}

/// Read and decode a WAV file from disk.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(u32, AudioBuffer), TimePlotError> {
    decode(&fs::read(path)?)
}

/// Encode a buffer as a minimal PCM WAV file (`RIFF`, `fmt `, `data`).
pub fn encode(
    buffer: &AudioBuffer,
    bit_depth: u16,
    sample_rate: u32,
) -> Result<Vec<u8>, TimePlotError> {
    let mut bytes = Vec::new();
    write_wav(&mut bytes, buffer, bit_depth, sample_rate)?;
    Ok(bytes)
}

/// Stream the encoding of `buffer` into `w`.
///
/// The buffer is validated before anything is written: every sample must lie
/// in `[-1.0, 1.0]` and the data must fit in a 32-bit RIFF size field.
pub fn write_wav<W: Write>(
    w: &mut W,
    buffer: &AudioBuffer,
    bit_depth: u16,
    sample_rate: u32,
) -> Result<(), TimePlotError> {
    validate_bit_depth(bit_depth)?;
    let num_channels = u16::try_from(buffer.channel_count())
        .ok()
        .filter(|&count| count > 0)
        .ok_or_else(|| {
            TimePlotError::InvalidArgument(format!(
                "cannot encode {} channels",
                buffer.channel_count()
            ))
        })?;

    for (channel, samples) in buffer.channels().iter().enumerate() {
        if let Some((index, &value)) = samples
            .iter()
            .enumerate()
            .find(|(_, sample)| !(-1.0..=1.0).contains(*sample))
        {
            return Err(TimePlotError::SampleOutOfRange {
                channel,
                index,
                value,
            });
        }
    }

    let bytes_per_sample = usize::from(bit_depth / 8);
    let block_align = num_channels * (bit_depth / 8);
    let data_size = u32::try_from(buffer.frames() * usize::from(block_align))
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| {
            TimePlotError::InvalidArgument(String::from(
                "audio is too long for a WAV container",
            ))
        })?;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, num_channels, sample_rate, block_align, bit_depth)?;

    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    let scale = full_scale(bit_depth);
    let mut frame = Vec::with_capacity(usize::from(block_align));
    for index in 0..buffer.frames() {
        frame.clear();
        for channel in buffer.channels() {
            let value = (channel[index] * scale).round() as i64;
            frame.extend_from_slice(&value.to_le_bytes()[..bytes_per_sample]);
        }
        w.write_all(&frame)?;
    }
    Ok(())
}

fn write_riff_header<W: Write>(w: &mut W, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk<W: Write>(
    w: &mut W,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&FMT_CHUNK_LEN.to_le_bytes())?;
    w.write_all(&PCM_FORMAT.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    let byte_rate = u64::from(sample_rate) * u64::from(block_align);
    w.write_all(&(byte_rate as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

/// Encode `buffer` and write it without overwriting anything.
///
/// With a path, `name.wav` is tried first, then `name (1).wav`,
/// `name (2).wav` and so on; a trailing `.wav` on the given path is optional.
/// Without a path, `timeplot_output_<n>.wav` is created in the current
/// directory with the first unused `n`. Returns the path actually written.
pub fn save_wav(
    buffer: &AudioBuffer,
    path: Option<&Path>,
    bit_depth: u16,
    sample_rate: u32,
) -> Result<PathBuf, TimePlotError> {
    let bytes = encode(buffer, bit_depth, sample_rate)?;

    let saved = match path {
        Some(path) => {
            let base = if path.extension().is_some_and(|ext| ext == "wav") {
                path.with_extension("")
            } else {
                path.to_path_buf()
            };
            let stem = base
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    TimePlotError::InvalidArgument(format!(
                        "cannot derive a file name from '{}'",
                        path.display()
                    ))
                })?;
            create_first_unused(&bytes, (0usize..).map(|n| {
                if n == 0 {
                    base.with_file_name(format!("{stem}.wav"))
                } else {
                    base.with_file_name(format!("{stem} ({n}).wav"))
                }
            }))?
        }
        None => create_first_unused(
            &bytes,
            (0usize..).map(|n| PathBuf::from(format!("{GENERATED_NAME_PREFIX}{n}.wav"))),
        )?,
    };

    info!("saved {} bytes to '{}'", bytes.len(), saved.display());
    Ok(saved)
}

fn create_first_unused(
    bytes: &[u8],
    candidates: impl Iterator<Item = PathBuf>,
) -> Result<PathBuf, TimePlotError> {
    for candidate in candidates {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(bytes)?;
                return Ok(candidate);
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(TimePlotError::InvalidArgument(String::from(
        "no unused output file name is available",
    )))
}

/// Sign-extend a little-endian integer of 1 to 8 bytes.
fn read_sample(bytes: &[u8]) -> i64 {
    let mut wide = [0u8; 8];
    wide[..bytes.len()].copy_from_slice(bytes);
    let shift = 64 - 8 * bytes.len() as u32;
    (i64::from_le_bytes(wide) << shift) >> shift
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
