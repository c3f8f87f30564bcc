use log::debug;
use rand::Rng;

use crate::walk::RandomWalk;
use crate::{AudioBuffer, TimePlotError};

/// Segments cut from a source buffer, paired with the walk whose edges place
/// them.
#[derive(Clone, Debug)]
pub struct Split {
    pub segments: Vec<AudioBuffer>,
    /// One more point than there are segments; edge `i` belongs to segment `i`.
    pub walk: RandomWalk,
    /// Length of the source in frames, after any measure padding.
    pub source_frames: usize,
}

/// Cut `buffer` into `segment_count` equal slices and generate a walk with
/// one step per slice.
///
/// Slice boundaries are computed in floating point and truncated, so up to
/// one frame per boundary is lost when the length is not a multiple of the
/// count.
pub fn split_by_count<R: Rng + ?Sized>(
    buffer: &AudioBuffer,
    segment_count: usize,
    angle_multiplier: f64,
    rng: &mut R,
) -> Result<Split, TimePlotError> {
    if segment_count == 0 {
        return Err(TimePlotError::InvalidSegmentCount(segment_count));
    }

    let frames_per_segment = buffer.frames() as f64 / segment_count as f64;
    let segments = (0..segment_count)
        .map(|index| {
            let start = (index as f64 * frames_per_segment) as usize;
            let end = ((index + 1) as f64 * frames_per_segment) as usize;
            buffer.slice(start..end.min(buffer.frames()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "split {} frames into {segment_count} segments of ~{frames_per_segment:.1} frames",
        buffer.frames()
    );

    Ok(Split {
        segments,
        walk: RandomWalk::generate_with(segment_count, angle_multiplier, rng),
        source_frames: buffer.frames(),
    })
}

/// Length of one measure in (fractional) frames.
pub fn frames_per_measure(sample_rate: u32, tempo: f64, beats_per_measure: f64) -> f64 {
    f64::from(sample_rate) * beats_per_measure * 60.0 / tempo
}

/// Pad `buffer` with silence and split it into one segment per measure.
///
/// The pad is `frames mod frames_per_measure`, which is what earlier
/// renders used; it does not always complete the final measure, in which
/// case the trailing partial measure is dropped by the count split.
pub fn split_by_measure<R: Rng + ?Sized>(
    mut buffer: AudioBuffer,
    sample_rate: u32,
    tempo: f64,
    beats_per_measure: f64,
    angle_multiplier: f64,
    rng: &mut R,
) -> Result<Split, TimePlotError> {
    if !(tempo.is_finite() && tempo > 0.0) {
        return Err(TimePlotError::InvalidArgument(format!(
            "tempo must be a positive number of beats per minute, got {tempo}"
        )));
    }
    if !(beats_per_measure.is_finite() && beats_per_measure > 0.0) {
        return Err(TimePlotError::InvalidArgument(format!(
            "beats per measure must be positive, got {beats_per_measure}"
        )));
    }
    if sample_rate == 0 {
        return Err(TimePlotError::InvalidArgument(String::from(
            "sample rate must be non-zero",
        )));
    }

    let measure = frames_per_measure(sample_rate, tempo, beats_per_measure);
    let pad = (buffer.frames() as f64 % measure) as usize;
    buffer.pad_end(pad);

    let measures = (buffer.frames() as f64 / measure) as usize;
    debug!(
        "padded {pad} frames; {measures} measure(s) of {measure:.1} frames at {tempo} BPM"
    );

    split_by_count(&buffer, measures, angle_multiplier, rng)
}
