use crate::{AudioBuffer, TimePlotError};

/// Longest output a single resample may produce.
const MAX_OUTPUT_FRAMES: f64 = u32::MAX as f64;

/// Play `buffer` back at `speed` times its original rate.
///
/// The output holds `floor(frames / |speed|)` frames, each read from the
/// source at `i · |speed|` with linear interpolation between neighbouring
/// samples. A negative speed reverses the result.
pub fn resample(buffer: &AudioBuffer, speed: f64) -> Result<AudioBuffer, TimePlotError> {
    if speed == 0.0 || speed.is_nan() {
        return Err(TimePlotError::InvalidSpeed(speed));
    }

    let step = speed.abs();
    let frames = buffer.frames() as f64 / step;
    if !frames.is_finite() || frames > MAX_OUTPUT_FRAMES {
        return Err(TimePlotError::InvalidArgument(format!(
            "speed {speed} would stretch {} frames past {MAX_OUTPUT_FRAMES} frames",
            buffer.frames()
        )));
    }
    let frames = frames as usize;

    let channels = buffer
        .channels()
        .iter()
        .map(|source| {
            let mut out: Vec<f64> = (0..frames)
                .map(|index| value_at(source, index as f64 * step))
                .collect();
            if speed < 0.0 {
                out.reverse();
            }
            out
        })
        .collect();

    AudioBuffer::from_channels(channels)
}

/// Linearly interpolated sample at a fractional `position`.
fn value_at(samples: &[f64], position: f64) -> f64 {
    let last = samples.len() - 1;
    if last == 0 {
        return samples[0];
    }

    let lo = (position.floor() as usize).min(last);
    let hi = (position.ceil() as usize).min(last);
    let fraction = position - position.floor();
    samples[lo] + fraction * (samples[hi] - samples[lo])
}
