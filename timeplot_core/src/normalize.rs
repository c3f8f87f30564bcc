use log::warn;

use crate::AudioBuffer;

/// Scale `buffer` so its loudest sample has magnitude `ceiling`.
///
/// `ceiling` must lie in `(0, 1]`; anything else is replaced by `1.0`.
/// A silent buffer is returned unchanged.
pub fn normalize(mut buffer: AudioBuffer, ceiling: f64) -> AudioBuffer {
    let ceiling = if ceiling > 0.0 && ceiling <= 1.0 {
        ceiling
    } else {
        warn!("normalization ceiling {ceiling} is outside (0, 1]; using 1.0");
        1.0
    };

    let peak = buffer.peak();
    if peak == 0.0 {
        return buffer;
    }

    // Dividing first keeps every |sample| / peak within 1.0 exactly.
    for channel in buffer.channels_mut() {
        for sample in channel.iter_mut() {
            *sample = *sample / peak * ceiling;
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_matches_ceiling() {
        let buffer = AudioBuffer::from_channels(vec![vec![0.1, -0.4, 0.2], vec![0.3, 0.0, -0.1]])
            .unwrap();
        for ceiling in [1.0, 0.5, 0.01] {
            let out = normalize(buffer.clone(), ceiling);
            assert!((out.peak() - ceiling).abs() < 1e-12);
            assert!((out.channel(0).unwrap()[1] + ceiling).abs() < 1e-12);
        }
    }

    #[test]
    fn boosts_loud_projection_into_range() {
        let buffer = AudioBuffer::from_channels(vec![vec![3.7, -1.2, 0.0]]).unwrap();
        let out = normalize(buffer, 1.0);
        assert_eq!(out.channel(0).unwrap()[0], 1.0);
        assert!(out.channels()[0].iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn silent_buffer_is_unchanged() {
        let buffer = AudioBuffer::silent(2, 16);
        assert_eq!(normalize(buffer.clone(), 1.0), buffer);
    }

    #[test]
    fn out_of_range_ceiling_falls_back_to_unity() {
        let buffer = AudioBuffer::from_channels(vec![vec![0.25, -0.5]]).unwrap();
        for ceiling in [0.0, -0.3, 1.5, f64::NAN] {
            let out = normalize(buffer.clone(), ceiling);
            assert_eq!(out.peak(), 1.0);
        }
    }
}
