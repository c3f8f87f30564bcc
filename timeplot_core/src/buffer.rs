use std::ops::Range;

use crate::TimePlotError;

/// Multi-channel block of floating point samples.
///
/// Every channel holds the same number of samples. Samples nominally lie in
/// `[-1.0, 1.0]`, although intermediate buffers (an accumulated projection,
/// for example) may exceed that range until they are normalized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f64>>,
}

impl AudioBuffer {
    /// Build a buffer from per-channel sample vectors.
    ///
    /// Returns [`TimePlotError::ChannelLength`] when the channels disagree in
    /// length.
    pub fn from_channels(channels: Vec<Vec<f64>>) -> Result<Self, TimePlotError> {
        if let Some(first) = channels.first() {
            let expected = first.len();
            if let Some((channel, found)) = channels
                .iter()
                .map(Vec::len)
                .enumerate()
                .find(|&(_, len)| len != expected)
            {
                return Err(TimePlotError::ChannelLength {
                    channel,
                    expected,
                    found,
                });
            }
        }

        Ok(Self { channels })
    }

    /// A buffer of `frames` zero samples on each of `channel_count` channels.
    pub fn silent(channel_count: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channel_count],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }

    /// Copy the contiguous frame range out of every channel.
    pub fn slice(&self, range: Range<usize>) -> Result<Self, TimePlotError> {
        let frames = self.frames();
        if range.start > range.end || range.end > frames {
            return Err(TimePlotError::InvalidArgument(format!(
                "frame range {}..{} is outside a buffer of {frames} frames",
                range.start, range.end
            )));
        }

        Self::from_channels(
            self.channels
                .iter()
                .map(|channel| channel[range.clone()].to_vec())
                .collect(),
        )
    }

    /// Append `frames` zero samples to every channel.
    pub fn pad_end(&mut self, frames: usize) {
        for channel in &mut self.channels {
            channel.resize(channel.len() + frames, 0.0);
        }
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f64 {
        self.channels
            .iter()
            .flatten()
            .fold(0.0_f64, |peak, sample| peak.max(sample.abs()))
    }

    pub(crate) fn channels_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.channels
    }
}
