//! The time-plotter transform.
//!
//! Each segment of the source is bound to one edge of a random walk. The
//! edge's horizontal extent sets the segment's playback speed (leftward edges
//! play in reverse) and its x position sets where the segment lands on the
//! output timeline. Optionally, segments whose edge wanders far from `y = 0`
//! are attenuated. The resampled segments are summed into a projection,
//! which is then normalized.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::normalize::normalize;
use crate::progress::{status, ProgressEvent, ProgressReporter};
use crate::resample::resample;
use crate::settings::RenderSettings;
use crate::split::{split_by_count, split_by_measure, Split};
use crate::walk::WalkPoint;
use crate::{AudioBuffer, TimePlotError};

/// Where and how fast one segment plays in the projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Playback rate; negative plays the segment backwards.
    pub speed: f64,
    /// First projection frame the segment is written to.
    pub offset: usize,
}

/// Derive a segment's placement from its walk edge.
///
/// `from` and `to` must already be shifted so the walk's minimum x is zero.
/// A vertical edge gets a speed of three times the segment length, which
/// resamples the segment to nothing.
pub fn place_segment(
    index: usize,
    segment_frames: usize,
    from: WalkPoint,
    to: WalkPoint,
    frames_per_segment: f64,
) -> Result<Placement, TimePlotError> {
    let dx = to.x - from.x;
    let speed = if dx == 0.0 {
        3.0 * segment_frames.max(1) as f64
    } else {
        1.0 / dx
    };

    let anchor = if speed > 0.0 {
        from.x
    } else if speed < 0.0 {
        to.x
    } else {
        return Err(TimePlotError::ZeroSpeed { segment: index });
    };

    Ok(Placement {
        speed,
        offset: (frames_per_segment * anchor) as usize,
    })
}

/// Per-frame gain for a segment rendered to `frames` frames.
///
/// The edge is traversed from its lower-x end to its higher-x end and the
/// gain at height `y` is `1 / (|y| + 1)^exponent`.
pub fn volume_curve(from: WalkPoint, to: WalkPoint, frames: usize, exponent: f64) -> Vec<f64> {
    let (start, end) = if from.x < to.x {
        (from.y, to.y)
    } else {
        (to.y, from.y)
    };

    (0..frames)
        .map(|index| {
            let y = start + (end - start) * (index as f64 / frames as f64);
            1.0 / (y.abs() + 1.0).powf(exponent)
        })
        .collect()
}

/// Renders buffers according to a fixed set of [`RenderSettings`].
#[derive(Clone, Copy, Debug)]
pub struct Renderer<'a> {
    settings: &'a RenderSettings,
    pool: Option<&'a ThreadPool>,
}

impl<'a> Renderer<'a> {
    pub fn new(settings: &'a RenderSettings) -> Self {
        Self {
            settings,
            pool: None,
        }
    }

    /// Resample segments on `pool` instead of the global rayon pool.
    pub fn with_pool(mut self, pool: &'a ThreadPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Render with a walk seeded from the settings, or from entropy.
    pub fn render(
        &self,
        audio: AudioBuffer,
        progress: &mut dyn ProgressReporter,
    ) -> Result<AudioBuffer, TimePlotError> {
        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.render_with(audio, &mut rng, progress)
    }

    /// Render drawing the random walk from `rng`.
    pub fn render_with<R: Rng + ?Sized>(
        &self,
        audio: AudioBuffer,
        rng: &mut R,
        progress: &mut dyn ProgressReporter,
    ) -> Result<AudioBuffer, TimePlotError> {
        let settings = self.settings;
        settings.validate()?;
        let job_id = settings.job_id.as_str();
        let channel_count = audio.channel_count();

        status(progress, job_id, "splitting audio...");
        let Split {
            segments,
            mut walk,
            source_frames,
        } = if settings.split_by_measure {
            split_by_measure(
                audio,
                settings.sample_rate,
                settings.tempo,
                settings.beats_per_measure,
                settings.angle_multiplier,
                rng,
            )?
        } else {
            split_by_count(&audio, settings.segment_count, settings.angle_multiplier, rng)?
        };

        let x_offset = walk.anchor_left();
        let frames_per_segment = source_frames as f64 / segments.len() as f64;
        let projection_frames = (walk.max_x() * frames_per_segment) as usize;
        debug!(
            "{} segments of {frames_per_segment:.1} frames project onto {projection_frames} frames",
            segments.len()
        );

        let edges: Vec<(WalkPoint, WalkPoint)> = walk.edges().collect();
        let placements = segments
            .iter()
            .zip(&edges)
            .enumerate()
            .map(|(index, (segment, &(from, to)))| {
                place_segment(index, segment.frames(), from, to, frames_per_segment)
            })
            .collect::<Result<Vec<_>, _>>()?;

        status(progress, job_id, "creating base output audio...");
        let mut projection = AudioBuffer::silent(channel_count, projection_frames);

        let rendered = self.resample_segments(&segments, &edges, &placements)?;

        if settings.display_plot {
            status(progress, job_id, "starting plot display...");
        }
        status(progress, job_id, "writing projected audio...");
        for (index, (segment, placement)) in rendered.iter().zip(&placements).enumerate() {
            if settings.display_plot {
                let (from, to) = edges[index];
                progress.report(ProgressEvent::WalkEdge {
                    index,
                    from: WalkPoint::new(from.x - x_offset, from.y),
                    to: WalkPoint::new(to.x - x_offset, to.y),
                });
            }

            let dropped = accumulate(&mut projection, segment, placement.offset);
            if dropped > 0 {
                warn!(
                    "segment {index}: {dropped} frame(s) past the end of the projection were dropped"
                );
            }
        }

        status(progress, job_id, "normalizing...");
        Ok(normalize(projection, 1.0))
    }

    fn resample_segments(
        &self,
        segments: &[AudioBuffer],
        edges: &[(WalkPoint, WalkPoint)],
        placements: &[Placement],
    ) -> Result<Vec<AudioBuffer>, TimePlotError> {
        let falloff = self.settings.falloff_exponent;
        let work = || {
            segments
                .par_iter()
                .zip(edges.par_iter())
                .zip(placements.par_iter())
                .map(|((segment, &(from, to)), placement)| {
                    let mut out = resample(segment, placement.speed)?;
                    if falloff != 0.0 {
                        let gains = volume_curve(from, to, out.frames(), falloff);
                        for channel in out.channels_mut() {
                            for (sample, gain) in channel.iter_mut().zip(&gains) {
                                *sample *= gain;
                            }
                        }
                    }
                    Ok(out)
                })
                .collect::<Result<Vec<_>, TimePlotError>>()
        };

        match self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}

/// Render `audio` with `settings` on the global rayon pool.
pub fn render(
    audio: AudioBuffer,
    settings: &RenderSettings,
    progress: &mut dyn ProgressReporter,
) -> Result<AudioBuffer, TimePlotError> {
    Renderer::new(settings).render(audio, progress)
}

/// Add `segment` into `projection` starting at `offset`. Returns the number
/// of frames that fell past the end of the projection.
fn accumulate(projection: &mut AudioBuffer, segment: &AudioBuffer, offset: usize) -> usize {
    let writable = projection
        .frames()
        .saturating_sub(offset)
        .min(segment.frames());

    let start = offset.min(projection.frames());
    for (target, source) in projection.channels_mut().iter_mut().zip(segment.channels()) {
        for (slot, sample) in target[start..]
            .iter_mut()
            .zip(&source[..writable])
        {
            *slot += sample;
        }
    }

    segment.frames() - writable
}
