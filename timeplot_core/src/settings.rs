use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::TimePlotError;

/// Parameters for one render, fixed before the render starts.
///
/// Settings files are JSON objects using the field names below; the older
/// `walk_length`, `falloff_power` and `theta_multiplier` keys are accepted
/// as aliases. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Split into one segment per measure instead of a fixed count.
    pub split_by_measure: bool,
    #[serde(alias = "walk_length")]
    pub segment_count: usize,
    pub sample_rate: u32,
    /// Beats per minute, used by measure splitting.
    pub tempo: f64,
    pub beats_per_measure: f64,
    /// Scales the range of step directions; `0` walks in a straight line.
    #[serde(alias = "theta_multiplier")]
    pub angle_multiplier: f64,
    /// `0` disables distance-based attenuation.
    #[serde(alias = "falloff_power")]
    pub falloff_exponent: f64,
    /// Emit walk edges to the progress reporter as they are rendered.
    pub display_plot: bool,
    pub job_id: String,
    /// Fixed seed for the random walk; entropy seeded when absent.
    pub seed: Option<u64>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            split_by_measure: false,
            segment_count: 8,
            sample_rate: 44_100,
            tempo: 120.0,
            beats_per_measure: 4.0,
            angle_multiplier: 1.0,
            falloff_exponent: 0.0,
            display_plot: false,
            job_id: String::from("default"),
            seed: None,
        }
    }
}

impl RenderSettings {
    pub fn builder() -> RenderSettingsBuilder {
        RenderSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Load settings from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TimePlotError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TimePlotError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Start a builder from these settings.
    pub fn to_builder(&self) -> RenderSettingsBuilder {
        RenderSettingsBuilder {
            settings: self.clone(),
        }
    }

    /// Check the values a render cannot proceed without.
    pub fn validate(&self) -> Result<(), TimePlotError> {
        if self.split_by_measure {
            if !(self.tempo.is_finite() && self.tempo > 0.0) {
                return Err(TimePlotError::InvalidArgument(format!(
                    "tempo must be positive, got {}",
                    self.tempo
                )));
            }
            if !(self.beats_per_measure.is_finite() && self.beats_per_measure > 0.0) {
                return Err(TimePlotError::InvalidArgument(format!(
                    "beats per measure must be positive, got {}",
                    self.beats_per_measure
                )));
            }
        } else if self.segment_count == 0 {
            return Err(TimePlotError::InvalidSegmentCount(0));
        }

        if self.sample_rate == 0 {
            return Err(TimePlotError::InvalidArgument(String::from(
                "sample rate must be non-zero",
            )));
        }
        if !self.angle_multiplier.is_finite() || !self.falloff_exponent.is_finite() {
            return Err(TimePlotError::InvalidArgument(String::from(
                "angle multiplier and falloff exponent must be finite",
            )));
        }
        Ok(())
    }
}

/// Builder for [`RenderSettings`].
#[derive(Clone, Debug)]
pub struct RenderSettingsBuilder {
    settings: RenderSettings,
}

impl RenderSettingsBuilder {
    pub fn segment_count(mut self, count: usize) -> Self {
        self.settings.split_by_measure = false;
        self.settings.segment_count = count;
        self
    }

    /// Split by measure at `tempo` BPM with `beats_per_measure` beats.
    pub fn by_measure(mut self, tempo: f64, beats_per_measure: f64) -> Self {
        self.settings.split_by_measure = true;
        self.settings.tempo = tempo;
        self.settings.beats_per_measure = beats_per_measure;
        self
    }

    pub fn split_by_measure(mut self, enabled: bool) -> Self {
        self.settings.split_by_measure = enabled;
        self
    }

    pub fn tempo(mut self, tempo: f64) -> Self {
        self.settings.tempo = tempo;
        self
    }

    pub fn beats_per_measure(mut self, beats: f64) -> Self {
        self.settings.beats_per_measure = beats;
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.settings.sample_rate = sample_rate;
        self
    }

    pub fn angle_multiplier(mut self, multiplier: f64) -> Self {
        self.settings.angle_multiplier = multiplier;
        self
    }

    pub fn falloff_exponent(mut self, exponent: f64) -> Self {
        self.settings.falloff_exponent = exponent;
        self
    }

    pub fn display_plot(mut self, display: bool) -> Self {
        self.settings.display_plot = display;
        self
    }

    pub fn job_id<S: Into<String>>(mut self, job_id: S) -> Self {
        self.settings.job_id = job_id.into();
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.settings.seed = seed;
        self
    }

    pub fn build(self) -> Result<RenderSettings, TimePlotError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.segment_count, 8);
        assert_eq!(settings.job_id, "default");
    }

    #[test]
    fn parses_legacy_keys() {
        let settings = RenderSettings::from_json_str(
            r#"{
                "split_by_measure": false,
                "walk_length": 12,
                "falloff_power": 1.5,
                "theta_multiplier": 0.25,
                "display_plot": true
            }"#,
        )
        .unwrap();
        assert_eq!(settings.segment_count, 12);
        assert_eq!(settings.falloff_exponent, 1.5);
        assert_eq!(settings.angle_multiplier, 0.25);
        assert!(settings.display_plot);
        assert_eq!(settings.tempo, 120.0);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            RenderSettings::from_json_str("{ not json"),
            Err(TimePlotError::Settings(_))
        ));
    }

    #[test]
    fn builder_validates() {
        assert!(matches!(
            RenderSettings::builder().segment_count(0).build(),
            Err(TimePlotError::InvalidSegmentCount(0))
        ));
        assert!(RenderSettings::builder().by_measure(0.0, 4.0).build().is_err());

        let settings = RenderSettings::builder()
            .by_measure(90.0, 3.0)
            .job_id("waltz")
            .seed(Some(9))
            .build()
            .unwrap();
        assert!(settings.split_by_measure);
        assert_eq!(settings.beats_per_measure, 3.0);
        assert_eq!(settings.seed, Some(9));
        assert_eq!(settings.to_builder().build().unwrap(), settings);
    }
}
