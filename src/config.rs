use crate::clock::AgeScale;
use crate::error::{PetError, PetResult};
use crate::stage::StageTable;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

impl Size {
    pub fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }
}

/// Position relative to the container centre, y pointing up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiltConfig {
    pub sensitivity: f32,
    pub dampening: f32,
    pub edge_margin: f32,
    pub smoothing_secs: f32,
    pub max_roll: f32,
    pub sample_interval_ms: u64,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            sensitivity: 100.0,
            dampening: 0.8,
            edge_margin: 10.0,
            smoothing_secs: 0.2,
            max_roll: 0.3,
            sample_interval_ms: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetConfig {
    pub seconds_per_unit: f64,
    pub stage_thresholds: [f64; 4],
    pub death_age: f64,
    pub sprite_size: Size,
    /// Gap between the bottom of the container and the sprite's feet.
    pub ground_margin: f32,
    pub tilt: TiltConfig,
    pub rebirth_wiggle_delay_secs: f32,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            seconds_per_unit: 60.0,
            stage_thresholds: [2.0, 5.0, 10.0, 15.0],
            death_age: 6.0,
            sprite_size: Size::new(80.0, 80.0),
            ground_margin: 12.5,
            tilt: TiltConfig::default(),
            rebirth_wiggle_delay_secs: 0.5,
        }
    }
}

impl PetConfig {
    pub fn validate(&self) -> PetResult<()> {
        if !self.seconds_per_unit.is_finite() || self.seconds_per_unit <= 0.0 {
            return Err(PetError::InvalidConfig(format!(
                "seconds_per_unit must be positive, got {}",
                self.seconds_per_unit
            )));
        }
        if !self.death_age.is_finite() || self.death_age <= 0.0 {
            return Err(PetError::InvalidConfig(format!(
                "death_age must be positive, got {}",
                self.death_age
            )));
        }
        if self.tilt.smoothing_secs < 0.0 {
            return Err(PetError::InvalidConfig(
                "tilt.smoothing_secs must not be negative".to_string(),
            ));
        }
        StageTable::new(self.stage_thresholds)?;
        Ok(())
    }

    pub fn stage_table(&self) -> PetResult<StageTable> {
        StageTable::new(self.stage_thresholds)
    }

    pub fn age_scale(&self) -> AgeScale {
        AgeScale::new(self.seconds_per_unit)
    }
}
