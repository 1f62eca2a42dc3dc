use crate::error::{PetError, PetResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Baby,
    Child,
    Teen,
    Adult,
    Senior,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Baby,
        Stage::Child,
        Stage::Teen,
        Stage::Adult,
        Stage::Senior,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Baby => "baby",
            Stage::Child => "child",
            Stage::Teen => "teen",
            Stage::Adult => "adult",
            Stage::Senior => "senior",
        }
    }

    /// Texture names making up this stage's idle frames, first frame is the resting one.
    pub fn texture_names(self) -> &'static [&'static str] {
        match self {
            Stage::Baby => &["baby"],
            Stage::Child => &["child", "child-2"],
            Stage::Teen => &["teen"],
            Stage::Adult => &["adult"],
            Stage::Senior => &["senior"],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = PetError;

    fn from_str(s: &str) -> PetResult<Self> {
        Stage::ALL
            .iter()
            .copied()
            .find(|st| st.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PetError::InvalidStage(s.to_string()))
    }
}

/// Age thresholds at which the pet enters Child, Teen, Adult and Senior.
///
/// Ranges are half-open: `[0, t1)` is Baby, `[t1, t2)` Child and so on, with
/// Senior open-ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageTable {
    thresholds: [f64; 4],
}

impl StageTable {
    pub fn new(thresholds: [f64; 4]) -> PetResult<Self> {
        if thresholds.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return Err(PetError::InvalidConfig(format!(
                "stage thresholds must be positive and finite, got {thresholds:?}"
            )));
        }
        if thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PetError::InvalidConfig(format!(
                "stage thresholds must be strictly increasing, got {thresholds:?}"
            )));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> [f64; 4] {
        self.thresholds
    }

    pub fn stage_for(&self, age: f64) -> Stage {
        // NaN compares false everywhere and lands on Baby.
        let passed = self.thresholds.iter().filter(|t| age >= **t).count();
        Stage::ALL[passed]
    }

    /// Age at which `stage` begins.
    pub fn start_of(&self, stage: Stage) -> f64 {
        match stage {
            Stage::Baby => 0.0,
            Stage::Child => self.thresholds[0],
            Stage::Teen => self.thresholds[1],
            Stage::Adult => self.thresholds[2],
            Stage::Senior => self.thresholds[3],
        }
    }
}

impl Default for StageTable {
    fn default() -> Self {
        Self {
            thresholds: [2.0, 5.0, 10.0, 15.0],
        }
    }
}
