//! Panel profiles
//!
//! Each board ships a panel with its own calibration. Built-in variants cover
//! the boards this driver was tuned on; other panels load a TOML profile.

use crate::curve::{Breakpoint, CalibrationCurve};
use crate::BacklightError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Calibration knots of a panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveProfile {
    /// Level for intensities between zero and the dim threshold
    #[serde(default)]
    pub dark_level: u32,
    pub dim: Breakpoint,
    pub low: Breakpoint,
    pub mid: Breakpoint,
    pub max: Breakpoint,
}

/// Backlight configuration for one panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelProfile {
    pub name: String,
    #[serde(default = "default_max_intensity")]
    pub max_intensity: u32,
    #[serde(default = "default_intensity")]
    pub default_intensity: u32,
    /// Highest level the PWM accepts
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    pub curve: CurveProfile,
}

fn default_max_intensity() -> u32 {
    255
}

fn default_intensity() -> u32 {
    150
}

fn default_max_level() -> u32 {
    1600
}

impl PanelProfile {
    /// Load a profile from a TOML file
    pub fn load(path: &Path) -> Result<Self, BacklightError> {
        let contents = fs::read_to_string(path)?;
        let profile: Self = toml::from_str(&contents)?;
        profile.validate()?;
        tracing::debug!("Loaded panel profile {} from {}", profile.name, path.display());
        Ok(profile)
    }

    /// Check the profile and build its curve
    pub fn validate(&self) -> Result<CalibrationCurve, BacklightError> {
        if self.curve.max.intensity != self.max_intensity {
            return Err(BacklightError::InvalidProfile(format!(
                "{}: curve ends at intensity {} but maximum is {}",
                self.name, self.curve.max.intensity, self.max_intensity
            )));
        }
        if self.default_intensity > self.max_intensity {
            return Err(BacklightError::InvalidProfile(format!(
                "{}: default intensity {} above maximum {}",
                self.name, self.default_intensity, self.max_intensity
            )));
        }
        if self.curve.max.level > self.max_level {
            return Err(BacklightError::InvalidProfile(format!(
                "{}: curve level {} above PWM maximum {}",
                self.name, self.curve.max.level, self.max_level
            )));
        }

        self.calibration_curve()
    }

    pub fn calibration_curve(&self) -> Result<CalibrationCurve, BacklightError> {
        CalibrationCurve::new(
            self.curve.dim,
            self.curve.low,
            self.curve.mid,
            self.curve.max,
            self.curve.dark_level,
        )
    }
}

/// Boards with built-in calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardVariant {
    P4,
    P4Wifi,
    P4Lte,
    P5,
}

impl BoardVariant {
    /// Parse from a board name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "p4" => Some(BoardVariant::P4),
            "p4wifi" => Some(BoardVariant::P4Wifi),
            "p4lte" => Some(BoardVariant::P4Lte),
            "p5" => Some(BoardVariant::P5),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoardVariant::P4 => "p4",
            BoardVariant::P4Wifi => "p4wifi",
            BoardVariant::P4Lte => "p4lte",
            BoardVariant::P5 => "p5",
        }
    }

    pub fn all() -> &'static [BoardVariant] {
        &[
            BoardVariant::P4,
            BoardVariant::P4Wifi,
            BoardVariant::P4Lte,
            BoardVariant::P5,
        ]
    }

    /// Get the panel profile for this board
    pub fn profile(self) -> PanelProfile {
        let curve = match self {
            // The P4 family shares one panel
            BoardVariant::P4 | BoardVariant::P4Wifi | BoardVariant::P4Lte => CurveProfile {
                dark_level: 0,
                dim: Breakpoint::new(15, 50),
                low: Breakpoint::new(50, 90),
                mid: Breakpoint::new(150, 784),
                max: Breakpoint::new(255, 1600),
            },
            // 784 is 32%, about 125 nits
            BoardVariant::P5 => CurveProfile {
                dark_level: 60,
                dim: Breakpoint::new(20, 60),
                low: Breakpoint::new(30, 60),
                mid: Breakpoint::new(150, 784),
                max: Breakpoint::new(255, 1600),
            },
        };

        PanelProfile {
            name: self.as_str().into(),
            max_intensity: 255,
            default_intensity: 150,
            max_level: 1600,
            curve,
        }
    }
}
