//! Backlight device registration
//!
//! Glue between the host display framework and the intensity controller.
//! The host probes the device with a panel profile and a bound sink, then
//! drives it through [`BacklightOps`] on brightness changes and power
//! transitions.

use crate::controller::{IntensityController, PowerState};
use crate::profile::PanelProfile;
use crate::sink::{PwmSink, SinkError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Platform driver name
pub const DRIVER_NAME: &str = "cmc623_pwm_bl";

/// Device tree compatible string
pub const OF_COMPATIBLE: &str = "samsung,cmc623-pwm";

#[derive(Debug, Error)]
pub enum BacklightError {
    #[error("Invalid calibration curve: {0}")]
    InvalidCurve(String),

    #[error("Invalid panel profile: {0}")]
    InvalidProfile(String),

    #[error("PWM sink not available at {0}")]
    SinkUnavailable(PathBuf),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Backlight state lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Operations the host framework invokes on a backlight
pub trait BacklightOps {
    /// Apply a new brightness request
    fn update_status(&mut self, brightness: i64) -> Result<(), BacklightError>;

    /// Report the current brightness
    fn get_brightness(&self) -> u32;

    fn suspend(&mut self) -> Result<(), BacklightError>;

    fn resume(&mut self) -> Result<(), BacklightError>;
}

/// How the brightness scale relates to hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklightType {
    /// Values map to a hardware register
    Raw,
}

/// Host-visible backlight properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklightProperties {
    pub kind: BacklightType,
    /// Last requested brightness
    pub brightness: u32,
    pub max_brightness: u32,
}

/// Registered backlight device
pub struct BacklightDevice<S: PwmSink> {
    name: String,
    props: BacklightProperties,
    controller: Arc<IntensityController<S>>,
}

impl<S: PwmSink> BacklightDevice<S> {
    /// Validate the profile, attach the controller, and register the device
    pub fn probe(
        name: impl Into<String>,
        profile: &PanelProfile,
        sink: S,
    ) -> Result<Self, BacklightError> {
        let name = name.into();
        tracing::info!("{} probe start (panel {})", name, profile.name);

        let curve = profile.validate()?;
        let controller = IntensityController::attach(
            curve,
            profile.default_intensity,
            profile.max_level,
            sink,
        )?;

        let device = Self {
            name,
            props: BacklightProperties {
                kind: BacklightType::Raw,
                brightness: profile.default_intensity,
                max_brightness: profile.max_intensity,
            },
            controller: Arc::new(controller),
        };

        tracing::info!("{} backlight driver is enabled", device.name);
        Ok(device)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &BacklightProperties {
        &self.props
    }

    pub fn controller(&self) -> &IntensityController<S> {
        &self.controller
    }

    pub fn power_state(&self) -> Result<PowerState, BacklightError> {
        self.controller.power_state()
    }

    /// Handle for luminance measurement tooling
    pub fn measurement_handle(&self) -> MeasurementHandle<S> {
        MeasurementHandle {
            controller: Arc::clone(&self.controller),
        }
    }

    /// Turn the backlight off and unregister
    pub fn remove(mut self) -> Result<(), BacklightError> {
        tracing::info!("{} remove", self.name);
        self.props.brightness = 0;
        self.controller.set(0)?;
        Ok(())
    }
}

impl<S: PwmSink> BacklightOps for BacklightDevice<S> {
    fn update_status(&mut self, brightness: i64) -> Result<(), BacklightError> {
        tracing::debug!("{}: update_status brightness={}", self.name, brightness);
        self.props.brightness = self.controller.curve().clamp_intensity(brightness);
        self.controller.set(brightness)?;
        Ok(())
    }

    fn get_brightness(&self) -> u32 {
        self.controller.get()
    }

    fn suspend(&mut self) -> Result<(), BacklightError> {
        tracing::info!("{}: suspend", self.name);
        self.controller.suspend()
    }

    fn resume(&mut self) -> Result<(), BacklightError> {
        tracing::info!("{}: resume", self.name);
        if self.controller.power_state()? == PowerState::Suspended {
            self.props.brightness = self.controller.default_intensity();
        }
        self.controller.resume()
    }
}

/// Cloneable raw-level entry point sharing the device's lock
pub struct MeasurementHandle<S: PwmSink> {
    controller: Arc<IntensityController<S>>,
}

impl<S: PwmSink> Clone for MeasurementHandle<S> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<S: PwmSink> MeasurementHandle<S> {
    /// Write a level directly, bypassing calibration
    pub fn raw_apply(&self, level: i64) -> Result<(), BacklightError> {
        self.controller.raw_apply(level)
    }

    pub fn current_level(&self) -> u32 {
        self.controller.current_level()
    }
}
