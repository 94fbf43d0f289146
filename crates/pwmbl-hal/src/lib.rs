//! PWM backlight control
//!
//! Converts abstract brightness intensities (0-255) from the display stack
//! into calibrated PWM duty-cycle levels, serializing writes across callers
//! and coordinating with suspend/resume.
//!
//! # Supported Panels
//!
//! - Samsung P4 / P4 WiFi / P4 LTE
//! - Samsung P5
//! - Any panel described by a TOML profile
//!
//! # Example
//!
//! ```no_run
//! use pwmbl_hal::{BacklightDevice, BacklightOps, BoardVariant, SysfsPwmSink};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let sink = SysfsPwmSink::from_backlight_dir(Path::new("/sys/class/backlight/pwm-backlight"))?;
//!     let mut device = BacklightDevice::probe("pwm-backlight", &BoardVariant::P4.profile(), sink)?;
//!
//!     device.update_status(200)?;
//!     println!("Brightness: {}", device.get_brightness());
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod curve;
pub mod device;
pub mod mock;
pub mod profile;
pub mod sink;

pub use controller::{IntensityController, PowerState};
pub use curve::{Breakpoint, CalibrationCurve};
pub use device::{
    BacklightDevice, BacklightError, BacklightOps, BacklightProperties, BacklightType,
    DRIVER_NAME, MeasurementHandle, OF_COMPATIBLE,
};
pub use profile::{BoardVariant, CurveProfile, PanelProfile};
pub use sink::{PwmSink, SinkError, SysfsPwmSink};

/// Backlight Result type
pub type Result<T> = std::result::Result<T, BacklightError>;
