//! PWM output sinks
//!
//! A sink is the write-only end of the backlight: it accepts a duty-cycle
//! level and drives the panel. The controller owns the sink handle but never
//! reads back from it.

use crate::BacklightError;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink rejected level {level}: {reason}")]
    Rejected { level: u32, reason: String },
}

/// Duty-cycle output target
pub trait PwmSink: Send {
    /// Write one level to the hardware
    fn apply(&mut self, level: u32) -> Result<(), SinkError>;
}

impl<S: PwmSink + ?Sized> PwmSink for Box<S> {
    fn apply(&mut self, level: u32) -> Result<(), SinkError> {
        (**self).apply(level)
    }
}

/// Sink backed by a sysfs attribute (backlight `brightness` or a PWM
/// `duty_cycle` file)
#[derive(Debug)]
pub struct SysfsPwmSink {
    path: PathBuf,
}

impl SysfsPwmSink {
    /// Bind to an existing attribute file
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, BacklightError> {
        let path = path.into();
        if !path.is_file() {
            return Err(BacklightError::SinkUnavailable(path));
        }

        tracing::debug!("Bound PWM sink at {}", path.display());
        Ok(Self { path })
    }

    /// Bind to the `brightness` attribute of a backlight class device
    pub fn from_backlight_dir(dir: &Path) -> Result<Self, BacklightError> {
        Self::new(dir.join("brightness"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PwmSink for SysfsPwmSink {
    fn apply(&mut self, level: u32) -> Result<(), SinkError> {
        fs::write(&self.path, level.to_string())?;
        Ok(())
    }
}
