//! Intensity controller
//!
//! Owns the applied backlight state and serializes every write to the sink.
//! Readers get the last published intensity through an atomic load and never
//! contend with writers.

use crate::curve::CalibrationCurve;
use crate::sink::PwmSink;
use crate::BacklightError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Power state of the backlight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Active,
    Suspended,
}

struct Inner<S> {
    sink: S,
    power: PowerState,
}

/// Serialized brightness state machine
///
/// `current_intensity` and `current_level` are only stored while the inner
/// lock is held, right after the sink accepted the level.
pub struct IntensityController<S: PwmSink> {
    curve: CalibrationCurve,
    default_intensity: u32,
    max_level: u32,
    inner: Mutex<Inner<S>>,
    current_intensity: AtomicU32,
    current_level: AtomicU32,
}

impl<S: PwmSink> IntensityController<S> {
    /// Take ownership of the sink and apply the default intensity
    pub fn attach(
        curve: CalibrationCurve,
        default_intensity: u32,
        max_level: u32,
        sink: S,
    ) -> Result<Self, BacklightError> {
        if default_intensity > curve.max_intensity() {
            return Err(BacklightError::InvalidProfile(format!(
                "default intensity {} above maximum {}",
                default_intensity,
                curve.max_intensity()
            )));
        }
        if curve.max_level() > max_level {
            return Err(BacklightError::InvalidProfile(format!(
                "curve reaches level {} but hardware maximum is {}",
                curve.max_level(),
                max_level
            )));
        }

        let controller = Self {
            curve,
            default_intensity,
            max_level,
            inner: Mutex::new(Inner {
                sink,
                power: PowerState::Active,
            }),
            current_intensity: AtomicU32::new(0),
            current_level: AtomicU32::new(0),
        };

        let level = {
            let mut inner = controller.lock()?;
            controller.apply_intensity(&mut inner, default_intensity)?
        };
        tracing::debug!(
            "Controller attached at intensity {} (level {})",
            default_intensity,
            level
        );

        Ok(controller)
    }

    /// Apply a new intensity, returning the level written to the sink
    pub fn set(&self, intensity: i64) -> Result<u32, BacklightError> {
        let clamped = self.curve.clamp_intensity(intensity);
        if i64::from(clamped) != intensity {
            tracing::debug!("Intensity {} clamped to {}", intensity, clamped);
        }

        let mut inner = self.lock()?;
        self.apply_intensity(&mut inner, clamped)
    }

    /// Last intensity that reached the sink
    pub fn get(&self) -> u32 {
        self.current_intensity.load(Ordering::Acquire)
    }

    /// Last level that reached the sink
    pub fn current_level(&self) -> u32 {
        self.current_level.load(Ordering::Acquire)
    }

    pub fn power_state(&self) -> Result<PowerState, BacklightError> {
        Ok(self.lock()?.power)
    }

    /// Enter the suspended state and re-apply the current intensity.
    ///
    /// Does nothing when already suspended. The state only changes once the
    /// sink accepted the level.
    pub fn suspend(&self) -> Result<(), BacklightError> {
        let mut inner = self.lock()?;
        if inner.power == PowerState::Suspended {
            return Ok(());
        }

        let intensity = self.current_intensity.load(Ordering::Acquire);
        self.apply_intensity(&mut inner, intensity)?;

        inner.power = PowerState::Suspended;
        tracing::info!("Backlight suspended");
        Ok(())
    }

    /// Leave the suspended state and restore the default intensity.
    ///
    /// Does nothing when already active. A failed apply keeps the backlight
    /// suspended so the resume can be retried.
    pub fn resume(&self) -> Result<(), BacklightError> {
        let mut inner = self.lock()?;
        if inner.power == PowerState::Active {
            return Ok(());
        }

        self.current_intensity
            .store(self.default_intensity, Ordering::Release);
        self.apply_intensity(&mut inner, self.default_intensity)?;

        inner.power = PowerState::Active;
        tracing::info!("Backlight resumed");
        Ok(())
    }

    /// Write a level straight to the sink, bypassing the curve.
    ///
    /// Used for luminance measurement. Only `current_level` is updated.
    pub fn raw_apply(&self, level: i64) -> Result<(), BacklightError> {
        let clamped = level.clamp(0, i64::from(self.max_level)) as u32;
        tracing::info!("Raw backlight level {}", level);
        if i64::from(clamped) != level {
            tracing::debug!("Raw level {} clamped to {}", level, clamped);
        }

        let mut inner = self.lock()?;
        self.apply_level(&mut inner, clamped)
    }

    pub fn curve(&self) -> &CalibrationCurve {
        &self.curve
    }

    pub fn default_intensity(&self) -> u32 {
        self.default_intensity
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<S>>, BacklightError> {
        self.inner.lock().map_err(|_| BacklightError::LockPoisoned)
    }

    fn apply_intensity(
        &self,
        inner: &mut Inner<S>,
        intensity: u32,
    ) -> Result<u32, BacklightError> {
        let level = self.curve.map(i64::from(intensity));
        self.apply_level(inner, level)?;
        self.current_intensity.store(intensity, Ordering::Release);

        tracing::debug!("Intensity {} applied as level {}", intensity, level);
        Ok(level)
    }

    fn apply_level(&self, inner: &mut Inner<S>, level: u32) -> Result<(), BacklightError> {
        if let Err(e) = inner.sink.apply(level) {
            tracing::warn!("Failed to apply backlight level {}: {}", level, e);
            return Err(e.into());
        }
        self.current_level.store(level, Ordering::Release);
        Ok(())
    }
}
