//! Brightness calibration curve
//!
//! Converts an abstract intensity (0-255 by default) into a PWM duty-cycle
//! level using a four-segment piecewise-linear curve anchored at fixed
//! breakpoints. All interpolation uses truncating integer division so the
//! produced levels match the panel calibration tables bit for bit.

use crate::BacklightError;
use serde::{Deserialize, Serialize};

/// One knot of the calibration curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub intensity: u32,
    pub level: u32,
}

impl Breakpoint {
    pub const fn new(intensity: u32, level: u32) -> Self {
        Self { intensity, level }
    }
}

/// Four-segment calibration curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationCurve {
    dim: Breakpoint,
    low: Breakpoint,
    mid: Breakpoint,
    max: Breakpoint,
    dark_level: u32,
}

impl CalibrationCurve {
    /// Build a curve from its knots.
    ///
    /// Intensities must be strictly increasing starting above zero, and
    /// levels must be non-decreasing from `dark_level` up to `max.level`.
    pub fn new(
        dim: Breakpoint,
        low: Breakpoint,
        mid: Breakpoint,
        max: Breakpoint,
        dark_level: u32,
    ) -> Result<Self, BacklightError> {
        if dim.intensity == 0 {
            return Err(BacklightError::InvalidCurve(
                "dim threshold must be above zero".into(),
            ));
        }

        let knots = [dim, low, mid, max];
        for pair in knots.windows(2) {
            if pair[0].intensity >= pair[1].intensity {
                return Err(BacklightError::InvalidCurve(format!(
                    "intensity thresholds not strictly increasing: {} >= {}",
                    pair[0].intensity, pair[1].intensity
                )));
            }
            if pair[0].level > pair[1].level {
                return Err(BacklightError::InvalidCurve(format!(
                    "levels decrease between intensity {} and {}: {} > {}",
                    pair[0].intensity, pair[1].intensity, pair[0].level, pair[1].level
                )));
            }
        }

        if dark_level > dim.level {
            return Err(BacklightError::InvalidCurve(format!(
                "dark level {} exceeds dim level {}",
                dark_level, dim.level
            )));
        }

        Ok(Self {
            dim,
            low,
            mid,
            max,
            dark_level,
        })
    }

    /// Highest accepted intensity
    pub fn max_intensity(&self) -> u32 {
        self.max.intensity
    }

    /// Level produced at full intensity
    pub fn max_level(&self) -> u32 {
        self.max.level
    }

    pub fn dark_level(&self) -> u32 {
        self.dark_level
    }

    /// Curve knots from dimmest to brightest
    pub fn breakpoints(&self) -> [Breakpoint; 4] {
        [self.dim, self.low, self.mid, self.max]
    }

    /// Clamp a requested intensity into `[0, max_intensity]`
    pub fn clamp_intensity(&self, intensity: i64) -> u32 {
        intensity.clamp(0, i64::from(self.max.intensity)) as u32
    }

    /// Map an intensity to a duty-cycle level.
    ///
    /// Negative input maps like zero; input above the maximum maps like the
    /// maximum.
    pub fn map(&self, intensity: i64) -> u32 {
        let intensity = self.clamp_intensity(intensity);

        if intensity >= self.mid.intensity {
            interpolate(self.mid, self.max, intensity)
        } else if intensity >= self.low.intensity {
            interpolate(self.low, self.mid, intensity)
        } else if intensity >= self.dim.intensity {
            interpolate(self.dim, self.low, intensity)
        } else if intensity > 0 {
            self.dark_level
        } else {
            // Zero is off, never the dark floor
            0
        }
    }

    /// Every `(intensity, level)` pair of the domain, dimmest first
    pub fn table(&self) -> Vec<(u32, u32)> {
        (0..=self.max.intensity)
            .map(|i| (i, self.map(i64::from(i))))
            .collect()
    }
}

fn interpolate(from: Breakpoint, to: Breakpoint, intensity: u32) -> u32 {
    let offset = u64::from(intensity - from.intensity);
    let rise = u64::from(to.level - from.level);
    let run = u64::from(to.intensity - from.intensity);

    from.level + (offset * rise / run) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p4_curve() -> CalibrationCurve {
        CalibrationCurve::new(
            Breakpoint::new(15, 50),
            Breakpoint::new(50, 90),
            Breakpoint::new(150, 784),
            Breakpoint::new(255, 1600),
            0,
        )
        .unwrap()
    }

    fn p5_curve() -> CalibrationCurve {
        CalibrationCurve::new(
            Breakpoint::new(20, 60),
            Breakpoint::new(30, 60),
            Breakpoint::new(150, 784),
            Breakpoint::new(255, 1600),
            60,
        )
        .unwrap()
    }

    #[test]
    fn test_reference_points() {
        let curve = p4_curve();
        assert_eq!(curve.map(150), 784);
        assert_eq!(curve.map(255), 1600);
        assert_eq!(curve.map(0), 0);
        assert_eq!(curve.map(10), 0);
    }

    #[test]
    fn test_knots_are_exact() {
        let curve = p4_curve();
        for knot in curve.breakpoints() {
            assert_eq!(curve.map(i64::from(knot.intensity)), knot.level);
        }
    }

    #[test]
    fn test_truncating_interpolation() {
        let curve = p4_curve();
        // 50 + 1 * 40 / 35 = 51.14..
        assert_eq!(curve.map(16), 51);
        // 90 + 1 * 694 / 100 = 96.94..
        assert_eq!(curve.map(51), 96);
        // 784 + 1 * 816 / 105 = 791.77..
        assert_eq!(curve.map(151), 791);
        // 784 + 104 * 816 / 105 = 1592.22..
        assert_eq!(curve.map(254), 1592);
    }

    #[test]
    fn test_zero_is_not_dark_floor() {
        let curve = p5_curve();
        assert_eq!(curve.dark_level(), 60);
        assert_eq!(curve.map(0), 0);
        assert_eq!(curve.map(1), 60);
        assert_eq!(curve.map(19), 60);
    }

    #[test]
    fn test_monotonic() {
        for curve in [p4_curve(), p5_curve()] {
            let table = curve.table();
            assert_eq!(table.len(), 256);
            for pair in table.windows(2) {
                assert!(pair[0].1 <= pair[1].1, "{:?} -> {:?}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_strictly_inside_segments() {
        let curve = p4_curve();
        for pair in curve.breakpoints().windows(2) {
            let (from, to) = (pair[0], pair[1]);
            for intensity in (from.intensity + 1)..to.intensity {
                let level = curve.map(i64::from(intensity));
                assert!(
                    level > from.level && level < to.level,
                    "map({}) = {} outside ({}, {})",
                    intensity,
                    level,
                    from.level,
                    to.level
                );
            }
        }
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let curve = p4_curve();
        assert_eq!(curve.map(-1), 0);
        assert_eq!(curve.map(i64::MIN), 0);
        assert_eq!(curve.map(256), 1600);
        assert_eq!(curve.clamp_intensity(-20), 0);
        assert_eq!(curve.clamp_intensity(1000), 255);
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let result = CalibrationCurve::new(
            Breakpoint::new(50, 50),
            Breakpoint::new(15, 90),
            Breakpoint::new(150, 784),
            Breakpoint::new(255, 1600),
            0,
        );
        assert!(matches!(result, Err(BacklightError::InvalidCurve(_))));
    }

    #[test]
    fn test_rejects_decreasing_levels() {
        let result = CalibrationCurve::new(
            Breakpoint::new(15, 50),
            Breakpoint::new(50, 900),
            Breakpoint::new(150, 784),
            Breakpoint::new(255, 1600),
            0,
        );
        assert!(matches!(result, Err(BacklightError::InvalidCurve(_))));
    }

    #[test]
    fn test_rejects_zero_dim_and_high_floor() {
        let zero_dim = CalibrationCurve::new(
            Breakpoint::new(0, 50),
            Breakpoint::new(50, 90),
            Breakpoint::new(150, 784),
            Breakpoint::new(255, 1600),
            0,
        );
        assert!(zero_dim.is_err());

        let high_floor = CalibrationCurve::new(
            Breakpoint::new(15, 50),
            Breakpoint::new(50, 90),
            Breakpoint::new(150, 784),
            Breakpoint::new(255, 1600),
            51,
        );
        assert!(high_floor.is_err());
    }
}
