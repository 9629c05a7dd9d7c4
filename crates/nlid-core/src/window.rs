//! Sliding-window segmentation
//!
//! A [`WindowPlan`] fixes window length and step; it slices any signal into
//! a lazy, restartable sequence of equal-length [`Window`]s.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Window length and overlap as configured.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window length in samples
    pub length: usize,
    /// Fraction of each window shared with the next, in [0, 1)
    pub overlap: f64,
}

impl WindowConfig {
    /// Window spanning `seconds` at `sample_rate_hz`
    #[must_use]
    pub fn from_duration(seconds: f64, overlap: f64, sample_rate_hz: f64) -> Self {
        Self {
            length: (seconds * sample_rate_hz).round().max(0.0) as usize,
            overlap,
        }
    }

    /// Build the segmentation plan.
    ///
    /// # Errors
    ///
    /// See [`WindowPlan::new`].
    pub fn plan(&self) -> Result<WindowPlan, ConfigError> {
        WindowPlan::new(self.length, self.overlap)
    }
}

impl Default for WindowConfig {
    /// 60 s at 128 Hz, 20% overlap
    fn default() -> Self {
        Self { length: 7680, overlap: 0.2 }
    }
}

/// Fixed window length and step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WindowPlan {
    length: usize,
    step: usize,
}

impl WindowPlan {
    /// Create a plan; `step = max(1, round(length * (1 - overlap)))`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidWindow`] if `length == 0` or `overlap` is not
    /// in `[0, 1)`.
    pub fn new(length: usize, overlap: f64) -> Result<Self, ConfigError> {
        if length == 0 || !(0.0..1.0).contains(&overlap) {
            return Err(ConfigError::InvalidWindow { length, overlap });
        }
        let step = ((length as f64) * (1.0 - overlap)).round().max(1.0) as usize;
        Ok(Self { length, step })
    }

    /// Window length in samples
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Distance between consecutive window starts
    #[inline]
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Number of windows over a signal of `n` samples
    #[must_use]
    pub fn count(&self, n: usize) -> usize {
        if n < self.length {
            0
        } else {
            (n - self.length) / self.step + 1
        }
    }

    /// Windows over `samples`
    #[must_use]
    pub fn windows<'a>(&self, samples: &'a [f64]) -> Windows<'a> {
        Windows {
            samples,
            length: self.length,
            step: self.step,
            next: 0,
            remaining: self.count(samples.len()),
        }
    }

    /// Synchronized windows over two signals (same offsets for both).
    ///
    /// Yields as many pairs as the shorter signal allows.
    pub fn paired<'a>(
        &self,
        x: &'a [f64],
        y: &'a [f64],
    ) -> impl Iterator<Item = (Window<'a>, Window<'a>)> + Clone {
        self.windows(x).zip(self.windows(y))
    }
}

/// One analysis window.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Window<'a> {
    /// Offset of the first sample in the source signal
    pub start: usize,
    /// Window samples
    pub samples: &'a [f64],
}

impl Window<'_> {
    /// Window length
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Iterator over the windows of one signal. Clone to restart.
#[derive(Clone, Debug)]
pub struct Windows<'a> {
    samples: &'a [f64],
    length: usize,
    step: usize,
    next: usize,
    remaining: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let start = self.next;
        self.next += self.step;
        self.remaining -= 1;
        Some(Window {
            start,
            samples: &self.samples[start..start + self.length],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Windows<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_rounding() {
        assert_eq!(WindowPlan::new(7680, 0.2).unwrap().step(), 6144);
        assert_eq!(WindowPlan::new(10, 0.25).unwrap().step(), 8); // 7.5 rounds up
        assert_eq!(WindowPlan::new(3, 0.9).unwrap().step(), 1);
        assert_eq!(WindowPlan::new(10, 0.0).unwrap().step(), 10);
    }

    #[test]
    fn test_invalid_plans() {
        assert!(WindowPlan::new(0, 0.2).is_err());
        assert!(WindowPlan::new(10, 1.0).is_err());
        assert!(WindowPlan::new(10, -0.1).is_err());
        assert!(WindowPlan::new(10, f64::NAN).is_err());
    }

    #[test]
    fn test_window_count_and_offsets() {
        let plan = WindowPlan::new(100, 0.2).unwrap();
        for n in [0, 99, 100, 179, 180, 181, 1000] {
            let expected = if n < 100 { 0 } else { (n - 100) / 80 + 1 };
            let data = vec![0.0; n];
            let windows: Vec<_> = plan.windows(&data).collect();
            assert_eq!(windows.len(), expected, "n = {n}");
            assert_eq!(plan.count(n), expected);

            for pair in windows.windows(2) {
                assert_eq!(pair[1].start - pair[0].start, plan.step());
            }
            for w in &windows {
                assert_eq!(w.len(), 100);
                assert!(w.start + w.len() <= n);
            }
        }
    }

    #[test]
    fn test_windows_restartable() {
        let data: Vec<f64> = (0..50).map(f64::from).collect();
        let plan = WindowPlan::new(20, 0.5).unwrap();
        let iter = plan.windows(&data);
        assert_eq!(iter.len(), 4);

        let first: Vec<usize> = iter.clone().map(|w| w.start).collect();
        let second: Vec<usize> = iter.map(|w| w.start).collect();
        assert_eq!(first, vec![0, 10, 20, 30]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_paired_windows_share_offsets() {
        let x: Vec<f64> = (0..30).map(f64::from).collect();
        let y: Vec<f64> = (0..30).map(|i| -f64::from(i)).collect();
        let plan = WindowPlan::new(10, 0.0).unwrap();

        for (wx, wy) in plan.paired(&x, &y) {
            assert_eq!(wx.start, wy.start);
            assert_eq!(wx.samples[0], -wy.samples[0]);
        }
        assert_eq!(plan.paired(&x, &y).count(), 3);
    }

    #[test]
    fn test_from_duration() {
        let config = WindowConfig::from_duration(60.0, 0.2, 128.0);
        assert_eq!(config, WindowConfig::default());
    }
}
