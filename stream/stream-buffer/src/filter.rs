//! Least-squares filtering of noisy hardware timestamps.
//!
//! Hardware timestamps arrive jittered or with low resolution, while the
//! producer-supplied frame indices increase strictly. Fitting a line
//! `timestamp ~ a * index + b` over a short window of recent samples recovers
//! a smooth, monotonic time axis and exposes samples whose timestamp is
//! inconsistent with the rest of the window.

use std::collections::VecDeque;

use crate::NEGLIGIBLE_TIME_DIFFERENCE_SEC;

/// Default number of recent samples kept for the line fit.
pub const DEFAULT_AVERAGED_ITEMS: usize = 20;

/// A sample is flagged when its residual exceeds this multiple of the
/// window residual standard deviation.
const OUTLIER_STDDEV_MULTIPLIER: f64 = 2.5;

/// Result of filtering one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOutcome {
    /// The model-smoothed timestamp.
    pub filtered: f64,
    /// False when the sample's timestamp looks spurious; the admission
    /// pipeline drops such items without reporting an error.
    pub probably_valid: bool,
}

/// Sliding-window least-squares timestamp filter.
///
/// A window size of 0 disables filtering entirely (the unfiltered timestamp
/// passes through unchanged).
///
/// # Example
///
/// ```
/// use stream_buffer::TimestampFilter;
///
/// let mut filter = TimestampFilter::new(10);
/// for i in 0..5u64 {
///     let outcome = filter.filter(i, 0.1 * i as f64);
///     assert!(outcome.probably_valid);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TimestampFilter {
    /// Recent (frame index, absolute unfiltered timestamp) pairs.
    window: VecDeque<(u64, f64)>,
    window_size: usize,
    /// Timestamps are made relative to this during the fit, for numeric
    /// stability with wall-clock epochs.
    start_time: f64,
    last_filtered: Option<f64>,
}

impl Default for TimestampFilter {
    fn default() -> Self {
        Self::new(DEFAULT_AVERAGED_ITEMS)
    }
}

impl TimestampFilter {
    /// Creates a filter with the given window size (0 disables filtering).
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size.min(1024)),
            window_size,
            start_time: 0.0,
            last_filtered: None,
        }
    }

    /// The configured window size.
    #[must_use]
    pub const fn window_size(&self) -> usize {
        self.window_size
    }

    /// Resizes the window mid-stream; older entries are truncated, the most
    /// recent are kept.
    pub fn set_window_size(&mut self, window_size: usize) {
        self.window_size = window_size;
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
    }

    /// Sets the reference time the fit is computed relative to.
    pub fn set_start_time(&mut self, start_time: f64) {
        self.start_time = start_time;
    }

    /// The reference time.
    #[must_use]
    pub const fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Forgets all accumulated samples.
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_filtered = None;
    }

    /// Filters one sample.
    ///
    /// Appends `(index, unfiltered)` to the window (dropping the oldest entry
    /// when full) and returns the fitted timestamp. With fewer than two
    /// samples, or with filtering disabled, the unfiltered timestamp passes
    /// through unchanged and is always considered valid.
    #[allow(clippy::cast_precision_loss)]
    pub fn filter(&mut self, index: u64, unfiltered: f64) -> FilterOutcome {
        if self.window_size == 0 {
            return FilterOutcome {
                filtered: unfiltered,
                probably_valid: true,
            };
        }

        self.window.push_back((index, unfiltered));
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }

        if self.window.len() < 2 {
            self.last_filtered = Some(unfiltered);
            return FilterOutcome {
                filtered: unfiltered,
                probably_valid: true,
            };
        }

        let Some((slope, intercept)) = self.fit_line() else {
            // Degenerate window (repeated indices); pass through.
            self.last_filtered = Some(unfiltered);
            return FilterOutcome {
                filtered: unfiltered,
                probably_valid: true,
            };
        };

        let predict = |idx: u64| slope.mul_add(idx as f64, intercept) + self.start_time;
        let filtered = predict(index);

        // Residual of the current sample against the window spread.
        let n = self.window.len() as f64;
        let sum_sq: f64 = self
            .window
            .iter()
            .map(|&(i, ts)| {
                let r = ts - predict(i);
                r * r
            })
            .sum();
        let stddev = (sum_sq / (n - 1.0)).sqrt();
        let residual = (unfiltered - filtered).abs();

        let mut probably_valid = true;
        if stddev > NEGLIGIBLE_TIME_DIFFERENCE_SEC
            && residual > OUTLIER_STDDEV_MULTIPLIER * stddev
        {
            probably_valid = false;
        }
        if let Some(last) = self.last_filtered {
            if filtered < last - NEGLIGIBLE_TIME_DIFFERENCE_SEC {
                probably_valid = false;
            }
        }

        if probably_valid {
            self.last_filtered = Some(filtered);
        }
        FilterOutcome {
            filtered,
            probably_valid,
        }
    }

    /// Least-squares fit of `ts - start_time ~ slope * index + intercept`.
    ///
    /// Returns `None` when all indices in the window coincide.
    #[allow(clippy::cast_precision_loss)]
    fn fit_line(&self) -> Option<(f64, f64)> {
        let n = self.window.len() as f64;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xx = 0.0;
        let mut sum_xy = 0.0;
        for &(index, ts) in &self.window {
            let x = index as f64;
            let y = ts - self.start_time;
            sum_x += x;
            sum_y += y;
            sum_xx += x * x;
            sum_xy += x * y;
        }
        let denom = n.mul_add(sum_xx, -(sum_x * sum_x));
        if denom.abs() < f64::EPSILON {
            return None;
        }
        let slope = n.mul_add(sum_xy, -(sum_x * sum_y)) / denom;
        let intercept = (sum_y - slope * sum_x) / n;
        Some((slope, intercept))
    }
}
