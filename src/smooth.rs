use std::collections::VecDeque;

use thiserror::Error;

#[derive(Debug, Clone, Copy, Error)]
pub enum SmoothingError {
    #[error("The window length must be non-zero")]
    WindowLengthZero,
    #[error("The window length must be an odd number, received {0}")]
    WindowLengthNotOdd(usize),
    #[error(
        "The window length must be shorter than the data, received {0} window with {1} data points"
    )]
    WindowLengthTooLong(usize, usize),
}

#[derive(Debug, Clone)]
struct RingBuffer {
    buffer: VecDeque<f64>,
}

impl RingBuffer {
    pub fn new(window: usize) -> Self {
        let mut buffer = VecDeque::with_capacity(window);
        buffer.extend(std::iter::repeat(0.0).take(window));
        Self { buffer }
    }

    pub fn add(&mut self, value: f64) -> Option<f64> {
        let first = self.buffer.pop_front();
        self.buffer.push_back(value);
        first
    }
}

/// A trailing running mean over a fixed window, maintained incrementally.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buffer: RingBuffer,
    running_sum: f64,
    divisor: f64,
}

impl MovingAverage {
    pub fn new(window: usize) -> Result<Self, SmoothingError> {
        if window == 0 {
            return Err(SmoothingError::WindowLengthZero);
        }
        Ok(Self {
            buffer: RingBuffer::new(window),
            running_sum: 0.0,
            divisor: window as f64,
        })
    }

    pub fn add(&mut self, value: f64) {
        self.running_sum += value;
        if let Some(last_value) = self.buffer.add(value) {
            self.running_sum -= last_value
        };
    }

    pub fn average(&self) -> f64 {
        self.running_sum / self.divisor
    }

    pub fn average_over<I: Iterator<Item = f64>>(self, source: I) -> MovingAverageIter<I> {
        MovingAverageIter {
            state: self,
            source,
        }
    }
}

pub struct MovingAverageIter<I: Iterator<Item = f64>> {
    state: MovingAverage,
    source: I,
}

impl<I: Iterator<Item = f64>> Iterator for MovingAverageIter<I> {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next().map(|x| {
            self.state.add(x);
            self.state.average()
        })
    }
}

/// Write the trailing running mean of `data` into `out`.
pub fn moving_average(data: &[f64], window: usize, out: &mut [f64]) -> Result<(), SmoothingError> {
    let state = MovingAverage::new(window)?;
    let it = state.average_over(data.iter().copied());
    it.zip(out.iter_mut()).for_each(|(a, d)| *d = a);
    Ok(())
}

/// Centered rolling mean over an odd window, skipping missing values.
///
/// A point that is itself missing stays missing: smoothing never invents an
/// observation inside a data outage, that is the job of the gap-filling
/// stage with its own length limits.
pub fn rolling_mean_centered(values: &[f64], window: usize) -> Result<Vec<f64>, SmoothingError> {
    if window == 0 {
        return Err(SmoothingError::WindowLengthZero);
    }
    if window % 2 == 0 {
        return Err(SmoothingError::WindowLengthNotOdd(window));
    }
    if window > values.len() {
        return Err(SmoothingError::WindowLengthTooLong(window, values.len()));
    }
    let half = window / 2;
    let n = values.len();
    let smoothed = (0..n)
        .map(|i| {
            if !values[i].is_finite() {
                return f64::NAN;
            }
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            let mut sum = 0.0;
            let mut count = 0usize;
            for v in values[lo..=hi].iter().copied().filter(|v| v.is_finite()) {
                sum += v;
                count += 1;
            }
            sum / count as f64
        })
        .collect();
    Ok(smoothed)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_moving_average_converges_on_constant() {
        let data = vec![3.0; 8];
        let mut out = vec![0.0; 8];
        moving_average(&data, 4, &mut out).unwrap();
        // Warmup rolls in from the zero-filled buffer
        assert!((out[0] - 0.75).abs() < 1e-9);
        assert!((out[3] - 3.0).abs() < 1e-9);
        assert!((out[7] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_mean_centered() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = rolling_mean_centered(&values, 3).unwrap();
        assert!((smoothed[0] - 1.5).abs() < 1e-9);
        assert!((smoothed[2] - 3.0).abs() < 1e-9);
        assert!((smoothed[4] - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_mean_keeps_missing_missing() {
        let values = vec![1.0, f64::NAN, 3.0, 4.0, 5.0];
        let smoothed = rolling_mean_centered(&values, 3).unwrap();
        assert!(smoothed[1].is_nan());
        // Neighbours average over what is observed
        assert!((smoothed[0] - 1.0).abs() < 1e-9);
        assert!((smoothed[2] - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_window_validation() {
        let values = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            rolling_mean_centered(&values, 2),
            Err(SmoothingError::WindowLengthNotOdd(2))
        ));
        assert!(matches!(
            rolling_mean_centered(&values, 5),
            Err(SmoothingError::WindowLengthTooLong(5, 3))
        ));
        assert!(matches!(
            rolling_mean_centered(&values, 0),
            Err(SmoothingError::WindowLengthZero)
        ));
    }
}
