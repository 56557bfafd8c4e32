use serde::Serialize;

use crate::error::{Error, Result};

/// Interpolated percentile over `values`, `p` in `[0, 1]`.
///
/// Uses the spreadsheet definition: rank `n = (N - 1) * p + 1` (1-indexed),
/// linearly interpolated between the two neighbouring samples. The input is
/// copied before sorting and is never modified.
pub fn percentile(values: &[f64], p: f64) -> Result<f64> {
    Sorted::new(values)?.at(p)
}

/// A sorted copy of a latency sample, so several percentiles can be read
/// without re-sorting.
#[derive(Debug, Clone)]
pub struct Sorted {
    values: Vec<f64>,
}

impl Sorted {
    pub fn new(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::NoData);
        }

        let mut values = values.to_vec();
        values.sort_by(f64::total_cmp);
        Ok(Self { values })
    }

    pub fn min(&self) -> f64 {
        self.values[0]
    }

    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn at(&self, p: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::InvalidPercentile(p));
        }

        let count = self.values.len();
        let rank = (count - 1) as f64 * p + 1.0;

        if rank <= 1.0 {
            return Ok(self.min());
        }
        if rank >= count as f64 {
            return Ok(self.max());
        }

        let k = rank.floor() as usize;
        let d = rank - k as f64;
        let lower = self.values[k - 1];
        let upper = self.values[k];
        Ok(lower + d * (upper - lower))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let sorted = Sorted::new(values)?;
        Ok(Self {
            min_ms: sorted.min(),
            avg_ms: sorted.mean(),
            p50_ms: sorted.at(0.50)?,
            p95_ms: sorted.at(0.95)?,
            p99_ms: sorted.at(0.99)?,
            max_ms: sorted.max(),
        })
    }
}
