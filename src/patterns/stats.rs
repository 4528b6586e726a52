use serde::{Deserialize, Serialize};

/// Median of an unsorted sample; the mean of the two middle values for even sizes.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    median_sorted(&sorted)
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median absolute deviation around `center`.
pub fn mad(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Outcome of MAD outlier rejection over one pattern's samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MadFilter {
    pub median: f64,
    pub mad: f64,
    pub lower: f64,
    /// `f64::INFINITY` when the sample was too small to filter.
    pub upper: f64,
    pub kept: Vec<f64>,
}

impl MadFilter {
    pub fn excluded(&self, total: usize) -> usize {
        total - self.kept.len()
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Keeps samples within `median ± threshold * MAD`.
///
/// Below `min_samples` nothing is filtered and the band is `[0, inf)`. A zero MAD
/// keeps every sample and collapses the band onto the median.
pub fn mad_filter(values: &[f64], threshold: f64, min_samples: usize) -> MadFilter {
    let m = median(values);
    if values.len() < min_samples {
        return MadFilter {
            median: m,
            mad: 0.0,
            lower: 0.0,
            upper: f64::INFINITY,
            kept: values.to_vec(),
        };
    }

    let d = mad(values, m);
    if d == 0.0 {
        return MadFilter {
            median: m,
            mad: 0.0,
            lower: m,
            upper: m,
            kept: values.to_vec(),
        };
    }

    let lower = m - threshold * d;
    let upper = m + threshold * d;
    let kept = values
        .iter()
        .copied()
        .filter(|v| *v >= lower && *v <= upper)
        .collect();
    MadFilter {
        median: m,
        mad: d,
        lower,
        upper,
        kept,
    }
}
