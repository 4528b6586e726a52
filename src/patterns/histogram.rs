use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub label: String,
    pub start: f64,
    pub end: f64,
    pub count: usize,
    /// Whether the bin midpoint lies inside the outlier band.
    pub in_range: bool,
}

/// Equal-width histogram over `[min, max]` of `values`.
///
/// Identical samples collapse into one bin. Values equal to the maximum land in
/// the last bin. Label precision follows the bin width: whole ms from 1ms up,
/// one decimal from 0.1ms, two below that.
pub fn histogram(values: &[f64], bins: usize, band: Option<(f64, f64)>) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let in_band = |x: f64| band.map_or(true, |(lo, hi)| x >= lo && x <= hi);

    if max == min {
        return vec![HistogramBin {
            label: format!("{:.1}ms", min),
            start: min,
            end: max,
            count: values.len(),
            in_range: in_band(min),
        }];
    }

    let size = (max - min) / bins as f64;
    let precision = if size < 0.1 {
        2
    } else if size < 1.0 {
        1
    } else {
        0
    };

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| {
            let start = min + i as f64 * size;
            let end = min + (i + 1) as f64 * size;
            HistogramBin {
                label: format!("{:.p$}-{:.p$}ms", start, end, p = precision),
                start,
                end,
                count: 0,
                in_range: in_band((start + end) / 2.0),
            }
        })
        .collect();

    for &v in values {
        let idx = (((v - min) / size) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}
