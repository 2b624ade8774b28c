//! Fixed-bin roughness histogram and percentile lookup.
//!
//! 100 bins of width 0.04 cover `[0, 4.0)`. A session's RoadDAN segments are
//! binned into a [`DanHistogram`]; sessions accumulate into a
//! [`PersistentHistogram`] that only ever grows.

use serde::{Deserialize, Deserializer, Serialize};

use crate::roughness::RoadDanSegment;

pub const BIN_COUNT: usize = 100;
pub const MAX_DAN: f64 = 4.0;
pub const BIN_WIDTH: f64 = MAX_DAN / BIN_COUNT as f64;
/// Largest value kept in range; anything above lands in the last bin.
const CLAMP_MAX: f64 = 3.999;
/// Returned by [`DanHistogram::percentile`] when there is no data.
pub const NEUTRAL_PERCENTILE: u32 = 50;

fn deserialize_bins<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let bins = Vec::<u64>::deserialize(deserializer)?;
    if bins.len() != BIN_COUNT {
        return Err(serde::de::Error::invalid_length(bins.len(), &"exactly 100 bins"));
    }
    Ok(bins)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DanHistogram {
    #[serde(deserialize_with = "deserialize_bins")]
    pub bins: Vec<u64>,
    #[serde(rename = "totalSamples")]
    pub total_samples: u64,
    /// Meaningless while `total_samples == 0`.
    #[serde(rename = "minDAN")]
    pub min_dan: f64,
    #[serde(rename = "maxDAN")]
    pub max_dan: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HistogramStats {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl Default for DanHistogram {
    fn default() -> Self {
        Self {
            bins: vec![0; BIN_COUNT],
            total_samples: 0,
            min_dan: 0.0,
            max_dan: 0.0,
        }
    }
}

fn bin_index(value: f64) -> usize {
    let v = value.clamp(0.0, CLAMP_MAX);
    ((v / BIN_WIDTH).floor() as usize).min(BIN_COUNT - 1)
}

fn bin_midpoint(bin: usize) -> f64 {
    (bin as f64 + 0.5) * BIN_WIDTH
}

impl DanHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut h = Self::new();
        for v in values {
            h.add_sample(v);
        }
        h
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples == 0
    }

    /// Bin one value. Non-finite values are dropped and `false` is returned.
    pub fn add_sample(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            log::debug!("dropping non-finite DAN value {}", value);
            return false;
        }
        let v = value.clamp(0.0, CLAMP_MAX);
        self.bins[bin_index(v)] += 1;
        if self.total_samples == 0 {
            self.min_dan = v;
            self.max_dan = v;
        } else {
            self.min_dan = self.min_dan.min(v);
            self.max_dan = self.max_dan.max(v);
        }
        self.total_samples += 1;
        true
    }

    /// Percentile rank (0–100) of `value`, counting half of its own bin.
    pub fn percentile(&self, value: f64) -> u32 {
        if self.total_samples == 0 {
            return NEUTRAL_PERCENTILE;
        }
        let bin = bin_index(value);
        let below: u64 = self.bins[..bin].iter().sum();
        let own = self.bins[bin] as f64;
        ((below as f64 + own / 2.0) / self.total_samples as f64 * 100.0).round() as u32
    }

    /// Percentile ranks for a batch of values against this histogram.
    pub fn percentiles<I: IntoIterator<Item = f64>>(&self, values: I) -> Vec<u32> {
        values.into_iter().map(|v| self.percentile(v)).collect()
    }

    /// Score each segment's RoadDAN against this (prior) histogram.
    pub fn percentiles_for(&self, segments: &[RoadDanSegment]) -> Vec<u32> {
        self.percentiles(segments.iter().map(|s| s.road_dan))
    }

    /// Bin midpoint where the cumulative count first reaches `pct`% of the total.
    fn value_at(&self, pct: f64) -> f64 {
        let threshold = self.total_samples as f64 * pct / 100.0;
        let mut cumulative = 0u64;
        for (bin, &count) in self.bins.iter().enumerate() {
            cumulative += count;
            if cumulative as f64 >= threshold {
                return bin_midpoint(bin);
            }
        }
        bin_midpoint(BIN_COUNT - 1)
    }

    /// p10/p25/p50/p75/p90, or `None` for an empty histogram.
    pub fn stats(&self) -> Option<HistogramStats> {
        if self.total_samples == 0 {
            return None;
        }
        Some(HistogramStats {
            p10: self.value_at(10.0),
            p25: self.value_at(25.0),
            p50: self.value_at(50.0),
            p75: self.value_at(75.0),
            p90: self.value_at(90.0),
        })
    }
}

/// Cross-session histogram. Mutated only through [`PersistentHistogram::merge`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentHistogram {
    #[serde(flatten)]
    pub histogram: DanHistogram,
    #[serde(rename = "sessionCount")]
    pub session_count: u64,
}

impl PersistentHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `source`'s bins element-wise, widen min/max, count one more session.
    ///
    /// Does not guard against merging the same session twice; callers track
    /// merged session IDs (see `store::HistogramStore`).
    pub fn merge(&mut self, source: &DanHistogram) {
        let target = &mut self.histogram;
        for (t, s) in target.bins.iter_mut().zip(source.bins.iter()) {
            *t += *s;
        }
        if source.total_samples > 0 {
            if target.total_samples == 0 {
                target.min_dan = source.min_dan;
                target.max_dan = source.max_dan;
            } else {
                target.min_dan = target.min_dan.min(source.min_dan);
                target.max_dan = target.max_dan.max(source.max_dan);
            }
        }
        target.total_samples += source.total_samples;
        self.session_count += 1;
    }
}
