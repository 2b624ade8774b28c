use crate::types::{ema3, Vec3};

/// Recursive halving smoother: `s[0] = x[0]`, `s[i] = s[i-1] + (x[i] - s[i-1]) / 2`.
///
/// Equivalent to exponential smoothing with α = 0.5. Used on the 1 Hz GPS
/// speed track and again on the clamped 60 Hz GPS acceleration.
pub fn recursive_halving(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for (i, &x) in values.iter().enumerate() {
        if i == 0 {
            out.push(x);
        } else {
            let prev = out[i - 1];
            out.push(prev + (x - prev) / 2.0);
        }
    }
    out
}

/// Scalar EMA where `weight` is the share given to the new sample.
///
/// The observer bank and the orientation-change detector use this form
/// (small weights, 0.01–0.2), the inverse of the `alpha` convention used by
/// the gravity tracker.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarEma {
    pub value: f64,
    weight: f64,
}

impl ScalarEma {
    pub fn new(weight: f64) -> Self {
        Self { value: 0.0, weight }
    }

    pub fn update(&mut self, sample: f64) -> f64 {
        self.value += self.weight * (sample - self.value);
        self.value
    }
}

/// Two cascaded vector EMAs with the same `alpha`, for display smoothing.
#[derive(Clone, Copy, Debug)]
pub struct SecondOrderEma {
    first: Vec3,
    second: Vec3,
    alpha: f64,
}

impl SecondOrderEma {
    pub fn new(alpha: f64) -> Self {
        Self { first: Vec3::zeros(), second: Vec3::zeros(), alpha }
    }

    pub fn update(&mut self, sample: &Vec3) -> Vec3 {
        self.first = ema3(&self.first, sample, self.alpha);
        self.second = ema3(&self.second, &self.first, self.alpha);
        self.second
    }
}

/// Exponentially decayed RMS: `ms = decay*ms + (1-decay)*x²`, returns `sqrt(ms)`.
#[derive(Clone, Copy, Debug)]
pub struct DecayedRms {
    mean_square: f64,
    decay: f64,
}

impl DecayedRms {
    pub fn new(decay: f64) -> Self {
        Self { mean_square: 0.0, decay }
    }

    /// Feed a squared deviation magnitude.
    pub fn update(&mut self, deviation_sq: f64) -> f64 {
        self.mean_square = self.decay * self.mean_square + (1.0 - self.decay) * deviation_sq;
        self.mean_square.sqrt()
    }
}

/// Fixed-length block mean with zero-order hold between block boundaries.
#[derive(Clone, Debug)]
pub struct BlockAverager {
    block_len: usize,
    sum: f64,
    count: usize,
    held: f64,
}

impl BlockAverager {
    pub fn new(block_len: usize) -> Self {
        Self { block_len: block_len.max(1), sum: 0.0, count: 0, held: 0.0 }
    }

    /// Add a sample. Returns `Some(mean)` when this sample closes a block.
    pub fn push(&mut self, sample: f64) -> Option<f64> {
        self.sum += sample;
        self.count += 1;
        if self.count < self.block_len {
            return None;
        }
        self.held = self.sum / self.count as f64;
        self.sum = 0.0;
        self.count = 0;
        Some(self.held)
    }

    /// Mean of the last completed block (0 before the first boundary).
    pub fn held(&self) -> f64 {
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recursive_halving() {
        let s = recursive_halving(&[0.0, 4.0, 4.0, 4.0]);
        assert_eq!(s, vec![0.0, 2.0, 3.0, 3.5]);
        assert!(recursive_halving(&[]).is_empty());
    }

    #[test]
    fn test_scalar_ema_weight_is_new_sample_share() {
        let mut ema = ScalarEma::new(0.25);
        assert_relative_eq!(ema.update(4.0), 1.0);
        assert_relative_eq!(ema.update(4.0), 1.75);
    }

    #[test]
    fn test_second_order_ema_converges() {
        let mut ema = SecondOrderEma::new(0.9);
        let target = Vec3::new(3.0, -1.0, 0.5);
        let mut out = Vec3::zeros();
        for _ in 0..400 {
            out = ema.update(&target);
        }
        assert_relative_eq!(out, target, epsilon = 1e-6);
    }

    #[test]
    fn test_decayed_rms_of_constant_deviation() {
        let mut rms = DecayedRms::new(0.95);
        let mut out = 0.0;
        for _ in 0..1000 {
            out = rms.update(0.5 * 0.5);
        }
        assert_relative_eq!(out, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_block_averager_holds_between_boundaries() {
        let mut avg = BlockAverager::new(3);
        assert_eq!(avg.push(1.0), None);
        assert_eq!(avg.push(2.0), None);
        assert_eq!(avg.push(3.0), Some(2.0));
        assert_eq!(avg.push(10.0), None);
        assert_eq!(avg.held(), 2.0);
    }
}
