//! Background tone inference over 1-D intensity samples.

/// Pluggable background inference.
pub trait BackgroundStrategy: Send + Sync {
    /// Infer the background intensity (0-255) from raw channel samples.
    fn infer_background(&self, samples: &[u8]) -> u8;
}

/// Two-cluster partition where the lighter centroid is taken as background.
///
/// Dark logos on dark backgrounds come out wrong; that case is left as is.
/// Runs Lloyd iterations over a 256-bin histogram so cost does not grow with
/// image size, seeded at the darkest and lightest observed values so repeated
/// runs give identical results.
#[derive(Debug, Clone, Copy)]
pub struct TwoMeansBackground {
    pub max_iterations: usize,
}

impl Default for TwoMeansBackground {
    fn default() -> Self {
        Self {
            max_iterations: 100,
        }
    }
}

impl TwoMeansBackground {
    /// Return both centroids, ascending.
    pub fn centroids(&self, samples: &[u8]) -> Option<(f64, f64)> {
        let mut histogram = [0u64; 256];
        for &s in samples {
            histogram[s as usize] += 1;
        }

        let lo = histogram.iter().position(|&c| c > 0)?;
        let hi = histogram.iter().rposition(|&c| c > 0)?;

        let mut centers = [lo as f64, hi as f64];
        if lo == hi {
            return Some((centers[0], centers[1]));
        }

        for _ in 0..self.max_iterations {
            let mut sums = [0.0f64; 2];
            let mut counts = [0u64; 2];

            for (value, &count) in histogram.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let v = value as f64;
                let k = if (v - centers[0]).abs() <= (v - centers[1]).abs() {
                    0
                } else {
                    1
                };
                sums[k] += v * count as f64;
                counts[k] += count;
            }

            let mut next = centers;
            for k in 0..2 {
                if counts[k] > 0 {
                    next[k] = sums[k] / counts[k] as f64;
                }
            }

            if next == centers {
                break;
            }
            centers = next;
        }

        Some((centers[0].min(centers[1]), centers[0].max(centers[1])))
    }
}

impl BackgroundStrategy for TwoMeansBackground {
    fn infer_background(&self, samples: &[u8]) -> u8 {
        match self.centroids(samples) {
            // Truncate like an integer cast of the centroid.
            Some((_, lighter)) => lighter.clamp(0.0, 255.0) as u8,
            None => 255,
        }
    }
}
