//! Zipfian key generator
//!
//! Gray et al., "Quickly Generating Billion-Record Synthetic Databases".
//! Draws ranks in `[0, n)` where rank 0 is the most popular.

use rand::Rng;

use crate::error::{HeapWalError, Result};

#[derive(Debug, Clone)]
pub struct ZipfGenerator {
    n: u64,
    theta: f64,
    alpha: f64,
    zetan: f64,
    eta: f64,
}

impl ZipfGenerator {
    /// `theta` is the skew: 0 is uniform, values towards 1 concentrate on
    /// the first ranks. Must lie in `[0, 1)`.
    pub fn new(n: u64, theta: f64) -> Result<Self> {
        if n == 0 {
            return Err(HeapWalError::Config("zipf range must be non-empty".to_string()));
        }
        if !(0.0..1.0).contains(&theta) {
            return Err(HeapWalError::Config(format!("zipf skew {} not in [0, 1)", theta)));
        }

        let zetan = zeta(n, theta);
        let zeta2 = zeta(2.min(n), theta);
        let alpha = 1.0 / (1.0 - theta);
        let eta = if n > 1 {
            (1.0 - (2.0 / n as f64).powf(1.0 - theta)) / (1.0 - zeta2 / zetan)
        } else {
            0.0
        };

        Ok(Self {
            n,
            theta,
            alpha,
            zetan,
            eta,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.n == 1 {
            return 0;
        }
        if self.theta == 0.0 {
            return rng.gen_range(0..self.n);
        }

        let u: f64 = rng.gen();
        let uz = u * self.zetan;
        if uz < 1.0 {
            return 0;
        }
        if uz < 1.0 + 0.5f64.powf(self.theta) {
            return 1;
        }
        let rank = (self.n as f64 * (self.eta * u - self.eta + 1.0).powf(self.alpha)) as u64;
        rank.min(self.n - 1)
    }
}

fn zeta(n: u64, theta: f64) -> f64 {
    (1..=n).map(|i| 1.0 / (i as f64).powf(theta)).sum()
}
