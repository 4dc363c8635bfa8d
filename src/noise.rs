use rand::Rng;
use rand_distr::StandardNormal;

/// Zero-mean Gaussian draw with the given standard deviation.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    z * sigma
}

pub fn clip(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_gaussian_is_seed_stable() {
        let a = gaussian(&mut StdRng::seed_from_u64(7), 2.0);
        let b = gaussian(&mut StdRng::seed_from_u64(7), 2.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_gaussian_spread() {
        let mut rng = StdRng::seed_from_u64(1);
        let draws: Vec<f64> = (0..5000).map(|_| gaussian(&mut rng, 2.0)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.15, "mean {}", mean);
        assert!((var.sqrt() - 2.0).abs() < 0.15, "std {}", var.sqrt());
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip(25.0, 1.0, 20.0), 20.0);
        assert_eq!(clip(-3.0, 1.0, 20.0), 1.0);
        assert_eq!(clip(0.4, 0.0, 1.0), 0.4);
    }
}
