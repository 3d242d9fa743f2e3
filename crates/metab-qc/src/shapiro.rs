//! Shapiro-Wilk normality test (Royston's 1995 approximation, AS R94).

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{QcError, Result};

/// Smallest sample the test is defined for.
pub const MIN_SAMPLE: usize = 3;

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

/// `c[0] + c[1] x + c[2] x^2 + ...`
fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|err| QcError::Numerical(err.to_string()))
}

/// Coefficients for the lower half of the ordered sample, largest first.
fn half_coefficients(n: usize, normal: &Normal) -> Vec<f64> {
    let half = n / 2;
    if n == 3 {
        return vec![std::f64::consts::FRAC_1_SQRT_2];
    }
    let an = n as f64;
    let m: Vec<f64> = (1..=half)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (an + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();
    let a1 = poly(&C1, rsn) - m[0] / ssumm2;

    let mut a = vec![0.0; half];
    a[0] = a1;
    let (first_scaled, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        (1, fac)
    };
    for (coefficient, score) in a.iter_mut().zip(&m).skip(first_scaled) {
        *coefficient = -score / fac;
    }
    a
}

fn p_value(n: usize, w: f64, normal: &Normal) -> f64 {
    if w >= 1.0 {
        return 1.0;
    }
    let an = n as f64;
    if n == 3 {
        let p = 6.0 / std::f64::consts::PI
            * (w.sqrt().asin() - (0.75_f64).sqrt().asin());
        return p.clamp(0.0, 1.0);
    }
    let mut y = (1.0 - w).ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return 1e-99;
        }
        y = -(gamma - y).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let ln_n = an.ln();
        (poly(&C5, ln_n), poly(&C6, ln_n).exp())
    };
    1.0 - normal.cdf((y - m) / s)
}

/// Tests `values` for normality.
///
/// Returns `None` for fewer than [`MIN_SAMPLE`] values. A sample without
/// spread is reported as `W = 1`, `p = 1`.
pub fn shapiro_wilk(values: &[f64]) -> Result<Option<ShapiroWilk>> {
    let n = values.len();
    if n < MIN_SAMPLE {
        return Ok(None);
    }
    let mut x = values.to_vec();
    x.sort_by(f64::total_cmp);
    let range = x[n - 1] - x[0];
    if range <= f64::EPSILON * x[n - 1].abs().max(1.0) {
        return Ok(Some(ShapiroWilk {
            w: 1.0,
            p_value: 1.0,
        }));
    }

    let normal = standard_normal()?;
    let a = half_coefficients(n, &normal);
    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| ((v - mean) / range).powi(2)).sum();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, coefficient)| coefficient * (x[n - 1 - i] - x[i]) / range)
        .sum();
    let w = (numerator * numerator / ssq).min(1.0);
    Ok(Some(ShapiroWilk {
        w,
        p_value: p_value(n, w, &normal),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_values() {
        assert_eq!(shapiro_wilk(&[1.0, 2.0]).unwrap(), None);
    }

    #[test]
    fn test_constant_sample() {
        let result = shapiro_wilk(&[4.0, 4.0, 4.0, 4.0]).unwrap().unwrap();
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_three_values_exact() {
        let result = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap().unwrap();
        assert!((result.w - 1.0).abs() < 1e-12);
        assert!((result.p_value - 1.0).abs() < 1e-9);

        let skewed = shapiro_wilk(&[1.0, 2.0, 10.0]).unwrap().unwrap();
        assert!((skewed.w - 0.8322).abs() < 1e-3);
        assert!((skewed.p_value - 0.195).abs() < 0.01);
    }

    #[test]
    fn test_normal_scores_pass() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let values: Vec<f64> = (1..=30)
            .map(|i| normal.inverse_cdf((i as f64 - 0.5) / 30.0))
            .collect();
        let result = shapiro_wilk(&values).unwrap().unwrap();
        assert!(result.w > 0.98);
        assert!(result.p_value > 0.5);
    }

    #[test]
    fn test_skewed_sample_fails() {
        let mut values = vec![1.0; 15];
        values.extend([2.0, 3.0, 50.0, 120.0, 400.0]);
        let result = shapiro_wilk(&values).unwrap().unwrap();
        assert!(result.p_value < 0.001);
    }

    #[test]
    fn test_reference_sample() {
        let heights = [
            148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0,
        ];
        let result = shapiro_wilk(&heights).unwrap().unwrap();
        assert!((result.w - 0.7888).abs() < 1e-3);
        assert!((result.p_value - 0.0067).abs() < 5e-4);
    }

    #[test]
    fn test_small_sample_branch() {
        let result = shapiro_wilk(&[2.1, 3.4, 1.9, 5.6, 4.4, 3.0, 2.8]).unwrap().unwrap();
        assert!(result.w > 0.8 && result.w <= 1.0);
        assert!(result.p_value > 0.05);
    }
}
