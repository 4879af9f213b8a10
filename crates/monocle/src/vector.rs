//! Numeric primitives shared by the envelope scorers

/// Dot product over the overlapping prefix of `a` and `b`
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).fold(0.0, |acc, (x, y)| acc + x * y)
}

pub fn average(x: &[f64]) -> f64 {
    match x.len() {
        0 => 0.0,
        n => x.iter().sum::<f64>() / n as f64,
    }
}

/// Intensity-weighted mean of `x`. Falls back to the unweighted mean if the
/// weights sum to zero, and to 0 if the slices are empty or mismatched.
pub fn weighted_average(x: &[f64], weights: &[f64]) -> f64 {
    if x.is_empty() || x.len() != weights.len() {
        return 0.0;
    }
    let (sum_weighted, sum_weights) = x
        .iter()
        .zip(weights.iter())
        .fold((0.0, 0.0), |(sx, sw), (x, w)| (sx + x * w, sw + w));
    if sum_weights > 0.0 {
        sum_weighted / sum_weights
    } else {
        average(x)
    }
}

/// Scale all values in place so that the maximum is 1
pub fn scale(x: &mut [f64]) {
    let max = x.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        x.iter_mut().for_each(|v| *v /= max);
    }
}

/// Scale all values in place so that they sum to 1
pub fn normalize(x: &mut [f64]) {
    let sum = x.iter().sum::<f64>();
    if sum != 0.0 {
        x.iter_mut().for_each(|v| *v /= sum);
    }
}

/// Pearson chi-squared divergence of `observed` from `expected`.
///
/// Positions where the expectation is zero but something was observed are
/// penalized against the smallest non-zero expectation. If `expected` has no
/// non-zero entry at all, the result is infinite.
pub fn chi_squared(observed: &[f64], expected: &[f64]) -> f64 {
    let min_nonzero = expected
        .iter()
        .copied()
        .filter(|e| *e > 0.0)
        .fold(f64::INFINITY, f64::min);

    observed
        .iter()
        .zip(expected.iter())
        .fold(0.0, |acc, (&o, &e)| {
            if e == 0.0 {
                if o == 0.0 {
                    acc
                } else if min_nonzero.is_finite() {
                    acc + o / min_nonzero
                } else {
                    f64::INFINITY
                }
            } else {
                acc + (o - e).powi(2) / e
            }
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dot_product() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        // Only the overlapping prefix participates
        assert_eq!(dot(&[1.0, 2.0], &[4.0, 5.0, 6.0]), 14.0);
    }

    #[test]
    fn weighted() {
        assert_eq!(weighted_average(&[100.0, 200.0], &[3.0, 1.0]), 125.0);
        assert_eq!(weighted_average(&[100.0, 200.0], &[0.0, 0.0]), 150.0);
        assert_eq!(weighted_average(&[100.0], &[1.0, 2.0]), 0.0);
        assert_eq!(weighted_average(&[], &[]), 0.0);
    }

    #[test]
    fn scaling() {
        let mut x = vec![0.0, 2.0, 4.0, 1.0];
        scale(&mut x);
        assert_eq!(x, vec![0.0, 0.5, 1.0, 0.25]);

        let mut zeros = vec![0.0; 3];
        scale(&mut zeros);
        assert_eq!(zeros, vec![0.0; 3]);

        let mut x = vec![1.0, 3.0, 4.0];
        normalize(&mut x);
        assert_eq!(x, vec![0.125, 0.375, 0.5]);
    }

    #[test]
    fn distances() {
        assert_eq!(chi_squared(&[0.5, 0.5], &[0.5, 0.5]), 0.0);
        assert_eq!(chi_squared(&[0.0, 0.5, 0.5], &[0.0, 0.25, 0.75]), 0.25 + 0.0625 / 0.75);
        // Unexpected signal is charged against the smallest expectation
        assert_eq!(chi_squared(&[0.2, 0.4], &[0.0, 0.4]), 0.5);
        assert!(chi_squared(&[0.2], &[0.0]).is_infinite());
    }
}
