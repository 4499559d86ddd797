//! Convex combination of two feasible points.
//!
//! Every row of the allocation model is linear and every bound is a box, so any
//! `lambda` in `[0, 1]` yields another feasible point without re-solving. Values
//! outside that range are passed through unclamped; the result may then break a bound.

use crate::error::AnalysisError;

/// Midpoint weight used when the caller has no preference
pub const DEFAULT_LAMBDA: f64 = 0.5;

/// `lambda * a[k] + (1 - lambda) * b[k]` for every `k`
pub fn combine(a: &[f64], b: &[f64], lambda: f64) -> Result<Vec<f64>, AnalysisError> {
    if a.len() != b.len() {
        return Err(AnalysisError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| lambda * x + (1.0 - lambda) * y)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: [f64; 4] = [1.5, 0.0, 2.0, 16.0];
    const B: [f64; 4] = [0.5, 2.0, 0.0, 12.0];

    #[test]
    fn test_combine_with_itself_is_identity() {
        assert_eq!(combine(&A, &A, DEFAULT_LAMBDA).unwrap(), A.to_vec());
    }

    #[test]
    fn test_combine_endpoints() {
        assert_eq!(combine(&A, &B, 1.0).unwrap(), A.to_vec());
        assert_eq!(combine(&A, &B, 0.0).unwrap(), B.to_vec());
    }

    #[test]
    fn test_combine_midpoint() {
        assert_eq!(combine(&A, &B, 0.5).unwrap(), vec![1.0, 1.0, 1.0, 14.0]);
    }

    #[test]
    fn test_combine_does_not_clamp_lambda() {
        let extrapolated = combine(&A, &B, 2.0).unwrap();
        assert_eq!(extrapolated[1], -2.0);
    }

    #[test]
    fn test_combine_rejects_length_mismatch() {
        let err = combine(&A, &B[..3], 0.5).unwrap_err();
        assert!(matches!(err, AnalysisError::DimensionMismatch { left: 4, right: 3 }));

        let err = combine(&B[..3], &A, 0.5).unwrap_err();
        assert!(matches!(err, AnalysisError::DimensionMismatch { left: 3, right: 4 }));
    }
}
