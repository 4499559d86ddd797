use crate::error::AnalysisError;
use crate::interpolate::combine;

/// Round to 4 decimal places. Every value that is classified or displayed goes
/// through here so solver jitter below 5e-5 cannot flip a zero test.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Zero after 4-digit rounding; `-0.0` counts
pub fn is_zero(value: f64) -> bool {
    round4(value) == 0.0
}

/// Post-solve snapshot of one variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRecord {
    pub name: String,
    pub value: f64,
    pub is_basic: bool,
    pub reduced_cost: f64,
}

/// Variable values keyed by name, in model order
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolutionVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl SolutionVector {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        Self { names, values }
    }

    pub fn from_records(records: &[VariableRecord]) -> Self {
        Self {
            names: records.iter().map(|r| r.name.clone()).collect(),
            values: records.iter().map(|r| r.value).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// The first `len` entries, used to line an auxiliary vector up with the
    /// primal layout
    pub fn prefix(&self, len: usize) -> SolutionVector {
        let len = len.min(self.len());
        Self {
            names: self.names[..len].to_vec(),
            values: self.values[..len].to_vec(),
        }
    }

    /// `lambda * self + (1 - lambda) * other`, keeping the names.
    ///
    /// Both vectors must have the same length and the same names in the same order.
    pub fn combine(&self, other: &SolutionVector, lambda: f64) -> Result<SolutionVector, AnalysisError> {
        let values = combine(&self.values, &other.values, lambda)?;
        if let Some(i) = self.names.iter().zip(&other.names).position(|(a, b)| a != b) {
            return Err(AnalysisError::LayoutMismatch {
                position: i,
                left: self.names[i].clone(),
                right: other.names[i].clone(),
            });
        }
        Ok(Self {
            names: self.names.clone(),
            values,
        })
    }

    /// Same layout and equal after 4-digit rounding
    pub fn same_point(&self, other: &SolutionVector) -> bool {
        self.names == other.names
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| round4(*a) == round4(*b))
    }

    pub fn rounded(&self) -> SolutionVector {
        Self {
            names: self.names.clone(),
            values: self.values.iter().map(|&v| round4(v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[f64]) -> SolutionVector {
        SolutionVector::new(
            (0..values.len()).map(|i| format!("v_{i}")).collect(),
            values.to_vec(),
        )
    }

    #[test]
    fn test_round4_absorbs_noise() {
        assert_eq!(round4(1.23456), 1.2346);
        assert_eq!(round4(-0.00004), 0.0);
        assert!(is_zero(-0.00004));
        assert!(is_zero(3e-5));
        assert!(!is_zero(6e-5));
    }

    #[test]
    fn test_combine_keeps_names() {
        let a = vector(&[0.0, 4.0]);
        let b = vector(&[2.0, 0.0]);

        let mid = a.combine(&b, 0.5).unwrap();
        assert_eq!(mid.names, a.names);
        assert_eq!(mid.values, vec![1.0, 2.0]);
        assert_eq!(mid.get("v_1"), Some(2.0));
    }

    #[test]
    fn test_combine_rejects_different_layouts() {
        let a = vector(&[1.0, 2.0]);
        let mut b = vector(&[1.0, 2.0]);
        b.names[1] = "other".to_string();

        assert!(matches!(
            a.combine(&b, 0.5),
            Err(AnalysisError::LayoutMismatch { position: 1, .. })
        ));
        assert!(matches!(
            a.combine(&vector(&[1.0]), 0.5),
            Err(AnalysisError::DimensionMismatch { left: 2, right: 1 })
        ));
    }

    #[test]
    fn test_same_point_after_rounding() {
        let a = vector(&[1.0, 2.0]);
        let b = vector(&[1.00001, 2.0]);
        let c = vector(&[1.001, 2.0]);

        assert!(a.same_point(&b));
        assert!(!a.same_point(&c));
        assert_eq!(a.prefix(1).values, vec![1.0]);
    }
}
