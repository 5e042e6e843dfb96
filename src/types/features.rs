//! Fixed-order transaction feature vector
//!
//! The classifier was fit on exactly these six columns in exactly this
//! order, so the vector is backed by an array rather than a `Vec`.

use crate::error::InferenceError;
use serde::{Deserialize, Serialize};

/// Number of model input columns
pub const FEATURE_COUNT: usize = 6;

/// Column names in model input order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["V1", "V2", "V3", "V4", "V5", "Amount"];

/// Position of the transaction amount within the vector
pub const AMOUNT_INDEX: usize = FEATURE_COUNT - 1;

/// `[v1, v2, v3, v4, v5, amount]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Create a vector from all six values in model order
    pub const fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Create a vector from the five anonymized features and the amount
    pub const fn from_parts(v: [f64; 5], amount: f64) -> Self {
        Self([v[0], v[1], v[2], v[3], v[4], amount])
    }

    /// All six values in model order
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Transaction amount
    pub fn amount(&self) -> f64 {
        self.0[AMOUNT_INDEX]
    }

    /// One model input row
    pub fn to_row(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    /// Reject values the classifier cannot meaningfully score.
    ///
    /// Every value must be finite. The amount must be non-negative unless
    /// `allow_negative_amount` is set.
    pub fn validate(&self, allow_negative_amount: bool) -> Result<(), InferenceError> {
        for (name, value) in FEATURE_NAMES.iter().zip(self.0.iter()) {
            if !value.is_finite() {
                return Err(InferenceError::InvalidInput(format!(
                    "{} must be a finite number, got {}",
                    name, value
                )));
            }
        }

        if !allow_negative_amount && self.amount() < 0.0 {
            return Err(InferenceError::InvalidInput(format!(
                "Amount must not be negative, got {}",
                self.amount()
            )));
        }

        Ok(())
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = InferenceError;

    fn try_from(row: &[f64]) -> Result<Self, Self::Error> {
        let values: [f64; FEATURE_COUNT] =
            row.try_into().map_err(|_| InferenceError::InputWidth {
                expected: FEATURE_COUNT,
                actual: row.len(),
            })?;
        Ok(Self(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_fixed() {
        let features = FeatureVector::from_parts([1.0, 2.0, 3.0, 4.0, 5.0], 99.5);

        assert_eq!(features.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 99.5]);
        assert_eq!(features.amount(), 99.5);
        assert_eq!(features.to_row().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_try_from_wrong_width() {
        let short = [0.1, 0.2, 0.3];
        let err = FeatureVector::try_from(&short[..]).unwrap_err();
        assert_eq!(
            err,
            InferenceError::InputWidth {
                expected: 6,
                actual: 3
            }
        );

        let seven = [0.0; 7];
        assert!(FeatureVector::try_from(&seven[..]).is_err());

        let six = [0.0, 0.0, 0.0, 0.0, 0.0, 10.0];
        assert_eq!(FeatureVector::try_from(&six[..]).unwrap().amount(), 10.0);
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let features = FeatureVector::from_parts([0.0; 5], -1.0);

        assert!(matches!(
            features.validate(false),
            Err(InferenceError::InvalidInput(_))
        ));
        assert!(features.validate(true).is_ok());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let features = FeatureVector::new([0.0, f64::NAN, 0.0, 0.0, 0.0, 1.0]);
        let err = features.validate(true).unwrap_err();
        assert!(err.to_string().contains("V2"));

        let features = FeatureVector::new([0.0, 0.0, 0.0, 0.0, 0.0, f64::INFINITY]);
        assert!(features.validate(true).is_err());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let features = FeatureVector::new([-2.3, 1.5, -1.8, 3.2, -0.5, 2000.0]);

        let json = serde_json::to_string(&features).unwrap();
        assert_eq!(json, "[-2.3,1.5,-1.8,3.2,-0.5,2000.0]");
    }
}
