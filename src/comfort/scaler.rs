use anyhow::Result;
use serde::Deserialize;

use super::{
    classifier::{FeatureScaler, ModelLoadError},
    features::{FeatureVector, FEATURE_COUNT},
};

/// Standardisation fitted alongside the model: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ScalerDef")]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

#[derive(Deserialize)]
struct ScalerDef {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl TryFrom<ScalerDef> for StandardScaler {
    type Error = ModelLoadError;

    fn try_from(def: ScalerDef) -> Result<Self, Self::Error> {
        Self::new(def.mean, def.scale)
    }
}

impl StandardScaler {
    pub fn new(
        mean: [f64; FEATURE_COUNT],
        scale: [f64; FEATURE_COUNT],
    ) -> Result<Self, ModelLoadError> {
        Self { mean, scale }.validated()
    }

    /// Rejects non-finite parameters; a zero scale (constant column at fit
    /// time) divides by one instead.
    fn validated(mut self) -> Result<Self, ModelLoadError> {
        if self.mean.iter().chain(self.scale.iter()).any(|v| !v.is_finite()) {
            return Err(ModelLoadError::Shape(
                "scaler parameters must be finite".into(),
            ));
        }
        for scale in self.scale.iter_mut() {
            if *scale == 0.0 {
                *scale = 1.0;
            }
        }
        Ok(self)
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, features: &FeatureVector) -> Result<[f64; FEATURE_COUNT]> {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, value) in features.as_array().iter().enumerate() {
            scaled[i] = (value - self.mean[i]) / self.scale[i];
        }
        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comfort::features::FeatureInput;

    fn vector(values: [f64; FEATURE_COUNT]) -> FeatureVector {
        FeatureVector::try_from(&FeatureInput {
            temperature: Some(values[0]),
            humidity: Some(values[1]),
            co2: Some(values[2]),
            gas_leak: Some(values[3]),
            illuminance: Some(values[4]),
            energy_consumption: Some(values[5]),
        })
        .unwrap()
    }

    #[test]
    fn standardises_each_column() {
        let scaler = StandardScaler::new(
            [20.0, 50.0, 600.0, 0.0, 200.0, 100.0],
            [2.0, 10.0, 100.0, 1.0, 50.0, 10.0],
        )
        .unwrap();

        let scaled = scaler
            .transform(&vector([22.5, 55.0, 800.0, 0.0, 300.0, 110.0]))
            .unwrap();
        assert_eq!(scaled, [1.25, 0.5, 2.0, 0.0, 2.0, 1.0]);
    }

    #[test]
    fn zero_scale_passes_centred_value_through() {
        let scaler = StandardScaler::new([0.0; FEATURE_COUNT], [0.0; FEATURE_COUNT]).unwrap();
        let scaled = scaler.transform(&vector([1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();
        assert_eq!(scaled, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn deserialized_zero_scale_is_replaced() {
        let scaler: StandardScaler =
            serde_json::from_str(r#"{"mean": [0, 0, 0, 0, 0, 0], "scale": [0, 1, 1, 1, 1, 1]}"#)
                .unwrap();
        let scaled = scaler.transform(&vector([3.0, 0.0, 0.0, 0.0, 0.0, 0.0])).unwrap();
        assert_eq!(scaled[0], 3.0);
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        let mut mean = [0.0; FEATURE_COUNT];
        mean[2] = f64::NAN;
        assert!(StandardScaler::new(mean, [1.0; FEATURE_COUNT]).is_err());
    }
}
