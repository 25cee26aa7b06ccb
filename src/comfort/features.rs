//! Classifier input.
//!
//! The model was fitted on six columns in a fixed order. `FeatureInput` is the
//! partially-known form collected from a request or a stored reading;
//! `FeatureVector` only exists once every slot holds a finite value.

use thiserror::Error;

use crate::db::NewSensorReading;

pub const FEATURE_COUNT: usize = 6;

/// Column names in model order, as used on the wire.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "temperatur",
    "kelembaban",
    "kadar_co2",
    "kebocoran_gas",
    "intensitas_cahaya",
    "energy_consumption",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("Missing model feature: {0}")]
    Missing(&'static str),
    #[error("Model feature {0} is not a finite number")]
    NonFinite(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureInput {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    pub gas_leak: Option<f64>,
    pub illuminance: Option<f64>,
    pub energy_consumption: Option<f64>,
}

impl FeatureInput {
    pub fn from_reading(reading: &NewSensorReading) -> Self {
        Self {
            temperature: Some(reading.temp),
            humidity: Some(reading.humidity),
            co2: Some(reading.co2 as f64),
            gas_leak: Some(if reading.gas_detection { 1.0 } else { 0.0 }),
            illuminance: Some(reading.illuminance),
            energy_consumption: Some(reading.energy_consumption()),
        }
    }

    fn slots(&self) -> [Option<f64>; FEATURE_COUNT] {
        [
            self.temperature,
            self.humidity,
            self.co2,
            self.gas_leak,
            self.illuminance,
            self.energy_consumption,
        ]
    }

    /// Names of the slots that have no value, in model order.
    pub fn missing(&self) -> Vec<&'static str> {
        self.slots()
            .iter()
            .zip(FEATURE_NAMES)
            .filter(|(slot, _)| slot.is_none())
            .map(|(_, name)| name)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

impl TryFrom<&FeatureInput> for FeatureVector {
    type Error = FeatureError;

    fn try_from(input: &FeatureInput) -> Result<Self, Self::Error> {
        let mut values = [0.0; FEATURE_COUNT];
        let slots = input.slots().into_iter().zip(FEATURE_NAMES);
        for ((slot, name), value) in slots.zip(values.iter_mut()) {
            let raw = slot.ok_or(FeatureError::Missing(name))?;
            if !raw.is_finite() {
                return Err(FeatureError::NonFinite(name));
            }
            *value = raw;
        }
        Ok(Self(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> NewSensorReading {
        NewSensorReading {
            temp: 22.5,
            humidity: 55.0,
            illuminance: 300.0,
            co2: 800,
            noise: 40.0,
            current: 0.5,
            voltage: 220.0,
            gas_detection: false,
            earthquake: false,
        }
    }

    #[test]
    fn reading_maps_to_model_order() {
        let input = FeatureInput::from_reading(&reading());
        let vector = FeatureVector::try_from(&input).unwrap();
        assert_eq!(vector.as_array(), &[22.5, 55.0, 800.0, 0.0, 300.0, 110.0]);
    }

    #[test]
    fn gas_leak_becomes_one() {
        let mut values = reading();
        values.gas_detection = true;
        let vector = FeatureVector::try_from(&FeatureInput::from_reading(&values)).unwrap();
        assert_eq!(vector.as_array()[3], 1.0);
    }

    #[test]
    fn first_missing_slot_is_named() {
        let mut input = FeatureInput::from_reading(&reading());
        input.co2 = None;
        input.energy_consumption = None;

        assert_eq!(
            FeatureVector::try_from(&input),
            Err(FeatureError::Missing("kadar_co2"))
        );
        assert_eq!(input.missing(), vec!["kadar_co2", "energy_consumption"]);
    }

    #[test]
    fn non_finite_energy_is_rejected() {
        let mut input = FeatureInput::from_reading(&reading());
        input.energy_consumption = Some(f64::INFINITY);
        assert_eq!(
            FeatureVector::try_from(&input),
            Err(FeatureError::NonFinite("energy_consumption"))
        );
    }
}
