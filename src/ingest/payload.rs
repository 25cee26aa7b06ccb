//! Request body validation.
//!
//! A field that is absent or `null` counts as missing. Present values must
//! have the right JSON type and a physically meaningful range; nothing is
//! coerced from strings.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    comfort::{FeatureInput, FEATURE_NAMES},
    db::NewSensorReading,
};

/// Fields a device must send with every reading.
pub const SENSOR_FIELDS: [&str; 9] = [
    "temp",
    "humidity",
    "illuminance",
    "co2",
    "noise",
    "current",
    "voltage",
    "gas_detection",
    "earthquake",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,
    #[error("Missing fields in sensor data: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Missing one or more required model features: {}", .0.join(", "))]
    MissingFeatures(Vec<&'static str>),
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Any,
    NonNegative,
    Percent,
}

struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn from_body(body: &'a Value) -> Result<Self, ValidationError> {
        body.as_object().map(Fields).ok_or(ValidationError::NotAnObject)
    }

    fn missing(&self, names: &[&'static str]) -> Vec<&'static str> {
        names
            .iter()
            .copied()
            .filter(|name| self.0.get(*name).map_or(true, Value::is_null))
            .collect()
    }

    fn value(&self, field: &'static str) -> Result<&'a Value, ValidationError> {
        match self.0.get(field) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(ValidationError::MissingFields(vec![field])),
        }
    }

    fn number(&self, field: &'static str, bound: Bound) -> Result<f64, ValidationError> {
        let value = self
            .value(field)?
            .as_f64()
            .ok_or_else(|| invalid(field, "expected a number"))?;

        if !value.is_finite() {
            return Err(invalid(field, "expected a finite number"));
        }
        match bound {
            Bound::Any => {}
            Bound::NonNegative if value < 0.0 => {
                return Err(invalid(field, "must not be negative"));
            }
            Bound::Percent if !(0.0..=100.0).contains(&value) => {
                return Err(invalid(field, "must be between 0 and 100"));
            }
            _ => {}
        }
        Ok(value)
    }

    /// Non-negative whole number; `800.0` is accepted as `800`.
    fn count(&self, field: &'static str) -> Result<i64, ValidationError> {
        let value = self.value(field)?;
        let count = match value.as_i64() {
            Some(count) => count,
            None => {
                let raw = value
                    .as_f64()
                    .ok_or_else(|| invalid(field, "expected an integer"))?;
                if raw.fract() != 0.0 || raw.abs() > i64::MAX as f64 {
                    return Err(invalid(field, "expected an integer"));
                }
                raw as i64
            }
        };
        if count < 0 {
            return Err(invalid(field, "must not be negative"));
        }
        Ok(count)
    }

    fn flag(&self, field: &'static str) -> Result<bool, ValidationError> {
        self.value(field)?
            .as_bool()
            .ok_or_else(|| invalid(field, "expected true or false"))
    }

    /// Boolean model input given either as a JSON bool or as 0/1.
    fn flag_as_number(&self, field: &'static str) -> Result<f64, ValidationError> {
        let value = self.value(field)?;
        if let Some(flag) = value.as_bool() {
            return Ok(if flag { 1.0 } else { 0.0 });
        }
        match value.as_f64() {
            Some(raw) if raw == 0.0 || raw == 1.0 => Ok(raw),
            _ => Err(invalid(field, "expected true, false, 0 or 1")),
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

pub fn parse_sensor_payload(body: &Value) -> Result<NewSensorReading, ValidationError> {
    let fields = Fields::from_body(body)?;

    let missing = fields.missing(&SENSOR_FIELDS);
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    Ok(NewSensorReading {
        temp: fields.number("temp", Bound::Any)?,
        humidity: fields.number("humidity", Bound::Percent)?,
        illuminance: fields.number("illuminance", Bound::NonNegative)?,
        co2: fields.count("co2")?,
        noise: fields.number("noise", Bound::NonNegative)?,
        current: fields.number("current", Bound::NonNegative)?,
        voltage: fields.number("voltage", Bound::NonNegative)?,
        gas_detection: fields.flag("gas_detection")?,
        earthquake: fields.flag("earthquake")?,
    })
}

/// Body of a direct prediction request: the six model columns by name.
pub fn parse_feature_payload(body: &Value) -> Result<FeatureInput, ValidationError> {
    let fields = Fields::from_body(body)?;

    let missing = fields.missing(&FEATURE_NAMES);
    if !missing.is_empty() {
        return Err(ValidationError::MissingFeatures(missing));
    }

    Ok(FeatureInput {
        temperature: Some(fields.number("temperatur", Bound::Any)?),
        humidity: Some(fields.number("kelembaban", Bound::Percent)?),
        co2: Some(fields.number("kadar_co2", Bound::NonNegative)?),
        gas_leak: Some(fields.flag_as_number("kebocoran_gas")?),
        illuminance: Some(fields.number("intensitas_cahaya", Bound::NonNegative)?),
        energy_consumption: Some(fields.number("energy_consumption", Bound::NonNegative)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "temp": 22.5,
            "humidity": 55,
            "illuminance": 300,
            "co2": 800,
            "noise": 40,
            "current": 0.5,
            "voltage": 220,
            "gas_detection": false,
            "earthquake": false
        })
    }

    #[test]
    fn parses_a_complete_reading() {
        let reading = parse_sensor_payload(&valid()).unwrap();
        assert_eq!(reading.co2, 800);
        assert_eq!(reading.humidity, 55.0);
        assert_eq!(reading.energy_consumption(), 110.0);
        assert!(!reading.gas_detection);
    }

    #[test]
    fn reports_every_missing_field() {
        let mut body = valid();
        let object = body.as_object_mut().unwrap();
        object.remove("co2");
        object.insert("voltage".into(), Value::Null);

        assert_eq!(
            parse_sensor_payload(&body),
            Err(ValidationError::MissingFields(vec!["co2", "voltage"]))
        );
    }

    #[test]
    fn rejects_wrong_types_and_ranges() {
        let cases = [
            ("temp", json!("22.5")),
            ("humidity", json!(120)),
            ("co2", json!(800.5)),
            ("co2", json!(-1)),
            ("current", json!(-0.1)),
            ("gas_detection", json!(1)),
        ];

        for (field, value) in cases {
            let mut body = valid();
            body[field] = value.clone();
            match parse_sensor_payload(&body) {
                Err(ValidationError::InvalidField { field: f, .. }) => assert_eq!(f, field),
                other => panic!("{field}={value}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn whole_float_co2_is_accepted() {
        let mut body = valid();
        body["co2"] = json!(800.0);
        assert_eq!(parse_sensor_payload(&body).unwrap().co2, 800);
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert_eq!(
            parse_sensor_payload(&json!([1, 2, 3])),
            Err(ValidationError::NotAnObject)
        );
    }

    #[test]
    fn feature_payload_accepts_bool_or_numeric_flag() {
        let mut body = json!({
            "temperatur": 22.5,
            "kelembaban": 55,
            "kadar_co2": 800,
            "kebocoran_gas": true,
            "intensitas_cahaya": 300,
            "energy_consumption": 110
        });
        assert_eq!(parse_feature_payload(&body).unwrap().gas_leak, Some(1.0));

        body["kebocoran_gas"] = json!(0);
        assert_eq!(parse_feature_payload(&body).unwrap().gas_leak, Some(0.0));

        body["kebocoran_gas"] = json!(2);
        assert!(parse_feature_payload(&body).is_err());
    }

    #[test]
    fn feature_payload_lists_missing_features() {
        let body = json!({ "temperatur": 22.5, "kadar_co2": 800 });
        assert_eq!(
            parse_feature_payload(&body),
            Err(ValidationError::MissingFeatures(vec![
                "kelembaban",
                "kebocoran_gas",
                "intensitas_cahaya",
                "energy_consumption"
            ]))
        );
    }
}
