//! Conversion of raw register values into the states reported for a sensor.
//!
//! Every transform receives the values of a description's object names in order. A value that
//! has not been received (yet) shows up as `None` and results in no state rather than an error.

use std::collections::BTreeMap;

use crate::registers::Value;

/// The state reported for a sensor.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum NativeValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(jiff::Timestamp),
}

impl std::fmt::Display for NativeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeValue::Integer(n) => f.write_fmt(format_args!("{}", n)),
            NativeValue::Float(n) => f.write_fmt(format_args!("{}", n)),
            NativeValue::Text(s) => f.write_str(s),
            NativeValue::Timestamp(ts) => f.write_fmt(format_args!("{}", ts)),
        }
    }
}

/// Register values received from the device, keyed by register name.
pub trait ApiResponses {
    fn get(&self, name: &str) -> Option<&Value>;
}

#[derive(Default, Debug, Clone)]
pub struct ResponseValues(BTreeMap<String, Value>);

impl ResponseValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ApiResponses for ResponseValues {
    fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ResponseValues {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

pub type NativeValueFn = fn(&[Option<&Value>]) -> Option<NativeValue>;

fn value_as_state(value: &Value) -> NativeValue {
    match value {
        Value::Float(n) => NativeValue::Float(f64::from(*n)),
        Value::String(s) => NativeValue::Text(s.clone()),
        other => NativeValue::Integer(other.as_integer().unwrap_or_default()),
    }
}

fn first<'a>(values: &[Option<&'a Value>]) -> Option<&'a Value> {
    values.first().copied().flatten()
}

/// Report the first value as is.
pub fn first_value_as_state(values: &[Option<&Value>]) -> Option<NativeValue> {
    first(values).map(value_as_state)
}

/// Report the magnitude of the first value.
///
/// The device counts energy fed into the grid in the negative direction.
pub fn first_value_as_absolute_state(values: &[Option<&Value>]) -> Option<NativeValue> {
    Some(match first_value_as_state(values)? {
        NativeValue::Integer(n) => NativeValue::Integer(n.saturating_abs()),
        NativeValue::Float(n) => NativeValue::Float(n.abs()),
        other => other,
    })
}

/// Report the sum of all values.
///
/// The sum stays an integer unless one of the values is a float.
pub fn sum_values_as_state(values: &[Option<&Value>]) -> Option<NativeValue> {
    let mut integer_sum = 0i64;
    let mut float_sum = 0f64;
    let mut is_float = false;
    for value in values {
        let value = (*value)?;
        match value {
            Value::Float(n) => {
                is_float = true;
                float_sum += f64::from(*n);
            }
            other => integer_sum = integer_sum.checked_add(other.as_integer()?)?,
        }
    }
    Some(if is_float {
        NativeValue::Float(float_sum + integer_sum as f64)
    } else {
        NativeValue::Integer(integer_sum)
    })
}

/// Interpret the first value as seconds since the Unix epoch.
pub fn first_value_as_timestamp(values: &[Option<&Value>]) -> Option<NativeValue> {
    let seconds = first(values)?.as_integer()?;
    let timestamp = jiff::Timestamp::from_second(seconds).ok()?;
    Some(NativeValue::Timestamp(timestamp))
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    strum::Display,
    strum::IntoStaticStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "snake_case")]
pub enum BatteryStatus {
    Normal,
    Charging,
    Discharging,
    Calibrating,
    Balancing,
    Unknown,
}

impl BatteryStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Normal,
            1 => Self::Charging,
            2 => Self::Discharging,
            8 => Self::Calibrating,
            1024 | 2048 => Self::Balancing,
            _ => Self::Unknown,
        }
    }
}

/// All labels a battery status sensor can report.
pub const AVAILABLE_BATTERY_STATUS: &[&str] = <BatteryStatus as strum::VariantNames>::VARIANTS;

/// Map the first value onto a [`BatteryStatus`] label.
pub fn first_value_as_battery_status(values: &[Option<&Value>]) -> Option<NativeValue> {
    let status = match first(values)?.as_integer() {
        Some(code) => BatteryStatus::from_code(code),
        None => BatteryStatus::Unknown,
    };
    Some(NativeValue::Text(status.to_string()))
}

/// Concatenate the bit patterns of all values, each 32 bits wide, least significant bit first.
pub fn values_as_bitfield(values: &[Option<&Value>]) -> Option<NativeValue> {
    let mut bits = String::with_capacity(values.len() * u32::BITS as usize);
    for value in values {
        let word = (*value)?.as_integer()? as u32;
        for bit in 0..u32::BITS {
            bits.push(if word & (1 << bit) == 0 { '0' } else { '1' });
        }
    }
    Some(NativeValue::Text(bits))
}
