// Channel Properties
// Typed property values as decoded from a TDMS channel object

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TDMS timestamp: whole seconds since 1904-01-01 00:00 UTC plus
/// positive fractions of a second in units of 2^-64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub fractions: u64,
}

impl Timestamp {
    /// Seconds between the TDMS epoch (1904) and the Unix epoch (1970).
    pub const UNIX_EPOCH_OFFSET: i64 = 2_082_844_800;

    pub fn as_unix_seconds(&self) -> f64 {
        (self.seconds - Self::UNIX_EPOCH_OFFSET) as f64
            + self.fractions as f64 / 18_446_744_073_709_551_616.0
    }
}

/// A single property value.
///
/// The JSON form is untagged; integers decode to the narrowest of
/// `I32`/`I64`/`U64` that holds them and every other number decodes to `F64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    Timestamp(Timestamp),
    I8(i8),
    I16(i16),
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
}

impl PropertyValue {
    /// Numeric value widened to `f64`. `None` for strings, booleans and timestamps.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            PropertyValue::I8(v) => Some(v as f64),
            PropertyValue::I16(v) => Some(v as f64),
            PropertyValue::I32(v) => Some(v as f64),
            PropertyValue::I64(v) => Some(v as f64),
            PropertyValue::U8(v) => Some(v as f64),
            PropertyValue::U16(v) => Some(v as f64),
            PropertyValue::U32(v) => Some(v as f64),
            PropertyValue::U64(v) => Some(v as f64),
            PropertyValue::F32(v) => Some(v as f64),
            PropertyValue::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Integer value. Floats are accepted when they hold an integral value,
    /// since some writers store every numeric property as a double.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            PropertyValue::I8(v) => Some(v as i64),
            PropertyValue::I16(v) => Some(v as i64),
            PropertyValue::I32(v) => Some(v as i64),
            PropertyValue::I64(v) => Some(v),
            PropertyValue::U8(v) => Some(v as i64),
            PropertyValue::U16(v) => Some(v as i64),
            PropertyValue::U32(v) => Some(v as i64),
            PropertyValue::U64(v) => i64::try_from(v).ok(),
            PropertyValue::F32(v) if v.fract() == 0.0 && v.is_finite() => Some(v as i64),
            PropertyValue::F64(v)
                if v.fract() == 0.0 && v.is_finite() && v.abs() < i64::MAX as f64 =>
            {
                Some(v as i64)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            PropertyValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match *self {
            PropertyValue::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::I8(_) => "i8",
            PropertyValue::I16(_) => "i16",
            PropertyValue::I32(_) => "i32",
            PropertyValue::I64(_) => "i64",
            PropertyValue::U8(_) => "u8",
            PropertyValue::U16(_) => "u16",
            PropertyValue::U32(_) => "u32",
            PropertyValue::U64(_) => "u64",
            PropertyValue::F32(_) => "f32",
            PropertyValue::F64(_) => "f64",
            PropertyValue::String(_) => "string",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Timestamp(_) => "timestamp",
        }
    }
}

macro_rules! impl_from_value {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for PropertyValue {
                fn from(v: $t) -> Self {
                    PropertyValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_value!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64, bool => Bool, String => String,
    Timestamp => Timestamp,
);

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

/// Property mapping of one channel, keyed by property name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelProperties {
    values: BTreeMap<String, PropertyValue>,
}

impl ChannelProperties {
    pub fn new() -> Self {
        ChannelProperties::default()
    }

    pub fn insert<K: Into<String>, V: Into<PropertyValue>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style insert, handy when assembling properties in code.
    pub fn with<K: Into<String>, V: Into<PropertyValue>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for ChannelProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = ChannelProperties::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

/// A raw sample type that can be widened to `f64` before scaling.
pub trait RawSample: Copy {
    fn to_f64(self) -> f64;
}

macro_rules! impl_raw_sample {
    ($($t:ty),*) => {
        $(
            impl RawSample for $t {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_raw_sample!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// Widen a raw channel array to `f64`.
pub fn widen<T: RawSample>(raw: &[T]) -> Vec<f64> {
    raw.iter().map(|&v| v.to_f64()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_widening() {
        assert_eq!(PropertyValue::from(3i8).as_f64(), Some(3.0));
        assert_eq!(PropertyValue::from(0xFFFF_FFFFu32).as_i64(), Some(4_294_967_295));
        assert_eq!(PropertyValue::from(2.5f32).as_f64(), Some(2.5));
        assert_eq!(PropertyValue::from(4.0f64).as_i64(), Some(4));
        assert_eq!(PropertyValue::from(4.5f64).as_i64(), None);
        assert_eq!(PropertyValue::from("Linear").as_f64(), None);
        assert_eq!(PropertyValue::from(true).as_i64(), None);
    }

    #[test]
    fn test_json_values() {
        let props: ChannelProperties = serde_json::from_str(
            r#"{
                "NI_Scale[0]_Scale_Type": "Linear",
                "NI_Scale[0]_Linear_Slope": 2.0,
                "NI_Scale[0]_Linear_Input_Source": 4294967295,
                "NI_Scale[0]_RTD_B": -5.775e-7,
                "wf_start_time": {"seconds": 3786825600, "fractions": 0},
                "flag": true
            }"#,
        )
        .unwrap();

        assert_eq!(props.len(), 6);
        assert_eq!(
            props.get("NI_Scale[0]_Scale_Type").and_then(|v| v.as_str()),
            Some("Linear")
        );
        assert_eq!(
            props.get("NI_Scale[0]_Linear_Input_Source"),
            Some(&PropertyValue::I64(4_294_967_295))
        );
        assert_eq!(
            props.get("NI_Scale[0]_RTD_B"),
            Some(&PropertyValue::F64(-5.775e-7))
        );
        assert!(props
            .get("wf_start_time")
            .and_then(|v| v.as_timestamp())
            .is_some());
        assert_eq!(props.get("flag").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn test_timestamp_unix_conversion() {
        let t = Timestamp {
            seconds: Timestamp::UNIX_EPOCH_OFFSET + 10,
            fractions: 1u64 << 63,
        };
        assert_eq!(t.as_unix_seconds(), 10.5);
    }

    #[test]
    fn test_widen() {
        assert_eq!(widen(&[1i32, -2, 3]), vec![1.0, -2.0, 3.0]);
        assert_eq!(widen(&[0.5f32]), vec![0.5]);
        assert!(widen::<u16>(&[]).is_empty());
    }
}
