//! The narrower value union carried across the actuator round-trip
//! (broker <-> fabric <-> RT transport). Only scalars: an actuator target or
//! actual is never an array or a struct.

use vep_core::Value;

/// Scalar-only tagged union for actuator targets/actuals.
#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorValue {
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
}

impl ActuatorValue {
    /// Narrows a full `Value` down to an `ActuatorValue`, widening integers
    /// to the signed/unsigned 64-bit member the way the wire codec widens
    /// them to 32 bits. Returns `None` for arrays, structs, and `Empty` --
    /// callers log the drop once per path, not here, since only the caller
    /// knows the path.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ActuatorValue::Bool(*b)),
            Value::Int8(v) => Some(ActuatorValue::Int64(*v as i64)),
            Value::Int16(v) => Some(ActuatorValue::Int64(*v as i64)),
            Value::Int32(v) => Some(ActuatorValue::Int64(*v as i64)),
            Value::Int64(v) => Some(ActuatorValue::Int64(*v)),
            Value::UInt8(v) => Some(ActuatorValue::UInt64(*v as u64)),
            Value::UInt16(v) => Some(ActuatorValue::UInt64(*v as u64)),
            Value::UInt32(v) => Some(ActuatorValue::UInt64(*v as u64)),
            Value::UInt64(v) => Some(ActuatorValue::UInt64(*v)),
            Value::Float(v) => Some(ActuatorValue::Double(*v as f64)),
            Value::Double(v) => Some(ActuatorValue::Double(*v)),
            Value::String(s) => Some(ActuatorValue::String(s.clone())),
            _ => None,
        }
    }

    /// Widens back to the general `Value` union for fabric publication.
    pub fn to_value(&self) -> Value {
        match self {
            ActuatorValue::Bool(b) => Value::Bool(*b),
            ActuatorValue::Int64(v) => Value::Int64(*v),
            ActuatorValue::UInt64(v) => Value::UInt64(*v),
            ActuatorValue::Double(v) => Value::Double(*v),
            ActuatorValue::String(s) => Value::String(s.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_integers_widen_to_64_bits() {
        assert_eq!(ActuatorValue::from_value(&Value::Int8(-5)), Some(ActuatorValue::Int64(-5)));
        assert_eq!(ActuatorValue::from_value(&Value::UInt16(500)), Some(ActuatorValue::UInt64(500)));
    }

    #[test]
    fn arrays_and_structs_do_not_narrow() {
        assert_eq!(ActuatorValue::from_value(&Value::BoolArray(vec![true])), None);
        assert_eq!(ActuatorValue::from_value(&Value::Empty), None);
    }
}
