use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A single scalar field value.
///
/// `Absent` is the one missing-value sentinel: empty strings, NaN-like
/// placeholders and unknown fields all normalize to it before any comparison,
/// so two "missing" values always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Absent,
    Int(i64),
    Num(OrderedFloat<f64>),
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Absent
    }
}

impl Value {
    /// Parse raw textual input into the narrowest matching variant.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Value::Absent;
        }

        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Int(n);
        }

        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Value::Num(OrderedFloat(n));
            }
            return Value::Absent;
        }

        Value::Text(trimmed.to_string())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Num(n) => Some(n.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Display form for storage backends and logs. `Absent` renders empty.
    pub fn display(&self) -> String {
        match self {
            Value::Absent => String::new(),
            Value::Int(n) => n.to_string(),
            Value::Num(n) => {
                if n.0.fract() == 0.0 && n.0.abs() < 1e15 {
                    format!("{}", n.0 as i64)
                } else {
                    format!("{}", n.0)
                }
            }
            Value::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        if n.is_finite() {
            Value::Num(OrderedFloat(n))
        } else {
            Value::Absent
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_input_narrows() {
        assert_eq!(Value::from_input("42"), Value::Int(42));
        assert_eq!(Value::from_input("4.5"), Value::Num(OrderedFloat(4.5)));
        assert_eq!(Value::from_input("abc"), Value::Text("abc".into()));
        assert_eq!(Value::from_input(""), Value::Absent);
        assert_eq!(Value::from_input("   "), Value::Absent);
    }

    #[test]
    fn nan_normalizes_to_absent() {
        assert_eq!(Value::from(f64::NAN), Value::Absent);
        assert_eq!(Value::from_input("NaN"), Value::Absent);
    }

    #[test]
    fn absent_values_compare_equal() {
        assert_eq!(Value::Absent, Value::from(None::<i64>));
        assert_eq!(Value::from_input(""), Value::Absent);
    }

    #[test]
    fn display_round_trips_integers() {
        assert_eq!(Value::Int(7).display(), "7");
        assert_eq!(Value::Num(OrderedFloat(7.0)).display(), "7");
        assert_eq!(Value::Num(OrderedFloat(7.25)).display(), "7.25");
        assert_eq!(Value::Absent.display(), "");
    }
}
