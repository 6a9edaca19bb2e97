pub mod errors;

pub use errors::{ExitPlaceholder, HerculesError, HerculesErrorKind, HerculesResult};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Campaign-wide metadata, identical for every run of a campaign.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// One field value of a parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Total order used for grid keys. `-0.0` and `0.0` compare equal and
    /// numbers sort before text.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => {
                normalize_zero(*left).total_cmp(&normalize_zero(*right))
            }
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(left), Self::Text(right)) => left.cmp(right),
        }
    }
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "'{text}'"),
        }
    }
}

/// Renders a value tuple as `(a, b, c)`.
pub fn format_values(values: &[ParamValue]) -> String {
    let rendered = values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("({rendered})")
}

/// Ordered, named parameter fields of a single run.
///
/// Field order is significant: it defines the key layout of the grid index
/// and the axis order of a dataset. Serialized as a JSON object whose key
/// order is preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterVector {
    fields: Vec<(String, ParamValue)>,
}

impl ParameterVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, appending the field when it is new.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &ParamValue> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_same_fields(&self, other: &Self) -> bool {
        self.len() == other.len() && self.names().eq(other.names())
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterVector
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vector = Self::new();
        for (name, value) in iter {
            vector.insert(name, value);
        }
        vector
    }
}

impl Serialize for ParameterVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParameterVectorVisitor;

        impl<'de> Visitor<'de> for ParameterVectorVisitor {
            type Value = ParameterVector;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a map of parameter names to numbers or strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut vector = ParameterVector::new();
                while let Some((name, value)) = access.next_entry::<String, ParamValue>()? {
                    vector.insert(name, value);
                }
                Ok(vector)
            }
        }

        deserializer.deserialize_map(ParameterVectorVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::{ParamValue, ParameterVector, format_values};
    use std::cmp::Ordering;

    #[test]
    fn parameter_vector_preserves_field_order_through_json() {
        let vector = ParameterVector::new()
            .with("z", 5.0)
            .with("a", 1)
            .with("label", "electron");

        let json = serde_json::to_string(&vector).expect("vector should serialize");
        assert_eq!(json, r#"{"z":5.0,"a":1.0,"label":"electron"}"#);

        let decoded: ParameterVector = serde_json::from_str(&json).expect("vector should parse");
        assert_eq!(decoded, vector);
        assert_eq!(decoded.names().collect::<Vec<_>>(), ["z", "a", "label"]);
    }

    #[test]
    fn integer_json_values_decode_as_numbers() {
        let decoded: ParameterVector =
            serde_json::from_str(r#"{"x": 3, "y": -2.5}"#).expect("vector should parse");
        assert_eq!(decoded.get("x"), Some(&ParamValue::Number(3.0)));
        assert_eq!(decoded.get("y"), Some(&ParamValue::Number(-2.5)));
    }

    #[test]
    fn insert_replaces_existing_field_in_place() {
        let vector = ParameterVector::new().with("x", 1).with("y", 2).with("x", 7);
        assert_eq!(vector.len(), 2);
        assert_eq!(vector.names().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(vector.get("x"), Some(&ParamValue::Number(7.0)));
    }

    #[test]
    fn total_cmp_treats_signed_zero_as_equal_and_numbers_before_text() {
        assert_eq!(
            ParamValue::Number(-0.0).total_cmp(&ParamValue::Number(0.0)),
            Ordering::Equal
        );
        assert_eq!(
            ParamValue::Number(1.0e9).total_cmp(&ParamValue::from("a")),
            Ordering::Less
        );
        assert_eq!(
            format_values(&[ParamValue::Number(1.0), ParamValue::from("b")]),
            "(1, 'b')"
        );
    }
}
