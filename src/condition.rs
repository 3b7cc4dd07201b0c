use {
    crate::{display_json, from_str_json},
    serde::{de::Deserializer, ser::Serializer, Deserialize, Serialize},
    serde_json::{Map, Value},
};

/// The condition keys and values under a single operator, in insertion order.
pub type ConditionMap = Map<String, Value>;

/// The `Condition` element of a statement: a mapping from condition operator (`StringEquals`,
/// `ForAnyValue:StringLike`, ...) to the keys and values tested by that operator.
///
/// Operators are kept as strings since IAM allows set qualifiers and `IfExists` suffixes on any of them. Equality
/// ignores insertion order; serialization follows it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Conditions {
    map: Map<String, Value>,
}

display_json!(Conditions);
from_str_json!(Conditions);

impl<'de> Deserialize<'de> for Conditions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::deserialize(deserializer)?;

        Ok(Self {
            map,
        })
    }
}

impl Serialize for Conditions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.map.serialize(serializer)
    }
}

impl Conditions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value for `operator`, replacing anything previously recorded under it.
    pub fn set<K: Into<String>>(&mut self, operator: K, value: Value) {
        self.map.insert(operator.into(), value);
    }

    /// Merges `value` into the entry for `operator` key by key. Keys already present under the operator are
    /// overwritten; other keys are kept. Non-object values replace the entry.
    pub fn merge<K: Into<String>>(&mut self, operator: K, value: Value) {
        let operator = operator.into();
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = self.map.get_mut(&operator) {
                existing.extend(incoming);
                return;
            }
            self.map.insert(operator, Value::Object(incoming));
        } else {
            self.map.insert(operator, value);
        }
    }

    /// Merges every operator of `other` into this one with [`Conditions::merge`].
    pub fn merge_all(&mut self, other: &Conditions) {
        for (operator, value) in other.iter() {
            self.merge(operator.as_str(), value.clone());
        }
    }

    #[inline]
    pub fn get(&self, operator: &str) -> Option<&Value> {
        self.map.get(operator)
    }

    #[inline]
    pub fn contains_key(&self, operator: &str) -> bool {
        self.map.contains_key(operator)
    }

    #[inline]
    pub fn remove(&mut self, operator: &str) -> Option<Value> {
        self.map.remove(operator)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.map.iter()
    }
}

impl From<ConditionMap> for Conditions {
    fn from(map: ConditionMap) -> Self {
        Self {
            map,
        }
    }
}

impl TryFrom<Value> for Conditions {
    type Error = crate::PolicyError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self {
                map,
            }),
            other => Err(crate::PolicyError::InvalidPolicy(format!("Condition must be an object: {}", other))),
        }
    }
}

impl<'a> IntoIterator for &'a Conditions {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}
