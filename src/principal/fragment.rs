use {
    crate::{display_json, serutil::bare_if_single, Conditions},
    serde::{ser::Serializer, Serialize},
    serde_json::{Map, Value},
};

pub const AWS: &str = "AWS";
pub const CANONICAL_USER: &str = "CanonicalUser";
pub const FEDERATED: &str = "Federated";
pub const SERVICE: &str = "Service";
pub const STAR: &str = "*";

/// The rendered form of one or more principals: principal kind (`AWS`, `Service`, `Federated`, `CanonicalUser` or
/// `*`) to the values of that kind, plus any conditions the principals require.
///
/// Kinds keep the order in which they were first seen; values keep the order in which they were added and are not
/// deduplicated.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PrincipalPolicyFragment {
    principal_json: Vec<(String, Vec<Value>)>,
    conditions: Conditions,
}

impl PrincipalPolicyFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single<K: Into<String>, V: Into<Value>>(kind: K, value: V) -> Self {
        let mut fragment = Self::new();
        fragment.push(kind, value);
        fragment
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions.merge_all(&conditions);
        self
    }

    pub fn push<K: Into<String>, V: Into<Value>>(&mut self, kind: K, value: V) {
        let kind = kind.into();
        let value = value.into();
        match self.principal_json.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, values)) => values.push(value),
            None => self.principal_json.push((kind, vec![value])),
        }
    }

    /// Folds another fragment into this one: values are concatenated under matching kinds and conditions are merged
    /// per operator and key.
    pub fn merge(&mut self, other: &PrincipalPolicyFragment) {
        for (kind, values) in other.principal_json.iter() {
            for value in values {
                self.push(kind.as_str(), value.clone());
            }
        }
        self.conditions.merge_all(&other.conditions);
    }

    #[inline]
    pub fn get(&self, kind: &str) -> Option<&[Value]> {
        self.principal_json.iter().find(|(k, _)| k == kind).map(|(_, values)| values.as_slice())
    }

    #[inline]
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.principal_json.iter().map(|(k, _)| k.as_str())
    }

    #[inline]
    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.principal_json.is_empty()
    }

    /// True when the fragment names every principal, i.e. renders as the bare string `"*"`.
    #[inline]
    pub fn is_star(&self) -> bool {
        self.get(STAR).is_some()
    }

    /// The `Principal` element: `"*"` when the star kind is present, otherwise a map from kind to values with
    /// one-element lists written bare.
    pub fn to_json(&self) -> Value {
        if self.is_star() {
            return Value::String(STAR.to_string());
        }

        let mut map = Map::new();
        for (kind, values) in self.principal_json.iter() {
            map.insert(kind.clone(), bare_if_single(values));
        }
        Value::Object(map)
    }

    /// Order-insensitive comparison of the principal values (conditions are not compared).
    pub fn same_principals(&self, other: &PrincipalPolicyFragment) -> bool {
        let covers = |a: &PrincipalPolicyFragment, b: &PrincipalPolicyFragment| {
            a.principal_json.iter().all(|(kind, values)| match b.get(kind) {
                Some(other_values) => crate::serutil::same_elements(values, other_values),
                None => false,
            })
        };
        covers(self, other) && covers(other, self)
    }
}

display_json!(PrincipalPolicyFragment);

impl Serialize for PrincipalPolicyFragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::PrincipalPolicyFragment,
        crate::Conditions,
        indoc::indoc,
        pretty_assertions::assert_eq,
        serde_json::json,
    };

    #[test_log::test]
    fn test_merge_concatenates() {
        let mut f = PrincipalPolicyFragment::single("Service", "a.amazonaws.com");
        f.merge(&PrincipalPolicyFragment::single("Service", "b.amazonaws.com"));
        f.merge(&PrincipalPolicyFragment::single("AWS", "arn:aws:iam::111111111111:root"));
        f.merge(&PrincipalPolicyFragment::single("Service", "a.amazonaws.com"));

        assert_eq!(f.kinds().collect::<Vec<_>>(), vec!["Service", "AWS"]);
        assert_eq!(
            serde_json::to_value(&f).unwrap(),
            json!({
                "Service": ["a.amazonaws.com", "b.amazonaws.com", "a.amazonaws.com"],
                "AWS": "arn:aws:iam::111111111111:root"
            })
        );
    }

    #[test_log::test]
    fn test_star() {
        let mut f = PrincipalPolicyFragment::single("*", "*");
        assert!(f.is_star());
        assert_eq!(f.to_string(), r#""*""#);

        f.merge(&PrincipalPolicyFragment::single("AWS", "111111111111"));
        assert_eq!(f.to_string(), r#""*""#);
    }

    #[test_log::test]
    fn test_conditions_merge() {
        let mut c1 = Conditions::new();
        c1.set("StringEquals", json!({"aws:PrincipalOrgID": "o-1234"}));
        let mut c2 = Conditions::new();
        c2.set("StringEquals", json!({"sts:ExternalId": "abc"}));

        let mut f = PrincipalPolicyFragment::single("AWS", "*").with_conditions(c1);
        f.merge(&PrincipalPolicyFragment::single("AWS", "*").with_conditions(c2));
        assert_eq!(
            f.conditions().get("StringEquals"),
            Some(&json!({"aws:PrincipalOrgID": "o-1234", "sts:ExternalId": "abc"}))
        );
        assert_eq!(
            f.to_string(),
            indoc! { r#"
            {
                "AWS": [
                    "*",
                    "*"
                ]
            }"# }
        );
    }

    #[test_log::test]
    fn test_same_principals() {
        let mut a = PrincipalPolicyFragment::single("AWS", "x");
        a.push("Service", "s");
        let mut b = PrincipalPolicyFragment::single("Service", "s");
        b.push("AWS", "x");
        assert!(a.same_principals(&b));

        b.push("AWS", "y");
        assert!(!a.same_principals(&b));
        assert!(!PrincipalPolicyFragment::new().same_principals(&a));
        assert!(PrincipalPolicyFragment::new().is_empty());
    }
}
