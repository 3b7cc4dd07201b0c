use {
    log::debug,
    serde::{
        de::{self, value::SeqAccessDeserializer, Deserializer, SeqAccess, Unexpected, Visitor},
        Deserialize,
    },
    serde_json::Value,
    std::fmt::{Formatter, Result as FmtResult},
};

/// Implement Display for a given class by formatting it as pretty-printed JSON.
#[macro_export]
macro_rules! display_json {
    ($cls:ident) => {
        impl std::fmt::Display for $cls {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let buf = Vec::new();
                let serde_formatter = ::serde_json::ser::PrettyFormatter::with_indent(b"    ");
                let mut ser = ::serde_json::Serializer::with_formatter(buf, serde_formatter);
                match ::serde::Serialize::serialize(self, &mut ser) {
                    Ok(()) => (),
                    Err(e) => {
                        ::log::error!("Failed to serialize: {}", e);
                        return Err(::std::fmt::Error {});
                    }
                };
                match std::str::from_utf8(&ser.into_inner()) {
                    Ok(s) => write!(f, "{}", s),
                    Err(e) => {
                        ::log::error!("JSON serialization contained non-UTF-8 characters: {}", e);
                        Err(::std::fmt::Error {})
                    }
                }
            }
        }
    };
}

/// Implement FromStr for a given class by parsing it as JSON.
#[macro_export]
macro_rules! from_str_json {
    ($cls:ident) => {
        impl ::std::str::FromStr for $cls {
            type Err = ::serde_json::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match ::serde_json::from_str::<Self>(s) {
                    Ok(result) => Ok(result),
                    Err(e) => {
                        ::log::debug!("Failed to parse: {}: {:?}", s, e);
                        Err(e)
                    }
                }
            }
        }
    };
}

/// StringList allows a JSON field to be a string or list of strings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StringList {
    Single(String),
    List(Vec<String>),
}

impl StringList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s],
            Self::List(s_list) => s_list,
        }
    }
}

struct StringListVisitor {}

impl<'de> Visitor<'de> for StringListVisitor {
    type Value = StringList;

    fn expecting(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "string or list of strings")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, access: A) -> Result<Self::Value, A::Error> {
        let deserializer = SeqAccessDeserializer::new(access);
        match Vec::<String>::deserialize(deserializer) {
            Ok(l) => Ok(StringList::List(l)),
            Err(e) => {
                debug!("Failed to deserialize string list: {:?}", e);
                Err(<A::Error as de::Error>::invalid_value(Unexpected::Seq, &self))
            }
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(StringList::Single(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StringListVisitor {})
    }
}

/// Renders a list the way IAM writes list-valued elements: a single element is written bare, anything else as an
/// array.
pub(crate) fn bare_if_single(values: &[Value]) -> Value {
    match values {
        [single] => single.clone(),
        many => Value::Array(many.to_vec()),
    }
}

/// Splits a JSON value that may be either a bare element or an array of elements.
pub(crate) fn value_to_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Appends the items of `other` to `target` that `target` does not already contain.
pub(crate) fn union_into<T: Clone + PartialEq>(target: &mut Vec<T>, other: &[T]) {
    for item in other {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

/// Order-insensitive comparison of two lists, ignoring duplicates.
pub(crate) fn same_elements<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.iter().all(|item| b.contains(item)) && b.iter().all(|item| a.contains(item))
}

#[cfg(test)]
mod tests {
    use {
        super::{bare_if_single, same_elements, union_into, value_to_list, StringList},
        pretty_assertions::assert_eq,
        serde::Serialize,
        serde_json::json,
        std::panic::catch_unwind,
    };

    #[test_log::test]
    fn test_string_list() {
        let single: StringList = serde_json::from_str(r#""s3:GetObject""#).unwrap();
        assert_eq!(single, StringList::Single("s3:GetObject".to_string()));
        assert_eq!(single.into_vec(), vec!["s3:GetObject".to_string()]);

        let list: StringList = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(list.into_vec(), vec!["a".to_string(), "b".to_string()]);

        let e = serde_json::from_str::<StringList>("[1]").unwrap_err();
        assert!(e.to_string().starts_with("invalid value: sequence, expected string or list of strings"));

        let e = serde_json::from_str::<StringList>("3").unwrap_err();
        assert!(e.to_string().starts_with("invalid type: integer `3`"));
    }

    #[test_log::test]
    fn test_bare_if_single() {
        assert_eq!(bare_if_single(&[json!("a")]), json!("a"));
        assert_eq!(bare_if_single(&[json!("a"), json!("b")]), json!(["a", "b"]));
        assert_eq!(bare_if_single(&[]), json!([]));
    }

    #[test_log::test]
    fn test_list_helpers() {
        assert_eq!(value_to_list(json!("x")), vec![json!("x")]);
        assert_eq!(
            value_to_list(json!(["x", {"Ref": "AWS::AccountId"}])),
            vec![json!("x"), json!({"Ref": "AWS::AccountId"})]
        );

        let mut target = vec!["a", "b"];
        union_into(&mut target, &["b", "c", "c"]);
        assert_eq!(target, vec!["a", "b", "c"]);

        assert!(same_elements(&["a", "b"], &["b", "a", "a"]));
        assert!(!same_elements(&["a", "b"], &["a"]));
    }

    #[derive(Clone, Debug)]
    struct SerFail {}
    display_json!(SerFail);

    impl Serialize for SerFail {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("Serialization failed"))
        }
    }

    #[test_log::test]
    fn test_ser_fail() {
        let e = catch_unwind(|| SerFail {}.to_string()).unwrap_err();
        let e2 = e.downcast::<String>().unwrap();
        assert!((*e2).contains("a Display implementation returned an error"));
    }
}
