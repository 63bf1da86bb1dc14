//! dict-like value representation of a configuration tree
//!
//! The output model used by the CLI contains the following data types
//! - boolean (true/false)
//! - integer (signed, currently: i64)
//! - decimal (currently: f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map", keyed by string)
//!
//! A tree renders dict-like: a directive becomes a scalar (single value), an
//! array (multiple values) or `true` (bare flag); a section becomes an
//! object. A name that repeats at one level collects into an array in source
//! order, so shadowing stays visible in the output.
use crate::node::{Attr, ConfTree, Kind, NodeRef};
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(indexmap::IndexMap<String, Value>),
}

impl From<&Attr> for Value {
    fn from(value: &Attr) -> Self {
        match value {
            Attr::Str(s) => Value::String(s.clone()),
            Attr::Int(i) => Value::Integer(*i),
            Attr::Float(f) => Value::Decimal(*f),
            Attr::Bool(b) => Value::Boolean(*b),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<&ConfTree> for Value {
    fn from(tree: &ConfTree) -> Self {
        object_of(tree.root())
    }
}

impl<'a> From<NodeRef<'a>> for Value {
    fn from(node: NodeRef<'a>) -> Self {
        match node.kind() {
            Kind::Root | Kind::Section => object_of(node),
            Kind::Directive => scalar_of(node),
        }
    }
}

fn scalar_of(node: NodeRef<'_>) -> Value {
    match node.attrs() {
        [] => Value::Boolean(true),
        [single] => single.into(),
        many => Value::Array(many.iter().map(Value::from).collect()),
    }
}

fn object_of(node: NodeRef<'_>) -> Value {
    let mut object: indexmap::IndexMap<String, Value> = Default::default();

    for child in node.children() {
        let mut key = child.name().unwrap_or_default().to_string();
        if child.kind() == Kind::Section {
            // section selector attrs are part of the key, not the value
            for attr in child.attrs() {
                key.push(' ');
                key.push_str(&attr.to_string());
            }
        }

        let value = Value::from(child);
        match object.entry(key) {
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
            indexmap::map::Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(existing) => existing.push(value),
                existing => {
                    let first = std::mem::replace(existing, Value::Array(Vec::new()));
                    *existing = Value::Array(vec![first, value]);
                }
            },
        }
    }

    Value::Object(object)
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::brace::parse_multipath;
    use crate::node::Source;
    use pretty_assertions::assert_eq;

    fn render(text: &str) -> Value {
        let tree = parse_multipath(Source::from_text("/etc/multipath.conf", text)).unwrap();
        Value::from(&tree)
    }

    #[test]
    fn duplicate_names_collect_into_arrays() {
        let value = render("blacklist {\n  device { vendor \"IBM\" }\n  device { vendor \"HP\" }\n}\n");

        let Value::Object(top) = value else {
            panic!("tree must render as an object")
        };
        let Value::Object(blacklist) = &top["blacklist"] else {
            panic!("section must render as an object")
        };
        let Value::Array(devices) = &blacklist["device"] else {
            panic!("repeated section must render as an array")
        };
        assert_eq!(devices.len(), 2);
    }

    #[test]
    fn directives_render_by_arity() {
        let value = render("defaults {\n  polling_interval 10\n  user_friendly_names yes\n  failback manual\n}\nverbose\n");
        let expected = serde_json::json!({
            "defaults": {
                "polling_interval": 10,
                "user_friendly_names": true,
                "failback": "manual"
            },
            "verbose": true
        });
        assert_eq!(serde_json::to_value(&value).unwrap(), expected);
    }
}
