//! Bidirectional conversion between the host's dynamic values and the
//! native SDK's typed value trees.
//!
//! The native side is modelled as an explicit tagged union: the SDK adapter
//! classifies each leaf exactly once into a [`Scalar`] variant, and all
//! downstream logic matches on the tag. Decoding is deliberately lenient:
//! a leaf the host cannot represent contributes nothing, it never raises.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// Leaf value as classified at the SDK adapter boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Str(value) => f.write_str(value),
            Scalar::Null => f.write_str("null"),
        }
    }
}

/// Recursive native value tree.
///
/// Ordered child collections are keyed mappings that preserve the source's
/// child order; the store has no positional sequences.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeValue {
    Leaf(Scalar),
    Branch(IndexMap<String, NativeValue>),
}

impl NativeValue {
    pub fn empty_branch() -> Self {
        NativeValue::Branch(IndexMap::new())
    }

    pub fn null() -> Self {
        NativeValue::Leaf(Scalar::Null)
    }

    pub fn has_children(&self) -> bool {
        matches!(self, NativeValue::Branch(children) if !children.is_empty())
    }

    pub fn child(&self, key: &str) -> Option<&NativeValue> {
        match self {
            NativeValue::Branch(children) => children.get(key),
            NativeValue::Leaf(_) => None,
        }
    }

    /// True for `Leaf(Null)` and for branches with no children.
    pub fn is_empty(&self) -> bool {
        match self {
            NativeValue::Leaf(scalar) => matches!(scalar, Scalar::Null),
            NativeValue::Branch(children) => children.is_empty(),
        }
    }
}

/// Converts a host value tree into the native SDK's key-value structure.
///
/// Mappings become branches, sequences become index-keyed branches (the
/// store's representation of ordered collections), scalars pass through.
pub fn to_native(host: &Value) -> NativeValue {
    match host {
        Value::Null => NativeValue::Leaf(Scalar::Null),
        Value::Bool(value) => NativeValue::Leaf(Scalar::Bool(*value)),
        Value::Number(number) => NativeValue::Leaf(classify_number(number)),
        Value::String(value) => NativeValue::Leaf(Scalar::Str(value.clone())),
        Value::Array(items) => {
            let children = items
                .iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), to_native(item)))
                .collect();
            NativeValue::Branch(children)
        }
        Value::Object(map) => {
            let children = map
                .iter()
                .map(|(key, value)| (key.clone(), to_native(value)))
                .collect();
            NativeValue::Branch(children)
        }
    }
}

/// Converts a host mapping into a native children map, for partial updates.
///
/// Non-mapping input yields an empty map.
pub fn to_native_children(host: &Value) -> IndexMap<String, NativeValue> {
    match to_native(host) {
        NativeValue::Branch(children) => children,
        NativeValue::Leaf(_) => IndexMap::new(),
    }
}

fn classify_number(number: &Number) -> Scalar {
    if let Some(int) = number.as_i64() {
        Scalar::Int(int)
    } else if let Some(float) = number.as_f64() {
        Scalar::Float(float)
    } else {
        // u64 above i64::MAX with no f64 representation; treat as unrecognized.
        Scalar::Null
    }
}

/// Recursively transcodes a native tree into a host value.
///
/// Leaves map by variant tag; the native wide integer is truncated to the
/// host runtime's 32-bit integer. `Null` and unrepresentable leaves decode
/// to `None`, and a branch omits any child that decodes to `None` rather
/// than raising.
pub fn from_native(native: &NativeValue) -> Option<Value> {
    match native {
        NativeValue::Leaf(Scalar::Bool(value)) => Some(Value::Bool(*value)),
        NativeValue::Leaf(Scalar::Int(value)) => {
            Some(Value::Number(Number::from(*value as i32)))
        }
        NativeValue::Leaf(Scalar::Float(value)) => Number::from_f64(*value).map(Value::Number),
        NativeValue::Leaf(Scalar::Str(value)) => Some(Value::String(value.clone())),
        NativeValue::Leaf(Scalar::Null) => None,
        NativeValue::Branch(children) => {
            let mut map = Map::with_capacity(children.len());
            for (key, child) in children {
                if let Some(value) = from_native(child) {
                    map.insert(key.clone(), value);
                }
            }
            Some(Value::Object(map))
        }
    }
}

/// [`from_native`] with an absent tree surfaced as host `null`.
pub fn snapshot_to_host(native: &NativeValue) -> Value {
    from_native(native).unwrap_or(Value::Null)
}
