//! Serialization of decode results.
//!
//! Trees serialize as maps in insertion order and values as their plain
//! payload, so a decoded packet turns into e.g. JSON directly:
//! `{"header": {"id": 7}, "payload": [1, 2]}`.

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{tree::NamedTree, value::Value};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::Bytes(bytes) => serializer.collect_seq(bytes),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Tree(tree) => tree.serialize(serializer),
        }
    }
}

impl Serialize for NamedTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.entries();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
