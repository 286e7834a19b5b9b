//! Structural deserializer reading a `serde_json::Value` with wire field names.
//!
//! The inverse of [`super::ser::WireSerializer`]: when the target type asks
//! for a struct, incoming keys are mapped back to its declared field names
//! through the [`MixinTable`] before the type's own visitor sees them. Keys of
//! plain maps are passed through unchanged.
//!
//! Enum payloads are handed to `serde_json` as-is; the registry model only
//! uses unit variants.

use serde::de::{self, DeserializeSeed, Deserializer, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};

use super::mixin::MixinTable;

type Error = serde_json::Error;

pub(crate) struct WireDeserializer<'a> {
    value: Value,
    table: &'a MixinTable,
}

impl<'a> WireDeserializer<'a> {
    pub(crate) fn new(value: Value, table: &'a MixinTable) -> Self {
        Self { value, table }
    }
}

impl<'de> Deserializer<'de> for WireDeserializer<'_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Array(items) => visitor.visit_seq(WireSeqAccess {
                items: items.into_iter(),
                table: self.table,
            }),
            Value::Object(map) => visitor.visit_map(WireMapAccess::new(map.into_iter().collect(), self.table)),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.value {
            Value::Object(map) => {
                let entries = rename_incoming(self.table, name, fields, map);
                visitor.visit_map(WireMapAccess::new(entries, self.table))
            }
            other => other.deserialize_struct(name, fields, visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.value.deserialize_enum(name, variants, visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
    }
}

fn rename_incoming(
    table: &MixinTable,
    type_name: &str,
    fields: &'static [&'static str],
    map: Map<String, Value>,
) -> Vec<(String, Value)> {
    map.into_iter()
        .filter_map(|(key, value)| {
            table
                .resolve_incoming(type_name, fields, key)
                .map(|field| (field, value))
        })
        .collect()
}

struct WireSeqAccess<'a> {
    items: std::vec::IntoIter<Value>,
    table: &'a MixinTable,
}

impl<'de> de::SeqAccess<'de> for WireSeqAccess<'_> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Error> {
        match self.items.next() {
            Some(value) => seed.deserialize(WireDeserializer::new(value, self.table)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct WireMapAccess<'a> {
    entries: std::vec::IntoIter<(String, Value)>,
    pending: Option<Value>,
    table: &'a MixinTable,
}

impl<'a> WireMapAccess<'a> {
    fn new(entries: Vec<(String, Value)>, table: &'a MixinTable) -> Self {
        Self {
            entries: entries.into_iter(),
            pending: None,
            table,
        }
    }
}

impl<'de> de::MapAccess<'de> for WireMapAccess<'_> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                seed.deserialize(Value::String(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        let value = self
            .pending
            .take()
            .ok_or_else(|| <Error as de::Error>::custom("map value requested before its key"))?;
        seed.deserialize(WireDeserializer::new(value, self.table))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}
