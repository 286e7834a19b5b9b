//! Structural serializer producing a `serde_json::Value` with wire field names.
//!
//! Mirrors `serde_json::value::Serializer`, except that struct fields pass
//! through the [`MixinTable`] on the way out: renamed by the naming strategy
//! or an explicit mix-in name, or dropped when a mix-in ignores them. Map
//! keys are left untouched.
//!
//! `is_human_readable` reports `false` in compact mode, which is how types
//! with a verbose and a compact layout (the instance record) pick one.

use serde::ser::{self, Serialize};
use serde_json::{Map, Value};

use super::mixin::{Mixin, MixinTable};

type Error = serde_json::Error;

#[derive(Clone, Copy)]
pub(crate) struct WireSerializer<'a> {
    table: &'a MixinTable,
    compact: bool,
}

impl<'a> WireSerializer<'a> {
    pub(crate) fn new(table: &'a MixinTable, compact: bool) -> Self {
        Self { table, compact }
    }

    fn to_value<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, Error> {
        value.serialize(self)
    }
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(key.to_owned(), value);
    Value::Object(map)
}

impl<'a> ser::Serializer for WireSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SeqCollector<'a>;
    type SerializeTuple = SeqCollector<'a>;
    type SerializeTupleStruct = SeqCollector<'a>;
    type SerializeTupleVariant = VariantSeqCollector<'a>;
    type SerializeMap = MapCollector<'a>;
    type SerializeStruct = StructCollector<'a>;
    type SerializeStructVariant = VariantStructCollector<'a>;

    fn is_human_readable(&self) -> bool {
        !self.compact
    }

    fn serialize_bool(self, v: bool) -> Result<Value, Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Error> {
        Ok(Value::from(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Error> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Error> {
        Ok(Value::Array(v.iter().copied().map(Value::from).collect()))
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        Ok(single_entry(variant, self.to_value(value)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqCollector<'a>, Error> {
        Ok(SeqCollector {
            ser: self,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqCollector<'a>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqCollector<'a>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqCollector<'a>, Error> {
        Ok(VariantSeqCollector {
            variant,
            seq: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapCollector<'a>, Error> {
        Ok(MapCollector {
            ser: self,
            map: Map::new(),
            pending_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<StructCollector<'a>, Error> {
        Ok(StructCollector {
            ser: self,
            mixin: self.table.get(name),
            map: Map::new(),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantStructCollector<'a>, Error> {
        Ok(VariantStructCollector {
            variant,
            fields: StructCollector {
                ser: self,
                mixin: None,
                map: Map::new(),
            },
        })
    }
}

pub(crate) struct SeqCollector<'a> {
    ser: WireSerializer<'a>,
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqCollector<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.items.push(self.ser.to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqCollector<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqCollector<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct VariantSeqCollector<'a> {
    variant: &'static str,
    seq: SeqCollector<'a>,
}

impl ser::SerializeTupleVariant for VariantSeqCollector<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(&mut self.seq, value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(single_entry(self.variant, ser::SerializeSeq::end(self.seq)?))
    }
}

pub(crate) struct MapCollector<'a> {
    ser: WireSerializer<'a>,
    map: Map<String, Value>,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapCollector<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Error> {
        let key = match self.ser.to_value(key)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(ser::Error::custom(format_args!(
                    "map key must serialize to a string, got {other}"
                )))
            }
        };
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| <Error as ser::Error>::custom("map value serialized before its key"))?;
        self.map.insert(key, self.ser.to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Object(self.map))
    }
}

pub(crate) struct StructCollector<'a> {
    ser: WireSerializer<'a>,
    mixin: Option<&'a Mixin>,
    map: Map<String, Value>,
}

impl ser::SerializeStruct for StructCollector<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), Error> {
        if self.mixin.is_some_and(|m| m.ignores(key)) {
            return Ok(());
        }
        let wire_name = self.ser.table.wire_name(self.mixin, key);
        self.map.insert(wire_name, self.ser.to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Object(self.map))
    }
}

pub(crate) struct VariantStructCollector<'a> {
    variant: &'static str,
    fields: StructCollector<'a>,
}

impl ser::SerializeStructVariant for VariantStructCollector<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), Error> {
        ser::SerializeStruct::serialize_field(&mut self.fields, key, value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(single_entry(self.variant, ser::SerializeStruct::end(self.fields)?))
    }
}
