//! The registry JSON codec.
//!
//! The registry's wire format predates ordinary JSON conventions, so payloads
//! are not exchanged with plain `serde_json`. A [`WireCodec`] applies, all at
//! once:
//!
//! 1. **Field naming**: every struct field is written and read through a
//!    [`FieldNaming`] strategy (snake_case for the registry). Map keys are
//!    left alone.
//! 2. **Root wrapping**: every top-level body is a single-key object named
//!    after the payload's [`WireEntity::ROOT_NAME`], e.g.
//!    `{"applications": {...}}`. Decoding requires and strips that key.
//! 3. **Mix-ins**: per-type field overrides for the applications view and the
//!    instance record (see [`Mixin`]).
//! 4. **Instance layout**: the instance record serializes through its
//!    hand-written fixed layout rather than a field-by-field derive. The
//!    codec's compact flag selects that layout's compact form.
//!
//! Every client produced by one factory shares one codec, so all payloads on
//! those clients follow identical rules.

mod de;
mod mixin;
mod naming;
mod ser;

use registry_model::WireEntity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::CodecError;

pub use mixin::Mixin;
pub use naming::{snake_case, FieldNaming};

use self::de::WireDeserializer;
use self::mixin::MixinTable;
use self::ser::WireSerializer;

/// Media type of every body the codec produces or accepts.
pub const CONTENT_TYPE: &str = "application/json";

/// JSON codec configured for the registry's envelope format.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct WireCodec {
    table: MixinTable,
    wrap_root: bool,
    unwrap_root: bool,
    compact: bool,
}

impl WireCodec {
    /// Starts a codec with no root handling, no mix-ins, snake_case naming,
    /// and verbose output.
    pub fn builder() -> WireCodecBuilder {
        WireCodecBuilder::default()
    }

    /// The codec the registry server expects: snake_case, root wrapped on
    /// both directions, applications and instance mix-ins, verbose instances.
    pub fn registry() -> Self {
        Self::builder()
            .naming(FieldNaming::SnakeCase)
            .wrap_root(true)
            .unwrap_root(true)
            .mixin(Mixin::applications())
            .mixin(Mixin::instance())
            .compact(false)
            .build()
    }

    pub fn naming(&self) -> FieldNaming {
        self.table.naming()
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }

    /// Serializes `payload` into its wire value (wrapped when configured).
    pub fn to_value<T: WireEntity>(&self, payload: &T) -> Result<Value, CodecError> {
        let body = payload.serialize(WireSerializer::new(&self.table, self.compact))?;
        if !self.wrap_root {
            return Ok(body);
        }
        let mut root = Map::with_capacity(1);
        root.insert(T::ROOT_NAME.to_owned(), body);
        Ok(Value::Object(root))
    }

    /// Serializes `payload` into a request body.
    pub fn encode<T: WireEntity>(&self, payload: &T) -> Result<Vec<u8>, CodecError> {
        let value = self.to_value(payload)?;
        Ok(serde_json::to_vec(&value)?)
    }

    /// Reads a payload from its wire value (unwrapping when configured).
    pub fn from_value<T: WireEntity>(&self, value: Value) -> Result<T, CodecError> {
        let body = if self.unwrap_root {
            unwrap_root(value, T::ROOT_NAME)?
        } else {
            value
        };
        Ok(T::deserialize(WireDeserializer::new(body, &self.table))?)
    }

    /// Reads a payload from a response body.
    pub fn decode<T: WireEntity>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        let value: Value = serde_json::from_slice(bytes)?;
        self.from_value(value)
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::registry()
    }
}

fn unwrap_root(value: Value, expected: &'static str) -> Result<Value, CodecError> {
    let Value::Object(mut map) = value else {
        return Err(CodecError::MissingRoot { expected });
    };
    if map.len() == 1 {
        if let Some(inner) = map.remove(expected) {
            return Ok(inner);
        }
    }
    Err(CodecError::RootMismatch {
        expected,
        found: map.keys().cloned().collect(),
    })
}

/// Builder for [`WireCodec`].
#[derive(Debug, Clone, Default)]
pub struct WireCodecBuilder {
    naming: FieldNaming,
    mixins: Vec<Mixin>,
    wrap_root: bool,
    unwrap_root: bool,
    compact: bool,
}

impl WireCodecBuilder {
    pub fn naming(mut self, naming: FieldNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Wrap every serialized payload in `{ROOT_NAME: ...}`.
    pub fn wrap_root(mut self, enabled: bool) -> Self {
        self.wrap_root = enabled;
        self
    }

    /// Require and strip `{ROOT_NAME: ...}` from every decoded payload.
    pub fn unwrap_root(mut self, enabled: bool) -> Self {
        self.unwrap_root = enabled;
        self
    }

    /// Adds a mix-in. A later mix-in for the same type replaces the earlier one.
    pub fn mixin(mut self, mixin: Mixin) -> Self {
        self.mixins.push(mixin);
        self
    }

    /// Selects the compact instance layout.
    pub fn compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    pub fn build(self) -> WireCodec {
        let mut table = MixinTable::new(self.naming);
        for mixin in self.mixins {
            table.insert(mixin);
        }
        tracing::debug!(
            naming = ?self.naming,
            mixins = table.len(),
            wrap_root = self.wrap_root,
            unwrap_root = self.unwrap_root,
            compact = self.compact,
            "Built wire codec"
        );
        WireCodec {
            table,
            wrap_root: self.wrap_root,
            unwrap_root: self.unwrap_root,
            compact: self.compact,
        }
    }
}
