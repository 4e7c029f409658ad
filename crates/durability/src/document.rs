//! Document encoding
//!
//! Turns a serializable value into the exact bytes stored for one variant,
//! and back. Encoding always happens fully in memory before any file is
//! touched, so an unrepresentable value never leaves a partial file behind.
//!
//! ## Encoding Rules
//!
//! | Variant | pretty | Output |
//! |---------|--------|--------|
//! | Json | true | indented JSON text (tab by default) |
//! | Json | false | compact JSON text |
//! | Compressed | ignored | zlib stream of compact JSON text |
//!
//! With `sort_keys` every object is emitted with its keys in lexicographic
//! order, so equal values always produce identical bytes.

use crate::codec::Variant;
use crate::finite;
use dictdb_core::{Error, Map, Result, Value};
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::ser::{CompactFormatter, PrettyFormatter, Serializer};
use std::fmt;

/// Default pretty-print indent unit.
pub const DEFAULT_INDENT: &str = "\t";

/// How a document is turned into bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Target file variant
    pub variant: Variant,
    /// Indented output (uncompressed variant only)
    pub pretty: bool,
    /// Indent unit used when `pretty` applies
    pub indent: String,
    /// Emit object keys in sorted order
    pub sort_keys: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            variant: Variant::Json,
            pretty: true,
            indent: DEFAULT_INDENT.to_string(),
            sort_keys: true,
        }
    }
}

impl EncodeOptions {
    /// Compact, unsorted JSON text.
    pub fn compact() -> Self {
        EncodeOptions {
            pretty: false,
            sort_keys: false,
            ..Default::default()
        }
    }

    /// Set the target variant
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Set pretty printing
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set key sorting
    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    /// Set the indent unit
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    fn effective_pretty(&self) -> bool {
        self.pretty && self.variant == Variant::Json
    }
}

/// Convert any serializable value into a [`Value`] tree.
///
/// Anything serde_json refuses (non-string map keys, failing `Serialize`
/// impls) is reported as [`Error::UnsupportedType`], as are NaN and
/// infinite floats, which JSON cannot represent.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    finite::check(value).map_err(Error::unsupported)?;
    serde_json::to_value(value).map_err(Error::unsupported)
}

/// Encode a value into the bytes stored for `options.variant`.
pub fn encode_document<T: Serialize + ?Sized>(value: &T, options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut tree = to_value(value)?;
    if options.sort_keys {
        sort_keys(&mut tree);
    }

    let text = if options.effective_pretty() {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(options.indent.as_bytes());
        let mut ser = Serializer::with_formatter(&mut buf, formatter);
        tree.serialize(&mut ser).map_err(Error::unsupported)?;
        buf
    } else {
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, CompactFormatter);
        tree.serialize(&mut ser).map_err(Error::unsupported)?;
        buf
    };

    Ok(options.variant.codec().encode(&text))
}

/// Decode stored bytes of the given variant.
///
/// `name` is only used for error context.
pub fn decode_document(name: &str, bytes: &[u8], variant: Variant) -> Result<Value> {
    let corrupt = |reason: String| Error::CorruptData {
        name: name.to_string(),
        reason,
    };

    let text = variant
        .codec()
        .decode(bytes)
        .map_err(|e| corrupt(e.to_string()))?;
    serde_json::from_slice(&text).map_err(|e| corrupt(e.to_string()))
}

/// Decode only the top-level entry `key` of stored bytes.
///
/// The document is parsed in one streaming pass. Only the value under
/// `key` is materialized; every other entry is skipped without building a
/// tree. `None` if the root is not a mapping or has no such key. Malformed
/// input anywhere in the document still fails with
/// [`Error::CorruptData`].
pub fn decode_key(name: &str, bytes: &[u8], variant: Variant, key: &str) -> Result<Option<Value>> {
    let corrupt = |reason: String| Error::CorruptData {
        name: name.to_string(),
        reason,
    };

    let text = variant
        .codec()
        .decode(bytes)
        .map_err(|e| corrupt(e.to_string()))?;
    let mut de = serde_json::Deserializer::from_slice(&text);
    let found = KeyLookup(key)
        .deserialize(&mut de)
        .map_err(|e| corrupt(e.to_string()))?;
    de.end().map_err(|e| corrupt(e.to_string()))?;
    Ok(found)
}

struct KeyLookup<'k>(&'k str);

impl<'de, 'k> DeserializeSeed<'de> for KeyLookup<'k> {
    type Value = Option<Value>;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de, 'k> Visitor<'de> for KeyLookup<'k> {
    type Value = Option<Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON document")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        // Last occurrence wins, as in a full decode.
        let mut found = None;
        while let Some(k) = map.next_key::<String>()? {
            if k == self.0 {
                found = Some(map.next_value::<Value>()?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_i64<E: de::Error>(self, _v: i64) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_u64<E: de::Error>(self, _v: u64) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_f64<E: de::Error>(self, _v: f64) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_str<E: de::Error>(self, _v: &str) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }
}

/// Recursively order object keys.
pub fn sort_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (k, mut v) in entries {
                sort_keys(&mut v);
                sorted.insert(k, v);
            }
            *map = sorted;
        }
        Value::Array(items) => items.iter_mut().for_each(sort_keys),
        _ => {}
    }
}
