//! Codec bridge between plain JSON values and Protocol Buffer bytes
//!
//! Encoding verifies the payload against the message type and serializes it
//! to the binary wire format. Decoding parses the bytes and renders them back
//! as JSON with a fixed set of options:
//!
//! - enums as their string names
//! - 64-bit integers as strings
//! - bytes as base64 strings
//! - default-valued fields always present, empty repeated and map fields included
//! - unset singular message fields present as `null`
//! - field and oneof names in lowerCamelCase JSON form
//! - one virtual field per set oneof, holding the name of the active member

use crate::error::{GbufError, Result};
use crate::schema::{self, FileSchemaLoader, SchemaLoader, SchemaRef};
use bytes::Bytes;
use prost::Message;
use prost_reflect::{
    DeserializeOptions, DynamicMessage, MapKey, MessageDescriptor, OneofDescriptor,
    ReflectMessage, SerializeOptions, Value as ProtoValue,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Options used when turning a decoded message into JSON
pub fn decode_options() -> SerializeOptions {
    SerializeOptions::new()
        .use_enum_numbers(false)
        .stringify_64_bit_integers(true)
        .use_proto_field_name(false)
        .skip_default_fields(false)
}

/// Options used when turning a JSON payload into a message.
///
/// Keys that match no field are ignored.
pub fn encode_options() -> DeserializeOptions {
    DeserializeOptions::new().deny_unknown_fields(false)
}

/// Encodes and decodes messages described by `.proto` files
#[derive(Debug, Clone)]
pub struct ProtoCodec {
    loader: Arc<dyn SchemaLoader>,
}

impl Default for ProtoCodec {
    fn default() -> Self {
        Self::new(Arc::new(FileSchemaLoader::new()))
    }
}

impl ProtoCodec {
    /// Codec resolving schemas through `loader`
    pub fn new(loader: Arc<dyn SchemaLoader>) -> Self {
        Self { loader }
    }

    /// The loader used to resolve schemas
    pub fn loader(&self) -> &Arc<dyn SchemaLoader> {
        &self.loader
    }

    /// Encode `payload` as `schema.message`
    ///
    /// # Errors
    ///
    /// Fails with [`GbufError::SchemaLoad`], [`GbufError::MessageNotFound`] or
    /// [`GbufError::AmbiguousMessage`] if the type cannot be resolved, and with
    /// [`GbufError::Verification`] if the payload does not fit it.
    pub async fn encode(&self, payload: &Value, schema: &SchemaRef) -> Result<Bytes> {
        let desc = schema::resolve(&self.loader, schema).await?;
        encode_message(payload, &desc)
    }

    /// Decode `bytes` as `schema.message`
    ///
    /// # Errors
    ///
    /// Fails if the type cannot be resolved or the bytes are not a valid
    /// encoding of it ([`GbufError::Decode`]).
    pub async fn decode(&self, bytes: &[u8], schema: &SchemaRef) -> Result<Value> {
        let desc = schema::resolve(&self.loader, schema).await?;
        decode_message(bytes, &desc)
    }
}

/// Encode `payload` as `message_name` from the schema at `schema_path`.
///
/// The schema is parsed from disk on every call.
pub async fn encode(
    payload: &Value,
    schema_path: impl AsRef<Path>,
    message_name: &str,
) -> Result<Bytes> {
    ProtoCodec::default()
        .encode(payload, &SchemaRef::new(schema_path.as_ref(), message_name))
        .await
}

/// Decode `bytes` as `message_name` from the schema at `schema_path`.
///
/// The schema is parsed from disk on every call.
pub async fn decode(
    bytes: &[u8],
    schema_path: impl AsRef<Path>,
    message_name: &str,
) -> Result<Value> {
    ProtoCodec::default()
        .decode(bytes, &SchemaRef::new(schema_path.as_ref(), message_name))
        .await
}

/// Verify and encode `payload` against an already resolved descriptor
pub fn encode_message(payload: &Value, desc: &MessageDescriptor) -> Result<Bytes> {
    let verification = |reason: String| GbufError::Verification {
        message: desc.full_name().to_string(),
        reason,
    };

    if !payload.is_object() {
        return Err(verification("object expected".to_string()));
    }

    let message =
        DynamicMessage::deserialize_with_options(desc.clone(), payload, &encode_options())
            .map_err(|e| verification(e.to_string()))?;

    let buf = Bytes::from(message.encode_to_vec());
    debug!(message = desc.full_name(), bytes = buf.len(), "encoded payload");
    Ok(buf)
}

/// Decode `bytes` against an already resolved descriptor
pub fn decode_message(bytes: &[u8], desc: &MessageDescriptor) -> Result<Value> {
    let decode_error = |reason: String| GbufError::Decode {
        message: desc.full_name().to_string(),
        reason,
    };

    let message =
        DynamicMessage::decode(desc.clone(), bytes).map_err(|e| decode_error(e.to_string()))?;

    let mut value = message
        .serialize_with_options(serde_json::value::Serializer, &decode_options())
        .map_err(|e| decode_error(e.to_string()))?;
    complete_object(&message, &mut value);

    debug!(message = desc.full_name(), bytes = bytes.len(), "decoded response");
    Ok(value)
}

/// Add a virtual `<oneofName>: "<member>"` entry for every set oneof and a
/// `null` for every unset singular message field outside a oneof, descending
/// into nested messages, lists and maps.
fn complete_object(message: &DynamicMessage, value: &mut Value) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    let desc = message.descriptor();

    for oneof in desc.oneofs().filter(|oneof| !is_synthetic(oneof)) {
        if let Some(active) = oneof.fields().find(|field| message.has_field(field)) {
            let _ = object.insert(
                camel_case(oneof.name()),
                Value::String(active.json_name().to_string()),
            );
        }
    }

    for field in desc.fields() {
        if !message.has_field(&field) {
            let singular_message = field.kind().as_message().is_some()
                && !field.is_list()
                && !field.is_map()
                && field.containing_oneof().is_none();
            if singular_message {
                let _ = object
                    .entry(field.json_name().to_string())
                    .or_insert(Value::Null);
            }
            continue;
        }
        let Some(slot) = object.get_mut(field.json_name()) else {
            continue;
        };

        match &*message.get_field(&field) {
            ProtoValue::Message(nested) => complete_object(nested, slot),
            ProtoValue::List(items) => {
                if let Some(array) = slot.as_array_mut() {
                    for (item, item_value) in items.iter().zip(array.iter_mut()) {
                        if let ProtoValue::Message(nested) = item {
                            complete_object(nested, item_value);
                        }
                    }
                }
            }
            ProtoValue::Map(entries) => {
                if let Some(map) = slot.as_object_mut() {
                    for (key, entry) in entries {
                        if let (ProtoValue::Message(nested), Some(entry_value)) =
                            (entry, map.get_mut(&map_key_string(key)))
                        {
                            complete_object(nested, entry_value);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// proto3 `optional` fields live in a generated single-member oneof
fn is_synthetic(oneof: &OneofDescriptor) -> bool {
    oneof
        .fields()
        .any(|field| field.field_descriptor_proto().proto3_optional())
}

/// `snake_case` to `lowerCamelCase`: an underscore followed by a lowercase
/// letter is dropped and the letter uppercased.
fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(next) if c == '_' && next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                let _ = chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

fn map_key_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(b) => b.to_string(),
        MapKey::I32(n) => n.to_string(),
        MapKey::I64(n) => n.to_string(),
        MapKey::U32(n) => n.to_string(),
        MapKey::U64(n) => n.to_string(),
        MapKey::String(s) => s.clone(),
    }
}
