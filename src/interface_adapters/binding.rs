// Three-pass request binding: path, then query, then JSON body, each overlaid
// on the serialized zero value of the request type and decoded once at the end.
// Path and query values stay text until the decode, where the target field type
// decides how to read them.

use crate::interface_adapters::errors::ClassifiedError;
use axum::body::{Body, Bytes};
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize, forward_to_deserialize_any};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("{0}")]
    Path(String),
    #[error("{0}")]
    Query(String),
    #[error("{0}")]
    Body(String),
    #[error("{0}")]
    Decode(#[source] serde_json::Error),
    #[error("request type cannot be zero-valued: {0}")]
    ZeroValue(#[source] serde_json::Error),
    #[error("request type must serialize as a JSON object")]
    NotAnObject,
}

impl ClassifiedError for BindError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            BindError::ZeroValue(_) | BindError::NotAnObject => {
                Some(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => Some(StatusCode::BAD_REQUEST),
        }
    }
}

pub(crate) type Fields = Map<String, Value>;

// The overwrite target shared by all passes. `text_keys` holds the keys whose
// current value came from the path or the query string.
#[derive(Debug, Default)]
pub(crate) struct Bound {
    fields: Fields,
    text_keys: HashSet<String>,
}

/// Bind `Req` from every source of the request, in precedence order.
pub(crate) async fn bind<Req, S>(mut parts: Parts, body: Body, state: &S) -> Result<Req, BindError>
where
    Req: Default + Serialize + DeserializeOwned,
    S: Send + Sync,
{
    let mut bound = match zero_value::<Req>()? {
        Some(bound) => bound,
        // Nothing to bind into.
        None => return Ok(Req::default()),
    };

    bind_path(&mut parts, state, &mut bound).await?;
    bind_query(&parts, &mut bound)?;

    let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
        .await
        .map_err(|rejection| BindError::Body(rejection.body_text()))?;
    bind_body(&bytes, &mut bound)?;

    decode(bound)
}

// `Ok(None)` means the request type has no fields at all (e.g. `()`).
fn zero_value<Req>() -> Result<Option<Bound>, BindError>
where
    Req: Default + Serialize,
{
    match serde_json::to_value(Req::default()).map_err(BindError::ZeroValue)? {
        Value::Object(fields) => Ok(Some(Bound {
            fields,
            text_keys: HashSet::new(),
        })),
        Value::Null => Ok(None),
        _ => Err(BindError::NotAnObject),
    }
}

async fn bind_path<S>(parts: &mut Parts, state: &S, bound: &mut Bound) -> Result<(), BindError>
where
    S: Send + Sync,
{
    let params = match RawPathParams::from_request_parts(parts, state).await {
        Ok(params) => params,
        // Routes without captures, or handlers driven outside a router.
        Err(RawPathParamsRejection::MissingPathParams(_)) => return Ok(()),
        Err(rejection) => return Err(BindError::Path(rejection.body_text())),
    };

    overlay_text(bound, params.iter());
    Ok(())
}

pub(crate) fn bind_query(parts: &Parts, bound: &mut Bound) -> Result<(), BindError> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
        .map_err(|rejection| BindError::Query(rejection.body_text()))?;

    overlay_text(
        bound,
        pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())),
    );
    Ok(())
}

pub(crate) fn bind_body(bytes: &[u8], bound: &mut Bound) -> Result<(), BindError> {
    // An absent body leaves every field as it is.
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }

    let value: Value =
        serde_json::from_slice(bytes).map_err(|err| BindError::Body(err.to_string()))?;

    match value {
        Value::Object(body) => {
            for (key, value) in body {
                bound.text_keys.remove(&key);
                bound.fields.insert(key, value);
            }
            Ok(())
        }
        Value::Null => Ok(()),
        other => Err(BindError::Body(format!(
            "expected a JSON object body, found {}",
            json_kind(&other)
        ))),
    }
}

pub(crate) fn decode<Req: DeserializeOwned>(bound: Bound) -> Result<Req, BindError> {
    Req::deserialize(bound).map_err(BindError::Decode)
}

// A key seen once binds as a string, a repeated key as an array of strings.
fn overlay_text<'a>(bound: &mut Bound, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) {
    let mut grouped: HashMap<&str, Vec<&str>> = HashMap::new();
    for (key, raw) in pairs {
        grouped.entry(key).or_default().push(raw);
    }

    for (key, mut values) in grouped {
        let value = if values.len() == 1 {
            Value::String(values.remove(0).to_string())
        } else {
            Value::Array(
                values
                    .into_iter()
                    .map(|raw| Value::String(raw.to_string()))
                    .collect(),
            )
        };
        bound.fields.insert(key.to_string(), value);
        bound.text_keys.insert(key.to_string());
    }
}

impl Bound {
    // Text keys the target does not declare are dropped, so extra query
    // parameters never trip `deny_unknown_fields`.
    fn visit<'de, V: Visitor<'de>>(
        self,
        known: Option<&'static [&'static str]>,
        visitor: V,
    ) -> Result<V::Value, serde_json::Error> {
        let Bound { fields, text_keys } = self;
        let entries = fields.into_iter().filter_map(|(key, value)| {
            let text = text_keys.contains(&key);
            if text && known.is_some_and(|known| !known.iter().any(|name| *name == key)) {
                return None;
            }
            Some((key, FieldValue { value, text }))
        });

        let mut map = MapDeserializer::<_, serde_json::Error>::new(entries);
        let value = visitor.visit_map(&mut map)?;
        map.end()?;
        Ok(value)
    }
}

impl<'de> Deserializer<'de> for Bound {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.visit(None, visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.visit(Some(fields), visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

// One field of the merged target. Text values are read the way form decoders
// read them: numbers and booleans are parsed when the field asks for one.
struct FieldValue {
    value: Value,
    text: bool,
}

impl FieldValue {
    // Scalar view of a text value; a repeated key binds its first occurrence.
    fn into_scalar(self) -> Result<String, Value> {
        match self.value {
            Value::String(raw) if self.text => Ok(raw),
            Value::Array(items) if self.text => match items.into_iter().next() {
                Some(Value::String(raw)) => Ok(raw),
                other => Err(other.unwrap_or(Value::Null)),
            },
            value => Err(value),
        }
    }

    fn visit_text_seq<'de, V: Visitor<'de>>(
        items: Vec<Value>,
        visitor: V,
    ) -> Result<V::Value, serde_json::Error> {
        let mut seq = SeqDeserializer::<_, serde_json::Error>::new(
            items
                .into_iter()
                .map(|value| FieldValue { value, text: true }),
        );
        let value = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(value)
    }
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for FieldValue {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_signed {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.into_scalar() {
                Ok(raw) if raw.is_empty() => visitor.visit_i64(0),
                Ok(raw) => match (raw.parse::<i64>(), raw.parse::<u64>()) {
                    (Ok(int), _) => visitor.visit_i64(int),
                    (_, Ok(uint)) => visitor.visit_u64(uint),
                    _ => Err(de::Error::invalid_value(Unexpected::Str(&raw), &visitor)),
                },
                Err(value) => value.$method(visitor),
            }
        }
    )*};
}

macro_rules! deserialize_unsigned {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.into_scalar() {
                Ok(raw) if raw.is_empty() => visitor.visit_u64(0),
                Ok(raw) => match (raw.parse::<u64>(), raw.parse::<i64>()) {
                    (Ok(uint), _) => visitor.visit_u64(uint),
                    (_, Ok(int)) => visitor.visit_i64(int),
                    _ => Err(de::Error::invalid_value(Unexpected::Str(&raw), &visitor)),
                },
                Err(value) => value.$method(visitor),
            }
        }
    )*};
}

macro_rules! deserialize_float {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.into_scalar() {
                Ok(raw) if raw.is_empty() => visitor.visit_f64(0.0),
                Ok(raw) => match raw.parse::<f64>() {
                    Ok(float) => visitor.visit_f64(float),
                    Err(_) => Err(de::Error::invalid_value(Unexpected::Str(&raw), &visitor)),
                },
                Err(value) => value.$method(visitor),
            }
        }
    )*};
}

macro_rules! forward_to_value {
    ($($method:ident($($arg:ident: $ty:ty),*);)*) => {$(
        fn $method<V: Visitor<'de>>(self, $($arg: $ty,)* visitor: V) -> Result<V::Value, Self::Error> {
            self.value.$method($($arg,)* visitor)
        }
    )*};
}

impl<'de> Deserializer<'de> for FieldValue {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Array(items) if self.text => Self::visit_text_seq(items, visitor),
            value => value.deserialize_any(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.into_scalar() {
            Ok(raw) => match raw.as_str() {
                "1" | "t" | "T" | "true" | "TRUE" | "True" => visitor.visit_bool(true),
                "" | "0" | "f" | "F" | "false" | "FALSE" | "False" => visitor.visit_bool(false),
                _ => Err(de::Error::invalid_value(Unexpected::Str(&raw), &visitor)),
            },
            Err(value) => value.deserialize_bool(visitor),
        }
    }

    deserialize_signed! { deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 }
    deserialize_unsigned! { deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 }
    deserialize_float! { deserialize_f32 deserialize_f64 }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.into_scalar() {
            Ok(raw) => Value::String(raw).deserialize_char(visitor),
            Err(value) => value.deserialize_char(visitor),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.into_scalar() {
            Ok(raw) => visitor.visit_string(raw),
            Err(value) => value.deserialize_string(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        if self.value.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Array(items) if self.text => Self::visit_text_seq(items, visitor),
            Value::String(raw) if self.text => {
                Self::visit_text_seq(vec![Value::String(raw)], visitor)
            }
            value => value.deserialize_seq(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.into_scalar() {
            Ok(raw) => Value::String(raw).deserialize_enum(name, variants, visitor),
            Err(value) => value.deserialize_enum(name, variants, visitor),
        }
    }

    forward_to_value! {
        deserialize_bytes();
        deserialize_byte_buf();
        deserialize_unit();
        deserialize_unit_struct(name: &'static str);
        deserialize_tuple(len: usize);
        deserialize_tuple_struct(name: &'static str, len: usize);
        deserialize_map();
        deserialize_struct(name: &'static str, fields: &'static [&'static str]);
        deserialize_identifier();
        deserialize_ignored_any();
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
