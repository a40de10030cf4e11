use crate::destination::Destination;
use crate::runtime::RuntimeError;
use crate::status::StatusCode;

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use indexmap::IndexMap;
use thiserror::Error;

/// The encoding of a message body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// No body at all.
    Message,

    /// Opaque bytes.
    Bytes,

    /// A serialized object.
    Object,

    /// A sequence of typed values.
    Stream,

    /// Named typed fields.
    Map,

    /// A single string.
    Text,
}

impl BodyKind {
    /// The canonical upper-case name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Message => "MESSAGE",
            Self::Bytes => "BYTES",
            Self::Object => "OBJECT",
            Self::Stream => "STREAM",
            Self::Map => "MAP",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a body kind name is not recognised.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown body kind '{0}'")]
pub struct UnknownBodyKind(pub String);

impl FromStr for BodyKind {
    type Err = UnknownBodyKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MESSAGE" => Ok(Self::Message),
            "BYTES" => Ok(Self::Bytes),
            "OBJECT" => Ok(Self::Object),
            "STREAM" => Ok(Self::Stream),
            "MAP" => Ok(Self::Map),
            "TEXT" => Ok(Self::Text),
            _ => Err(UnknownBodyKind(s.to_string())),
        }
    }
}

/// A typed value stored in a map body or a stream body.
#[derive(Clone, Debug, PartialEq)]
pub enum MapValue {
    /// Boolean.
    Bool(bool),

    /// Signed integer.
    Int(i64),

    /// Floating point.
    Double(f64),

    /// UTF-8 string.
    String(String),

    /// Raw bytes.
    Bytes(Bytes),
}

impl fmt::Display for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "bytes({})", b.len()),
        }
    }
}

impl From<&str> for MapValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MapValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for MapValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for MapValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for MapValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

/// Errors reading a map body field.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    /// The map has no field of that name (or no fields at all).
    #[error("map field '{0}' not found")]
    NotFound(String),

    /// The field holds a value that cannot be read as a string.
    #[error("map field '{0}' holds bytes and cannot be read as a string")]
    NotConvertible(String),
}

impl RuntimeError for FieldError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NotFound,
            Self::NotConvertible(_) => StatusCode::MessageFormat,
        }
    }
}

/// Named fields of a map message, enumerated in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapBody {
    fields: IndexMap<String, MapValue>,
}

impl MapBody {
    /// Creates an empty map body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, keeping its original position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<MapValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder form of [`MapBody::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<MapValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Field names in enumeration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Raw access to a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MapValue> {
        self.fields.get(name)
    }

    /// Reads a field as a string, converting scalars.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::NotFound`] for a missing field and
    /// [`FieldError::NotConvertible`] for byte fields.
    pub fn get_string(&self, name: &str) -> Result<String, FieldError> {
        match self.fields.get(name) {
            None => Err(FieldError::NotFound(name.to_string())),
            Some(MapValue::String(s)) => Ok(s.clone()),
            Some(MapValue::Bool(b)) => Ok(b.to_string()),
            Some(MapValue::Int(i)) => Ok(i.to_string()),
            Some(MapValue::Double(d)) => Ok(d.to_string()),
            Some(MapValue::Bytes(_)) => Err(FieldError::NotConvertible(name.to_string())),
        }
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A message body.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// Header and properties only.
    Empty,

    /// Opaque bytes.
    Bytes(Bytes),

    /// A serialized object.
    Object(Bytes),

    /// A sequence of typed values.
    Stream(Vec<MapValue>),

    /// Named typed fields.
    Map(MapBody),

    /// A single string.
    Text(String),
}

impl Body {
    /// The kind tag of this body.
    #[must_use]
    pub const fn kind(&self) -> BodyKind {
        match self {
            Self::Empty => BodyKind::Message,
            Self::Bytes(_) => BodyKind::Bytes,
            Self::Object(_) => BodyKind::Object,
            Self::Stream(_) => BodyKind::Stream,
            Self::Map(_) => BodyKind::Map,
            Self::Text(_) => BodyKind::Text,
        }
    }
}

/// A typed message property, visible to selectors.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// Boolean.
    Bool(bool),

    /// Signed integer.
    Int(i64),

    /// Floating point.
    Double(f64),

    /// UTF-8 string.
    String(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

/// A message: header fields, properties and a body.
///
/// Header fields that the runtime owns (`message_id`, `timestamp`,
/// `destination`) are filled in on send.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// The body.
    pub body: Body,

    /// Correlation id, set on replies to the id of the request.
    pub correlation_id: Option<String>,

    /// Where the message was sent.
    pub destination: Option<Destination>,

    /// Id assigned by the runtime on send.
    pub message_id: Option<String>,

    /// Application properties.
    pub properties: IndexMap<String, PropertyValue>,

    /// Where replies should go.
    pub reply_to: Option<Destination>,

    /// Send time in milliseconds since the epoch.
    pub timestamp: Option<i64>,
}

impl Message {
    /// Creates a message with the given body and empty headers.
    #[must_use]
    pub fn new(body: Body) -> Self {
        Self {
            body,
            correlation_id: None,
            destination: None,
            message_id: None,
            properties: IndexMap::new(),
            reply_to: None,
            timestamp: None,
        }
    }

    /// Creates a text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Body::Text(text.into()))
    }

    /// Creates a map message.
    #[must_use]
    pub fn map(map: MapBody) -> Self {
        Self::new(Body::Map(map))
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// The body kind tag.
    #[must_use]
    pub const fn body_kind(&self) -> BodyKind {
        self.body.kind()
    }
}

fn write_opt<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    value: Option<&T>,
) -> fmt::Result {
    if let Some(value) = value {
        write!(f, " {label}={{{value}}}")?;
    }
    Ok(())
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Message={{ Header={{", self.body_kind())?;
        write_opt(f, "Destination", self.destination.as_ref())?;
        write_opt(f, "MessageID", self.message_id.as_ref())?;
        write_opt(f, "Timestamp", self.timestamp.as_ref())?;
        write_opt(f, "ReplyTo", self.reply_to.as_ref())?;
        write_opt(f, "CorrelationID", self.correlation_id.as_ref())?;
        f.write_str(" }")?;

        if !self.properties.is_empty() {
            f.write_str(" Properties={")?;
            for (name, value) in &self.properties {
                write!(f, " {name}={value}")?;
            }
            f.write_str(" }")?;
        }

        match &self.body {
            Body::Empty => {}
            Body::Bytes(b) | Body::Object(b) => write!(f, " Body={{bytes({})}}", b.len())?,
            Body::Stream(values) => {
                f.write_str(" Stream={")?;
                for value in values {
                    write!(f, " {value}")?;
                }
                f.write_str(" }")?;
            }
            Body::Map(map) => {
                f.write_str(" Fields={")?;
                for (name, value) in &map.fields {
                    write!(f, " {name}={value}")?;
                }
                f.write_str(" }")?;
            }
            Body::Text(text) => write!(f, " Text={{{text:?}}}")?,
        }

        f.write_str(" }")
    }
}
