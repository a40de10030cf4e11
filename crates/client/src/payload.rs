use crate::error::Error;

use courier_messaging::{Body, BodyKind, MapBody, Message, PropertyValue};
use indexmap::IndexMap;

/// What a session sends: a string, the body kind to wrap it in and, for map
/// bodies, the field to store it under.
#[derive(Clone, Debug, PartialEq)]
pub struct Payload {
    kind: BodyKind,
    field_name: String,
    data: String,
    properties: IndexMap<String, PropertyValue>,
}

impl Payload {
    /// Creates a payload of `kind`. `field_name` is only used by map bodies.
    pub fn new(kind: BodyKind, field_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind,
            field_name: field_name.into(),
            data: data.into(),
            properties: IndexMap::new(),
        }
    }

    /// A text payload.
    pub fn text(data: impl Into<String>) -> Self {
        Self::new(BodyKind::Text, "", data)
    }

    /// A map payload with a single field.
    pub fn map(field_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(BodyKind::Map, field_name, data)
    }

    /// Adds a message property.
    #[must_use]
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// The body kind.
    #[must_use]
    pub const fn kind(&self) -> BodyKind {
        self.kind
    }

    /// The string carried by the payload.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Builds the message to send.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedBodyKind`] for anything but text and map.
    pub fn to_message(&self) -> Result<Message, Error> {
        let body = match self.kind {
            BodyKind::Text => Body::Text(self.data.clone()),
            BodyKind::Map => {
                Body::Map(MapBody::new().with(self.field_name.clone(), self.data.clone()))
            }
            other => return Err(Error::UnsupportedBodyKind(other)),
        };

        let mut message = Message::new(body);
        message.properties.clone_from(&self.properties);
        Ok(message)
    }
}

/// Extracts the string a session hands back from a received message.
///
/// Text bodies yield their text. Map bodies yield the value of the first
/// field they enumerate; other fields are ignored.
///
/// # Errors
///
/// Returns [`Error::UnsupportedBodyKind`] for other body kinds, and a runtime
/// error if a map body is empty or its first field is not a string.
pub fn decode(message: &Message) -> Result<String, Error> {
    match &message.body {
        Body::Text(text) => Ok(text.clone()),
        Body::Map(map) => {
            let name = map.names().next().unwrap_or_default();
            map.get_string(name).map_err(Error::runtime)
        }
        other => Err(Error::UnsupportedBodyKind(other.kind())),
    }
}
