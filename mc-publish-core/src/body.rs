//! Request body model.
//!
//! This module provides:
//! - [`RequestBody`]: The closed set of body shapes a request can carry
//! - [`MultiPartForm`]: Ordered `multipart/form-data` parts
//! - [`FormValue`]: Input vocabulary for building forms from loosely-typed fields

use std::fmt;
use std::pin::Pin;

use bytes::{BufMut, Bytes, BytesMut};
use futures::Stream;
use serde::Serialize;
use serde_json::Value;

use crate::file::FileRef;

/// A boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Content type sent with text bodies when the caller sets none.
pub const TEXT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

/// Content type sent with URL-encoded bodies when the caller sets none.
pub const URL_ENCODED_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// A request body.
///
/// The variant is decided once, at construction. Only [`RequestBody::Binary`]
/// and [`RequestBody::Stream`] are streamable, i.e. handed to the transport
/// without re-encoding; every other variant is rendered into a buffer first.
#[derive(Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Binary(Bytes),
    /// A chunked source read as the request is written.
    Stream(ByteStream),
    /// Ordered `key=value` pairs, encoded as `application/x-www-form-urlencoded`.
    UrlEncoded(Vec<(String, String)>),
    /// A `multipart/form-data` form.
    MultiPart(MultiPartForm),
}

impl RequestBody {
    /// Create a streaming body.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        RequestBody::Stream(Box::pin(stream))
    }

    /// Create a URL-encoded body from ordered pairs.
    pub fn url_encoded<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::UrlEncoded(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Serialize `value` as JSON text.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(RequestBody::Text)
    }

    /// Whether the body can be passed through to the transport unbuffered.
    pub fn is_streamable(&self) -> bool {
        matches!(self, RequestBody::Binary(_) | RequestBody::Stream(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Copy the body, if it can be replayed.
    ///
    /// Returns `None` for [`RequestBody::Stream`], whose chunks can only be
    /// read once.
    pub fn try_clone(&self) -> Option<Self> {
        Some(match self {
            RequestBody::Empty => RequestBody::Empty,
            RequestBody::Text(text) => RequestBody::Text(text.clone()),
            RequestBody::Binary(bytes) => RequestBody::Binary(bytes.clone()),
            RequestBody::Stream(_) => return None,
            RequestBody::UrlEncoded(pairs) => RequestBody::UrlEncoded(pairs.clone()),
            RequestBody::MultiPart(form) => RequestBody::MultiPart(form.clone()),
        })
    }

    /// The content type implied by the body shape.
    ///
    /// Multi-part forms return `None` here: their content type carries the
    /// boundary chosen when the form is encoded.
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Text(_) => Some(TEXT_CONTENT_TYPE),
            RequestBody::UrlEncoded(_) => Some(URL_ENCODED_CONTENT_TYPE),
            _ => None,
        }
    }

    /// A short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestBody::Empty => "empty",
            RequestBody::Text(_) => "text",
            RequestBody::Binary(_) => "binary",
            RequestBody::Stream(_) => "stream",
            RequestBody::UrlEncoded(_) => "url_encoded",
            RequestBody::MultiPart(_) => "multipart",
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "RequestBody::Empty"),
            RequestBody::Text(text) => f
                .debug_struct("RequestBody::Text")
                .field("len", &text.len())
                .finish(),
            RequestBody::Binary(bytes) => f
                .debug_struct("RequestBody::Binary")
                .field("len", &bytes.len())
                .finish(),
            RequestBody::Stream(_) => write!(f, "RequestBody::Stream"),
            RequestBody::UrlEncoded(pairs) => f
                .debug_tuple("RequestBody::UrlEncoded")
                .field(pairs)
                .finish(),
            RequestBody::MultiPart(form) => f
                .debug_tuple("RequestBody::MultiPart")
                .field(form)
                .finish(),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_owned())
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Binary(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Binary(Bytes::from(bytes))
    }
}

impl From<MultiPartForm> for RequestBody {
    fn from(form: MultiPartForm) -> Self {
        RequestBody::MultiPart(form)
    }
}

// ============================================================================
// Multi-part forms
// ============================================================================

/// A single part of a multi-part form.
#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    Text(String),
    Binary {
        data: Bytes,
        file_name: Option<String>,
        content_type: Option<String>,
    },
    /// A file read from disk when the form is encoded.
    File(FileRef),
}

impl Part {
    /// The text value, for text parts.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The file name announced in `Content-Disposition`, if any.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Part::Text(_) => None,
            Part::Binary { file_name, .. } => file_name.as_deref(),
            Part::File(file) => file.name(),
        }
    }
}

/// A loosely-typed form field value.
///
/// `Null` stands for an absent value and never becomes a part: many upload
/// APIs reject unexpected empty fields.
#[derive(Clone, Debug, PartialEq)]
pub enum FormValue {
    Null,
    Text(String),
    Binary(Bytes),
    File(FileRef),
    /// Each element becomes its own part under the same field name.
    List(Vec<FormValue>),
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_owned())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Text(value)
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<i64> for FormValue {
    fn from(value: i64) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<u64> for FormValue {
    fn from(value: u64) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<Bytes> for FormValue {
    fn from(value: Bytes) -> Self {
        FormValue::Binary(value)
    }
}

impl From<FileRef> for FormValue {
    fn from(value: FileRef) -> Self {
        FormValue::File(value)
    }
}

impl<T: Into<FormValue>> From<Option<T>> for FormValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FormValue::Null, Into::into)
    }
}

impl<T: Into<FormValue>> From<Vec<T>> for FormValue {
    fn from(values: Vec<T>) -> Self {
        FormValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<&Value> for FormValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FormValue::Null,
            Value::String(s) => FormValue::Text(s.clone()),
            Value::Bool(_) | Value::Number(_) | Value::Object(_) => {
                FormValue::Text(value.to_string())
            }
            Value::Array(items) => FormValue::List(items.iter().map(FormValue::from).collect()),
        }
    }
}

/// An ordered `multipart/form-data` form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiPartForm {
    parts: Vec<(String, Part)>,
}

impl MultiPartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a form from `(name, value)` fields.
    ///
    /// List values produce several parts with the same name; `Null` values are
    /// skipped.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FormValue>,
    {
        let mut form = Self::new();
        for (name, value) in fields {
            form.append(name, value);
        }
        form
    }

    /// Build a form from a JSON object. Non-object values yield an empty form.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_fields(map.iter().map(|(k, v)| (k.as_str(), v))),
            _ => Self::new(),
        }
    }

    /// Append a field, expanding lists and dropping nulls.
    pub fn append<K, V>(&mut self, name: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<FormValue>,
    {
        let name = name.into();
        self.push_value(&name, value.into());
        self
    }

    /// Append a pre-built part.
    pub fn append_part<K: Into<String>>(&mut self, name: K, part: Part) -> &mut Self {
        self.parts.push((name.into(), part));
        self
    }

    fn push_value(&mut self, name: &str, value: FormValue) {
        match value {
            FormValue::Null => {}
            FormValue::Text(text) => self.parts.push((name.to_owned(), Part::Text(text))),
            FormValue::Binary(data) => self.parts.push((
                name.to_owned(),
                Part::Binary {
                    data,
                    file_name: None,
                    content_type: None,
                },
            )),
            FormValue::File(file) => self.parts.push((name.to_owned(), Part::File(file))),
            FormValue::List(values) => {
                for value in values {
                    self.push_value(name, value);
                }
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    /// The first part named `name`.
    pub fn get(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// The first text value named `name`.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Part::as_text)
    }

    /// Every part named `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Part> + 'a {
        self.parts
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Part)> {
        self.parts.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Render the form as `multipart/form-data` (RFC 7578).
    ///
    /// File parts are read from disk here.
    pub async fn encode(&self, boundary: &str) -> std::io::Result<Bytes> {
        let mut buf = BytesMut::new();

        for (name, part) in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(boundary.as_bytes());
            buf.put_slice(b"\r\n");
            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(escape_quoted(name).as_bytes());
            buf.put_slice(b"\"");

            match part {
                Part::Text(text) => {
                    buf.put_slice(b"\r\n\r\n");
                    buf.put_slice(text.as_bytes());
                }
                Part::Binary {
                    data,
                    file_name,
                    content_type,
                } => {
                    put_file_headers(
                        &mut buf,
                        file_name.as_deref(),
                        content_type.as_deref().unwrap_or("application/octet-stream"),
                    );
                    buf.put_slice(data);
                }
                Part::File(file) => {
                    let data = file.read().await?;
                    put_file_headers(&mut buf, file.name(), file.content_type());
                    buf.put_slice(&data);
                }
            }
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        Ok(buf.freeze())
    }
}

fn put_file_headers(buf: &mut BytesMut, file_name: Option<&str>, content_type: &str) {
    if let Some(file_name) = file_name {
        buf.put_slice(b"; filename=\"");
        buf.put_slice(escape_quoted(file_name).as_bytes());
        buf.put_slice(b"\"");
    }
    buf.put_slice(b"\r\nContent-Type: ");
    buf.put_slice(content_type.as_bytes());
    buf.put_slice(b"\r\n\r\n");
}

/// Escape a value placed inside a quoted `Content-Disposition` parameter.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
