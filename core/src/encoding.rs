//! Request body encoders.
//!
//! Each encoder turns the ordered parameter map into body text plus the
//! headers that describe it. Parameters are emitted in insertion order.

use std::fmt::Display;

use serde::ser::{self, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::call::{Parameters, RequestEncoding};
use crate::config::CompatMode;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const ACCEPT: &str = "Accept";
pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Encoded body and the headers that go with it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBody {
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

/// Parameters are already JSON values (see `Call::parameter`), so encoding
/// itself cannot fail.
pub fn encode(encoding: RequestEncoding, parameters: &Parameters, mode: CompatMode) -> EncodedBody {
    match encoding {
        RequestEncoding::FormData => encode_multipart(parameters, &new_boundary()),
        RequestEncoding::UrlEncoded => encode_urlencoded(parameters, mode),
        RequestEncoding::Json => encode_json(parameters),
    }
}

pub fn new_boundary() -> String {
    format!("Boundary-{}", Uuid::new_v4())
}

pub fn encode_multipart(parameters: &Parameters, boundary: &str) -> EncodedBody {
    let mut body = String::new();
    for (name, value) in parameters {
        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str(&format!(
            "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
        ));
        body.push_str(&stringify(value));
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    EncodedBody {
        headers: vec![(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )],
        body,
    }
}

/// `Legacy` joins pairs verbatim, so `&`, `=` or spaces in a value corrupt the
/// body. `Strict` percent-encodes keys and values.
pub fn encode_urlencoded(parameters: &Parameters, mode: CompatMode) -> EncodedBody {
    let body = parameters
        .iter()
        .map(|(name, value)| {
            let value = stringify(value);
            match mode {
                CompatMode::Legacy => format!("{name}={value}"),
                CompatMode::Strict => format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(&value)
                ),
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    EncodedBody {
        headers: vec![(CONTENT_TYPE, FORM_URLENCODED.to_string())],
        body,
    }
}

pub fn encode_json(parameters: &Parameters) -> EncodedBody {
    EncodedBody {
        headers: vec![
            (CONTENT_TYPE, APPLICATION_JSON.to_string()),
            (ACCEPT, APPLICATION_JSON.to_string()),
        ],
        body: Value::Object(parameters.clone()).to_string(),
    }
}

/// Form value text: strings verbatim, everything else as JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a parameter value to JSON.
///
/// Fails where JSON has no representation: non-finite floats (which
/// `serde_json` would otherwise turn into `null`), map keys that are not
/// strings, and `Serialize` impls that report an error.
pub fn to_json_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, String> {
    value.serialize(FiniteCheck).map_err(|e| e.0)?;
    serde_json::to_value(value).map_err(|e| e.to_string())
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct NotEncodable(String);

impl ser::Error for NotEncodable {
    fn custom<T: Display>(msg: T) -> Self {
        NotEncodable(msg.to_string())
    }
}

/// Walks a value and rejects NaN and infinities anywhere inside it.
#[derive(Clone, Copy)]
struct FiniteCheck;

macro_rules! accept {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(fn $method(self, _: $ty) -> Result<(), NotEncodable> {
            Ok(())
        })*
    };
}

fn check_float(v: f64) -> Result<(), NotEncodable> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(NotEncodable(format!("{v} is not a valid JSON number")))
    }
}

impl Serializer for FiniteCheck {
    type Ok = ();
    type Error = NotEncodable;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    accept! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
        serialize_unit_struct: &'static str,
    }

    fn serialize_f32(self, v: f32) -> Result<(), NotEncodable> {
        check_float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<(), NotEncodable> {
        check_float(v)
    }

    fn serialize_none(self) -> Result<(), NotEncodable> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), NotEncodable> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), NotEncodable> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), NotEncodable> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), NotEncodable> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), NotEncodable> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, NotEncodable> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, NotEncodable> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self, NotEncodable> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, NotEncodable> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, NotEncodable> {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, NotEncodable> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, NotEncodable> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = NotEncodable;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NotEncodable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), NotEncodable> {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = NotEncodable;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NotEncodable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), NotEncodable> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = NotEncodable;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NotEncodable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), NotEncodable> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = NotEncodable;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NotEncodable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), NotEncodable> {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = NotEncodable;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), NotEncodable> {
        key.serialize(*self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NotEncodable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), NotEncodable> {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = NotEncodable;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NotEncodable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), NotEncodable> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = NotEncodable;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NotEncodable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), NotEncodable> {
        Ok(())
    }
}
