use minicbor::data::Type;
use minicbor::encode::Write;
use minicbor::{Decoder, Encoder};
use std_alloc::vec::Vec;

use crate::Error;

/// Content-Format number registered for `application/cbor`
pub const CONTENT_FORMAT: u16 = 60;

/// Room reserved when a writer opens its map
const TYPICAL_PAYLOAD: usize = 64;

/// A scalar field of a decoded representation, borrowing the payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
  /// Unsigned integer
  Uint(u64),
  /// Negative integer
  Int(i64),
  /// Simple value other than `false`, `true` and `null`
  Simple(u8),
  /// Text string
  Text(&'a str),
  /// Byte string
  Bytes(&'a [u8]),
  /// Half-precision float, as raw bits
  HalfFloat(u16),
  /// Single-precision float
  Float(f32),
  /// Double-precision float
  Double(f64),
  /// Boolean
  Bool(bool),
  /// `null`
  Null,
  /// A well-formed item with no scalar representation
  /// (array, map, tagged item, chunked string or bignum). It has been skipped.
  Unsupported,
}

/// A value that can be appended to a [`MapWriter`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Repr<'a> {
  /// Unsigned integer
  Uint(u64),
  /// Signed integer
  Int(i64),
  /// Simple value
  Simple(u8),
  /// Text string
  Text(&'a str),
  /// Byte string
  Bytes(&'a [u8]),
  /// Half-precision float, as raw bits
  HalfFloat(u16),
  /// Single-precision float
  Float(f32),
  /// Double-precision float
  Double(f64),
  /// Boolean
  Bool(bool),
}

/// Every write failure of a [`Sink`] is the payload running out of room
fn exhausted<E>(_: minicbor::encode::Error<E>) -> Error {
  Error::OutOfMemory
}

impl<'a> Repr<'a> {
  fn check(&self) -> Result<(), Error> {
    match *self {
      | Repr::Simple(v) if (24..32).contains(&v) => Err(Error::IllegalSimpleType(v)),
      | _ => Ok(()),
    }
  }

  fn encode(&self, e: &mut Encoder<Sink<'_>>) -> Result<(), Error> {
    let encoded = match *self {
      | Repr::Uint(n) => e.u64(n),
      | Repr::Int(n) => e.i64(n),
      | Repr::Simple(20) => e.bool(false),
      | Repr::Simple(21) => e.bool(true),
      | Repr::Simple(22) => e.null(),
      | Repr::Simple(23) => e.undefined(),
      | Repr::Simple(v) => e.simple(v),
      | Repr::Text(s) => e.str(s),
      | Repr::Bytes(b) => e.bytes(b),
      | Repr::HalfFloat(bits) => {
        let [hi, lo] = bits.to_be_bytes();
        return e.writer_mut().write_all(&[0xf9, hi, lo]);
      },
      | Repr::Float(f) => e.f32(f),
      | Repr::Double(f) => e.f64(f),
      | Repr::Bool(b) => e.bool(b),
    };

    encoded.map(|_| ()).map_err(exhausted)
  }
}

macro_rules! repr_from {
  ($($t:ty => $variant:ident),*) => {
    $(
      impl<'a> From<$t> for Repr<'a> {
        fn from(v: $t) -> Self {
          Repr::$variant(v.into())
        }
      }
    )*
  };
}

repr_from!(u8 => Uint, u16 => Uint, u32 => Uint, u64 => Uint,
           i8 => Int, i16 => Int, i32 => Int, i64 => Int,
           f32 => Float, f64 => Double, bool => Bool,
           &'a str => Text, &'a [u8] => Bytes);

/// A [`Write`] that appends to a payload and refuses to grow it
/// past `limit` bytes
pub(crate) struct Sink<'a> {
  buf: &'a mut Vec<u8>,
  limit: usize,
}

impl<'a> Sink<'a> {
  pub(crate) fn new(buf: &'a mut Vec<u8>, limit: usize) -> Self {
    Self { buf, limit }
  }
}

impl<'a> Write for Sink<'a> {
  type Error = Error;

  fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
    if self.buf.len() + bytes.len() > self.limit {
      return Err(Error::OutOfMemory);
    }

    self.buf
        .try_reserve(bytes.len())
        .map_err(|_| Error::OutOfMemory)?;
    self.buf.extend_from_slice(bytes);
    Ok(())
  }
}

/// Whether a [`MapWriter`] produces a payload when nothing was appended
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapType {
  /// No payload unless something is appended
  NoContent,
  /// Always a payload, an empty map if nothing is appended
  Content,
}

/// Builds the CBOR map carried by a response or notification.
///
/// The map is opened lazily on the first append, and the
/// buffer grows as fields are added, up to a fixed limit.
///
/// ```
/// use oic_server::repr::MapWriter;
///
/// let mut w = MapWriter::new(64);
/// w.append("on", true).unwrap();
/// assert_eq!(w.close().unwrap(), Some(vec![0xbf, 0x62, b'o', b'n', 0xf5, 0xff]));
///
/// assert_eq!(MapWriter::new(64).close().unwrap(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapWriter {
  payload: Vec<u8>,
  ty: MapType,
  fields: usize,
  limit: usize,
}

impl MapWriter {
  /// Create a writer whose payload may not exceed `limit` bytes
  pub fn new(limit: usize) -> Self {
    Self { payload: Vec::new(),
           ty: MapType::NoContent,
           fields: 0,
           limit }
  }

  /// See [`MapType`]
  pub fn map_type(&self) -> MapType {
    self.ty
  }

  /// Change the [`MapType`].
  ///
  /// Switching back to [`MapType::NoContent`] after appending
  /// is refused, yielding `false`.
  pub fn set_type(&mut self, ty: MapType) -> bool {
    match ty {
      | MapType::NoContent if self.fields > 0 => false,
      | ty => {
        self.ty = ty;
        true
      },
    }
  }

  /// Number of fields appended
  pub fn len(&self) -> usize {
    self.fields
  }

  /// Has nothing been appended?
  pub fn is_empty(&self) -> bool {
    self.fields == 0
  }

  /// Bytes written so far, not including the closing break
  pub fn size(&self) -> usize {
    self.payload.len()
  }

  /// The most bytes the payload may occupy
  pub fn limit(&self) -> usize {
    self.limit
  }

  fn write_field(&mut self, key: &str, value: Repr<'_>) -> Result<(), Error> {
    let opened = !self.payload.is_empty();
    if !opened {
      self.payload
          .try_reserve(TYPICAL_PAYLOAD.min(self.limit))
          .map_err(|_| Error::OutOfMemory)?;
    }

    let mut e = Encoder::new(Sink::new(&mut self.payload, self.limit));
    if !opened {
      e.begin_map().map_err(exhausted)?;
    }
    e.str(key).map_err(exhausted)?;
    value.encode(&mut e)
  }

  /// Append a field.
  ///
  /// The buffer grows as needed up to the writer's limit. On failure
  /// the writer is left as it was: a writer nothing was appended to
  /// still yields no payload.
  pub fn append<'a>(&mut self, key: &str, value: impl Into<Repr<'a>>) -> Result<(), Error> {
    let value = value.into();
    value.check()?;

    let start = self.payload.len();
    match self.write_field(key, value) {
      | Ok(()) => {
        self.fields += 1;
        self.ty = MapType::Content;
        Ok(())
      },
      | Err(e) => {
        self.payload.truncate(start);
        Err(e)
      },
    }
  }

  /// Close the map, yielding the payload.
  ///
  /// A [`MapType::NoContent`] writer nothing was appended to
  /// yields `None`.
  pub fn close(mut self) -> Result<Option<Vec<u8>>, Error> {
    match self.ty {
      | MapType::NoContent => Ok(None),
      | MapType::Content => {
        let opened = !self.payload.is_empty();
        let mut e = Encoder::new(Sink::new(&mut self.payload, self.limit));
        if !opened {
          e.begin_map().map_err(exhausted)?;
        }
        e.end().map_err(exhausted)?;
        Ok(Some(self.payload))
      },
    }
  }
}

/// Decode one field value, skipping items with no scalar representation
fn value<'a>(d: &mut Decoder<'a>) -> Result<Value<'a>, minicbor::decode::Error> {
  let value = match d.datatype()? {
    | Type::U8 | Type::U16 | Type::U32 | Type::U64 => Value::Uint(d.u64()?),
    | Type::I8 | Type::I16 | Type::I32 | Type::I64 => Value::Int(d.i64()?),
    | Type::String => Value::Text(d.str()?),
    | Type::Bytes => Value::Bytes(d.bytes()?),
    | Type::Bool => Value::Bool(d.bool()?),
    | Type::Simple => Value::Simple(d.simple()?),
    | Type::F16 => {
      let at = d.position();
      d.skip()?;
      let bits = &d.input()[at + 1..at + 3];
      Value::HalfFloat(u16::from_be_bytes([bits[0], bits[1]]))
    },
    | Type::F32 => Value::Float(d.f32()?),
    | Type::F64 => Value::Double(d.f64()?),
    | Type::Null => {
      d.skip()?;
      Value::Null
    },
    | Type::Undefined => {
      d.skip()?;
      Value::Simple(23)
    },
    | _ => {
      d.skip()?;
      Value::Unsupported
    },
  };

  Ok(value)
}

/// The fields of a request's representation map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapReader<'a> {
  fields: Vec<(&'a str, Value<'a>)>,
}

impl<'a> MapReader<'a> {
  /// A reader with no fields, for requests without a payload
  pub fn empty() -> Self {
    Self { fields: Vec::new() }
  }

  /// Decode a representation map.
  ///
  /// Fails when the payload is not a CBOR map with text keys.
  ///
  /// ```
  /// use oic_server::repr::{MapReader, Value};
  ///
  /// let r = MapReader::parse(&[0xa1, 0x63, b'd', b'i', b'm', 0x18, 50]).unwrap();
  /// assert_eq!(r.get("dim"), Some(Value::Uint(50)));
  /// assert!(MapReader::parse(&[0x80]).is_err());
  /// ```
  pub fn parse(payload: &'a [u8]) -> Result<Self, Error> {
    let mut d = Decoder::new(payload);
    let mut remaining = d.map()?;
    let mut fields = Vec::new();

    loop {
      match remaining {
        | Some(0) => break,
        | Some(n) => remaining = Some(n - 1),
        | None => {
          if d.datatype()? == Type::Break {
            break;
          }
        },
      }

      let key = d.str()?;
      let value = value(&mut d)?;
      fields.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
      fields.push((key, value));
    }

    Ok(Self { fields })
  }

  /// The first value stored under `key`
  pub fn get(&self, key: &str) -> Option<Value<'a>> {
    self.fields
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
  }

  /// Iterate over the fields, in payload order
  pub fn iter(&self) -> impl Iterator<Item = (&'a str, Value<'a>)> + '_ {
    self.fields.iter().copied()
  }

  /// Number of fields
  pub fn len(&self) -> usize {
    self.fields.len()
  }

  /// Were there no fields?
  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }
}
