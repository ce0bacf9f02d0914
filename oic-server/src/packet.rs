use core::fmt;

use std_alloc::string::{String, ToString};
use std_alloc::vec::Vec;
use toad_msg::{Code, Id, Token, Type};

use crate::code::code;

/// Request method
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct Method(pub(crate) Code);

impl Method {
  code!(rfc7252("5.8.1") GET    = Method(0 . 01));
  code!(rfc7252("5.8.2") POST   = Method(0 . 02));
  code!(rfc7252("5.8.3") PUT    = Method(0 . 03));
  code!(rfc7252("5.8.4") DELETE = Method(0 . 04));

  /// The code this method is carried as
  pub fn code(&self) -> Code {
    self.0
  }

  /// Does this method carry a representation in its payload?
  pub fn expects_payload(&self) -> bool {
    *self == Method::PUT || *self == Method::POST
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0 {
      | Code { class: 0, detail: 1 } => write!(f, "GET"),
      | Code { class: 0, detail: 2 } => write!(f, "POST"),
      | Code { class: 0, detail: 3 } => write!(f, "PUT"),
      | Code { class: 0, detail: 4 } => write!(f, "DELETE"),
      | Code { class, detail } => write!(f, "{}.{:02}", class, detail),
    }
  }
}

/// A parsed CoAP message.
///
/// Framing, option encoding and retransmission belong to the transport;
/// this is the subset of a message the server reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
  /// Message type
  pub ty: Type,
  /// Request method or response code
  pub code: Code,
  /// Message ID
  pub id: Id,
  /// Token correlating a response with its request
  pub token: Token,
  /// Uri-Path segments
  pub path: Vec<String>,
  /// Uri-Query values (`key=value`)
  pub query: Vec<String>,
  /// Content-Format option
  pub content_format: Option<u16>,
  /// Payload bytes
  pub payload: Vec<u8>,
}

impl Packet {
  /// Create an empty message
  pub fn new(ty: Type, code: Code) -> Self {
    Self { ty,
           code,
           id: Id(0),
           token: Token(Default::default()),
           path: Vec::new(),
           query: Vec::new(),
           content_format: None,
           payload: Vec::new() }
  }

  /// Create a confirmable request for `path` (`/a/b`)
  ///
  /// ```
  /// use oic_server::packet::{Method, Packet};
  ///
  /// let req = Packet::request(Method::GET, "/oic/res");
  /// assert_eq!(req.path, vec!["oic", "res"]);
  /// assert!(req.is_request());
  /// ```
  pub fn request(method: Method, path: &str) -> Self {
    let mut req = Self::new(Type::Con, method.code());
    req.path = path.split('/')
                   .filter(|s| !s.is_empty())
                   .map(ToString::to_string)
                   .collect();
    req
  }

  /// Create the (empty, piggybacked) response to a request,
  /// copying its message ID and token.
  pub fn response_to(req: &Packet) -> Self {
    let mut rep = Self::new(Type::Ack, Code::new(0, 0));
    rep.id = req.id;
    rep.token = req.token;
    rep
  }

  /// Is this a CON or NON message carrying a request method?
  pub fn is_request(&self) -> bool {
    matches!(self.ty, Type::Con | Type::Non) && self.code.class == 0 && self.code.detail != 0
  }

  /// The request method, if this is a request
  pub fn method(&self) -> Option<Method> {
    Some(Method(self.code)).filter(|_| self.is_request())
  }

  /// Does this message carry a CBOR payload?
  pub fn has_cbor_content(&self) -> bool {
    self.content_format == Some(crate::repr::CONTENT_FORMAT)
  }

  /// The Uri-Path as a single `/`-separated string
  pub fn href(&self) -> String {
    self.path.iter().fold(String::new(), |mut href, seg| {
                      href.push('/');
                      href.push_str(seg);
                      href
                    })
  }

  /// Uri-Query values split into key & value.
  ///
  /// Queries without `=` yield `None`.
  pub fn query_pairs(&self) -> impl Iterator<Item = Option<(&str, &str)>> {
    self.query.iter().map(|q| q.split_once('='))
  }
}
