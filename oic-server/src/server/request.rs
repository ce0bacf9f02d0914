use no_std_net::SocketAddr;
use std_alloc::string::String;
use toad_msg::{Id, Token, Type};

use crate::code;
use crate::net::Channel;
use crate::packet::{Method, Packet};
use crate::repr::{MapReader, MapWriter};
use crate::Code;

/// An inbound request, as seen by a resource callback
#[derive(Debug, Clone, PartialEq)]
pub struct Request<'a> {
  packet: &'a Packet,
  addr: SocketAddr,
  channel: Channel,
  reader: MapReader<'a>,
}

impl<'a> Request<'a> {
  pub(crate) fn new(packet: &'a Packet,
                    addr: SocketAddr,
                    channel: Channel,
                    reader: MapReader<'a>)
                    -> Self {
    Self { packet,
           addr,
           channel,
           reader }
  }

  /// The request message
  pub fn packet(&self) -> &'a Packet {
    self.packet
  }

  /// The request method
  pub fn method(&self) -> Method {
    Method(self.packet.code)
  }

  /// Address of the client
  pub fn addr(&self) -> SocketAddr {
    self.addr
  }

  /// The listener the request arrived on
  pub fn channel(&self) -> Channel {
    self.channel
  }

  /// The request's representation.
  ///
  /// Empty for GET and DELETE.
  pub fn reader(&self) -> &MapReader<'a> {
    &self.reader
  }
}

/// Where a dispatched request came from
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Origin {
  pub(crate) addr: SocketAddr,
  pub(crate) channel: Channel,
  /// Server session the request arrived in
  pub(crate) session: u64,
  pub(crate) href: String,
}

/// A request whose answer was deferred with [`Response::defer`].
///
/// Answered with [`Oic::send_response`](crate::Oic::send_response),
/// which consumes it. Dropping it leaves the client without an answer.
#[derive(Debug, PartialEq)]
pub struct PendingRequest {
  pub(crate) origin: Origin,
  pub(crate) id: Id,
  pub(crate) token: Token,
}

impl PendingRequest {
  /// Address of the client
  pub fn addr(&self) -> SocketAddr {
    self.origin.addr
  }

  /// The listener the request arrived on
  pub fn channel(&self) -> Channel {
    self.origin.channel
  }

  /// Path the request was made to
  pub fn href(&self) -> &str {
    &self.origin.href
  }
}

/// An outbound message under construction: a response, or
/// a notification's body
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  packet: Packet,
  writer: MapWriter,
  origin: Option<Origin>,
  deferred: bool,
}

impl Response {
  pub(crate) fn new(packet: Packet, max_payload: usize) -> Self {
    Self { packet,
           writer: MapWriter::new(max_payload),
           origin: None,
           deferred: false }
  }

  pub(crate) fn for_request(req: &Packet, max_payload: usize) -> Self {
    Self::new(Packet::response_to(req), max_payload)
  }

  /// Allow the callback answering the request from `origin` to defer
  pub(crate) fn deferrable(mut self, origin: Origin) -> Self {
    self.origin = Some(origin);
    self
  }

  /// Answer later instead of when the callback returns.
  ///
  /// The server sends nothing for this request and ignores the code
  /// the callback returns. The answer is built with
  /// [`Oic::response_new`](crate::Oic::response_new) and sent with
  /// [`Oic::send_response`](crate::Oic::send_response).
  ///
  /// Yields `None` when already deferred, and for responses that do not
  /// answer a dispatched request.
  pub fn defer(&mut self) -> Option<PendingRequest> {
    let origin = self.origin.take()?;
    self.deferred = true;
    Some(PendingRequest { origin,
                          id: self.packet.id,
                          token: self.packet.token })
  }

  pub(crate) fn is_deferred(&self) -> bool {
    self.deferred
  }

  /// The representation being written
  pub fn writer(&self) -> &MapWriter {
    &self.writer
  }

  /// Write the representation
  pub fn writer_mut(&mut self) -> &mut MapWriter {
    &mut self.writer
  }

  /// Throw away everything written so far
  pub fn discard(&mut self) {
    self.writer = MapWriter::new(self.writer.limit());
  }

  /// Close the representation and finalize the message as an ACK
  /// carrying `code`.
  ///
  /// If the map cannot be closed the message carries no payload
  /// and 5.00 instead.
  pub(crate) fn seal(self, code: Code) -> Packet {
    let Response { mut packet, writer, .. } = self;
    packet.ty = Type::Ack;

    match writer.close() {
      | Ok(payload) => {
        packet.code = code;
        if let Some(payload) = payload {
          packet.content_format = Some(crate::repr::CONTENT_FORMAT);
          packet.payload = payload;
        }
      },
      | Err(e) => {
        log::warn!(target: crate::logging::TARGET,
                   "could not close representation of {}: {}",
                   packet.href(),
                   e);
        packet.code = code::INTERNAL_SERVER_ERROR;
        packet.content_format = None;
        packet.payload.clear();
      },
    }

    packet
  }
}
