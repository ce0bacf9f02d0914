use core::fmt;

use crate::net::Channel;

/// Errors encounterable while running an OIC server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  /// The server has not been initialized (or has been fully released)
  NotInitialized,
  /// A resource type was built against a different descriptor layout
  VersionMismatch {
    /// [`RESOURCE_TYPE_API_VERSION`](crate::resource::RESOURCE_TYPE_API_VERSION)
    expected: u16,
    /// Version found in the descriptor
    found: u16,
  },
  /// A resource path was empty, did not start with `/` or ended with `/`
  InvalidPath,
  /// A resource is already registered at this path
  DuplicatePath,
  /// Every generated resource path has been handed out
  EndpointsExhausted,
  /// Memory could not be reserved
  OutOfMemory,
  /// No such resource is registered
  NotFound,
  /// An inbound packet was not a request
  NotARequest,
  /// The platform could not provide a machine id to derive the device id from
  DeviceIdUnavailable,
  /// A representation was not a CBOR map of text keys to well-formed items
  Malformed,
  /// The simple value is reserved and may not be encoded
  IllegalSimpleType(u8),
  /// A deferred request outlived the server session it arrived in
  StaleRequest,
  /// A listener refused an operation
  Transport(Channel),
  /// A listener could not be bound
  Bind(Channel),
}

impl From<minicbor::decode::Error> for Error {
  fn from(e: minicbor::decode::Error) -> Self {
    log::debug!(target: crate::logging::TARGET, "malformed representation: {}", e);
    Error::Malformed
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Error::NotInitialized => write!(f, "OIC server not initialized"),
      | Error::VersionMismatch { expected, found } => {
        write!(f,
               "resource type api version {} does not match expected {}",
               found, expected)
      },
      | Error::InvalidPath => write!(f, "invalid resource path"),
      | Error::DuplicatePath => write!(f, "resource path already registered"),
      | Error::EndpointsExhausted => {
        write!(f, "resource name overflow, maximum number of resources reached")
      },
      | Error::OutOfMemory => write!(f, "out of memory"),
      | Error::NotFound => write!(f, "resource not found"),
      | Error::NotARequest => write!(f, "packet is not a request"),
      | Error::DeviceIdUnavailable => write!(f, "machine id unavailable"),
      | Error::Malformed => write!(f, "malformed representation"),
      | Error::IllegalSimpleType(v) => write!(f, "illegal simple type {}", v),
      | Error::StaleRequest => write!(f, "request belongs to a previous server session"),
      | Error::Transport(c) => write!(f, "{} listener failed", c),
      | Error::Bind(c) => write!(f, "could not bind {} listener", c),
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
