use core::fmt;

use no_std_net::SocketAddr;
use std_alloc::rc::Rc;
use std_alloc::string::{String, ToString};
use std_alloc::vec::Vec;

use crate::packet::Packet;
use crate::Error;

/// Data that came from (or is going to) a network socket
#[derive(PartialEq, PartialOrd, Eq, Ord, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the contents of this Addressed
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Discard the socket and get the data in this Addressed
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addressed
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// Borrow the contents of the addressed item
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Copy the socket address for the data
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// The listeners an OIC server runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
  /// The well-known multicast port discovery requests arrive on
  Discovery,
  /// An ephemeral port used for replies and notifications
  Unicast,
  /// The DTLS-secured listener
  Dtls,
}

impl fmt::Display for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Channel::Discovery => write!(f, "discovery"),
      | Channel::Unicast => write!(f, "unicast"),
      | Channel::Dtls => write!(f, "dtls"),
    }
  }
}

/// The route a transport should deliver to a resource:
/// its Uri-Path segments, and whether the resource should be
/// advertised by the transport's own `/.well-known/core`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
  segments: Vec<String>,
  well_known: bool,
}

impl Binding {
  pub(crate) fn new(segments: Vec<String>, well_known: bool) -> Self {
    Self { segments,
           well_known }
  }

  /// Derive a binding from an href.
  ///
  /// The href must start with `/`, must not end with `/` and
  /// must contain at least one segment.
  ///
  /// ```
  /// use oic_server::net::Binding;
  /// use oic_server::Error;
  ///
  /// let b = Binding::from_href("/light/1", true).unwrap();
  /// assert_eq!(b.segments(), &["light", "1"]);
  ///
  /// assert_eq!(Binding::from_href("light", false), Err(Error::InvalidPath));
  /// assert_eq!(Binding::from_href("/light/", false), Err(Error::InvalidPath));
  /// assert_eq!(Binding::from_href("", false), Err(Error::InvalidPath));
  /// ```
  pub fn from_href(href: &str, well_known: bool) -> Result<Self, Error> {
    match href.strip_prefix('/') {
      | Some(rest) if !rest.is_empty() && !rest.ends_with('/') => {
        Ok(Self { segments: rest.split('/').map(ToString::to_string).collect(),
                  well_known })
      },
      | _ => {
        log::warn!(target: crate::logging::TARGET, "invalid endpoint {:?}", href);
        Err(Error::InvalidPath)
      },
    }
  }

  /// Uri-Path segments
  pub fn segments(&self) -> &[String] {
    &self.segments
  }

  /// Should the transport list this in `/.well-known/core`?
  pub fn is_well_known(&self) -> bool {
    self.well_known
  }

  /// Does a request's Uri-Path address this binding?
  pub fn matches<S: AsRef<str>>(&self, path: &[S]) -> bool {
    self.segments.len() == path.len()
    && self.segments
           .iter()
           .zip(path)
           .all(|(a, b)| a.as_str() == b.as_ref())
  }
}

/// A single bound CoAP listener, owned by the server.
///
/// The transport behind a listener parses inbound datagrams and hands
/// requests for registered bindings to [`Oic::handle`](crate::Oic::handle),
/// tagged with the listener's [`Channel`].
pub trait Listener {
  /// Errors the transport may yield
  type Error: fmt::Debug;

  /// Start routing requests for `binding` to the server
  fn register_resource(&mut self, binding: &Binding) -> Result<(), Self::Error>;

  /// Stop routing requests for `binding`
  fn unregister_resource(&mut self, binding: &Binding) -> Result<(), Self::Error>;

  /// Send a message to a remote address
  fn send(&mut self, msg: Addrd<Packet>) -> Result<(), Self::Error>;

  /// Deliver a notification to every observer of `binding`.
  ///
  /// The packet is shared, since the same notification may be
  /// in flight on more than one listener.
  fn send_notification(&mut self, binding: &Binding, msg: Rc<Packet>) -> Result<(), Self::Error>;
}

/// Creates the listeners an OIC server runs
pub trait Network {
  /// The listener type
  type Listener: Listener;

  /// Bind a listener for `channel` on `addr`.
  ///
  /// A discovery listener is expected to join the OIC multicast groups.
  fn bind(&mut self,
          channel: Channel,
          addr: SocketAddr)
          -> Result<Self::Listener, <Self::Listener as Listener>::Error>;

  /// Attach the security subsystem, tying the DTLS listener to the
  /// discovery listener.
  ///
  /// When this fails the server drops the DTLS listener and runs insecure.
  fn secure(&mut self,
            discovery: &mut Self::Listener,
            dtls: &mut Self::Listener)
            -> Result<(), <Self::Listener as Listener>::Error>;
}
