use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign};

use crate::packet::Method;
use crate::server::{Request, Response};
use crate::Code;

/// Layout version of [`ResourceType`] this crate understands
pub const RESOURCE_TYPE_API_VERSION: u16 = 1;

/// Resource behavior flags
///
/// ```
/// use oic_server::resource::Flags;
///
/// let f = Flags::DISCOVERABLE | Flags::ACTIVE;
/// assert!(f.contains(Flags::ACTIVE));
/// assert!(!f.contains(Flags::OBSERVABLE));
/// assert_eq!(f.bits(), 5);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flags(u8);

impl Flags {
  /// No flags
  pub const NONE: Flags = Flags(0);
  /// Listed in `/oic/res`
  pub const DISCOVERABLE: Flags = Flags(1 << 0);
  /// Clients may observe the resource
  pub const OBSERVABLE: Flags = Flags(1 << 1);
  /// The resource is live; inactive resources are hidden from discovery
  pub const ACTIVE: Flags = Flags(1 << 2);
  /// The resource is slow to respond
  pub const SLOW: Flags = Flags(1 << 3);
  /// Reachable over DTLS. Set by the server when a DTLS listener is running.
  pub const SECURE: Flags = Flags(1 << 4);
  /// Listed in `/oic/res` only for queries filtering by `rt` or `if`
  pub const DISCOVERABLE_EXPLICIT: Flags = Flags(1 << 5);

  /// Raw bits
  pub const fn bits(&self) -> u8 {
    self.0
  }

  /// Flags from raw bits
  pub const fn from_bits(bits: u8) -> Self {
    Flags(bits)
  }

  /// Are all of `other`'s flags set?
  pub const fn contains(&self, other: Flags) -> bool {
    self.0 & other.0 == other.0
  }
}

impl BitOr for Flags {
  type Output = Flags;

  fn bitor(self, rhs: Flags) -> Flags {
    Flags(self.0 | rhs.0)
  }
}

impl BitOrAssign for Flags {
  fn bitor_assign(&mut self, rhs: Flags) {
    self.0 |= rhs.0;
  }
}

impl BitAnd for Flags {
  type Output = Flags;

  fn bitand(self, rhs: Flags) -> Flags {
    Flags(self.0 & rhs.0)
  }
}

/// A method callback.
///
/// Receives the resource's context, the request (with its decoded
/// representation for PUT and POST) and a response to write a
/// representation into, and returns the response code.
pub type Callback<C> = fn(&mut C, &Request<'_>, &mut Response) -> Code;

/// Describes a kind of resource: its type, interface,
/// optional fixed path and method callbacks.
///
/// ```
/// use oic_server::code;
/// use oic_server::resource::ResourceType;
/// use oic_server::server::{Request, Response};
///
/// fn get(count: &mut u32, _: &Request, _: &mut Response) -> oic_server::Code {
///   *count += 1;
///   code::CONTENT
/// }
///
/// const COUNTER: ResourceType<'static, u32> =
///   ResourceType::new("x.counter", "oic.if.r").path("/counter").get(get);
/// assert_eq!(COUNTER.path, Some("/counter"));
/// assert!(COUNTER.put.is_none());
/// ```
pub struct ResourceType<'a, C> {
  /// Must be [`RESOURCE_TYPE_API_VERSION`]
  pub api_version: u16,
  /// Space-separated resource types, e.g. `oic.r.light`
  pub resource_type: &'a str,
  /// Space-separated interfaces, e.g. `oic.if.baseline`
  pub interface: &'a str,
  /// Fixed path. When `None`, one is generated at registration.
  pub path: Option<&'a str>,
  /// GET callback
  pub get: Option<Callback<C>>,
  /// PUT callback
  pub put: Option<Callback<C>>,
  /// POST callback
  pub post: Option<Callback<C>>,
  /// DELETE callback
  pub delete: Option<Callback<C>>,
}

impl<'a, C> ResourceType<'a, C> {
  /// A descriptor with no path and no callbacks
  pub const fn new(resource_type: &'a str, interface: &'a str) -> Self {
    Self { api_version: RESOURCE_TYPE_API_VERSION,
           resource_type,
           interface,
           path: None,
           get: None,
           put: None,
           post: None,
           delete: None }
  }

  /// Set the path
  pub const fn path(mut self, path: &'a str) -> Self {
    self.path = Some(path);
    self
  }

  /// Set the GET callback
  pub const fn get(mut self, f: Callback<C>) -> Self {
    self.get = Some(f);
    self
  }

  /// Set the PUT callback
  pub const fn put(mut self, f: Callback<C>) -> Self {
    self.put = Some(f);
    self
  }

  /// Set the POST callback
  pub const fn post(mut self, f: Callback<C>) -> Self {
    self.post = Some(f);
    self
  }

  /// Set the DELETE callback
  pub const fn delete(mut self, f: Callback<C>) -> Self {
    self.delete = Some(f);
    self
  }
}

impl<'a, C> Clone for ResourceType<'a, C> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<'a, C> Copy for ResourceType<'a, C> {}

impl<'a, C> fmt::Debug for ResourceType<'a, C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResourceType")
     .field("api_version", &self.api_version)
     .field("resource_type", &self.resource_type)
     .field("interface", &self.interface)
     .field("path", &self.path)
     .field("get", &self.get.is_some())
     .field("put", &self.put.is_some())
     .field("post", &self.post.is_some())
     .field("delete", &self.delete.is_some())
     .finish()
  }
}

/// Identifies a registered resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub(crate) u64);

/// Method callbacks bound to their context
pub(crate) trait Handler {
  fn handles(&self, method: Method) -> bool;

  fn handle(&mut self, method: Method, req: &Request<'_>, rep: &mut Response) -> Option<Code>;
}

pub(crate) struct Bound<C> {
  ctx: C,
  get: Option<Callback<C>>,
  put: Option<Callback<C>>,
  post: Option<Callback<C>>,
  delete: Option<Callback<C>>,
}

impl<C> Bound<C> {
  pub(crate) fn new(rt: &ResourceType<'_, C>, ctx: C) -> Self {
    Self { ctx,
           get: rt.get,
           put: rt.put,
           post: rt.post,
           delete: rt.delete }
  }

  fn callback(&self, method: Method) -> Option<Callback<C>> {
    match method {
      | m if m == Method::GET => self.get,
      | m if m == Method::PUT => self.put,
      | m if m == Method::POST => self.post,
      | m if m == Method::DELETE => self.delete,
      | _ => None,
    }
  }
}

impl<C> Handler for Bound<C> {
  fn handles(&self, method: Method) -> bool {
    self.callback(method).is_some()
  }

  fn handle(&mut self, method: Method, req: &Request<'_>, rep: &mut Response) -> Option<Code> {
    self.callback(method).map(|f| f(&mut self.ctx, req, rep))
  }
}
