use core::sync::atomic::{AtomicU32, Ordering};

use std_alloc::boxed::Box;
use std_alloc::format;
use std_alloc::string::String;
use std_alloc::vec::Vec;

use crate::net::Binding;
use crate::resource::{Flags, Handler, ResourceId};
use crate::Error;

/// Path reserved for discovery
pub(crate) const DISCOVERY_HREF: &str = "/oic/res";

/// Hands out `/sol/<hex>` paths for resources registered without one.
///
/// Paths are never reused, even after the resource is unregistered.
#[derive(Debug)]
pub(crate) struct Endpoints(AtomicU32);

impl Endpoints {
  pub(crate) const fn starting_at(n: u32) -> Self {
    Self(AtomicU32::new(n))
  }

  pub(crate) fn next(&self) -> Result<String, Error> {
    self.0
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
        .map(|n| format!("/sol/{:x}", n))
        .map_err(|_| {
          log::warn!(target: crate::logging::TARGET,
                     "resource name overflow, maximum number of resources reached");
          Error::EndpointsExhausted
        })
  }
}

pub(crate) static ENDPOINTS: Endpoints = Endpoints::starting_at(0);

pub(crate) struct Resource {
  pub(crate) id: ResourceId,
  pub(crate) href: String,
  pub(crate) resource_type: String,
  pub(crate) interface: String,
  pub(crate) flags: Flags,
  pub(crate) binding: Binding,
  pub(crate) handler: Box<dyn Handler>,
}

/// Registered resources, in registration order
pub(crate) struct Registry {
  resources: Vec<Resource>,
  next_id: u64,
}

impl Registry {
  pub(crate) fn new() -> Self {
    Self { resources: Vec::new(),
           next_id: 0 }
  }

  /// Is `href` taken? The discovery path always is.
  pub(crate) fn contains_href(&self, href: &str) -> bool {
    href == DISCOVERY_HREF || self.resources.iter().any(|r| r.href == href)
  }

  /// Make room for one more resource, so that a following
  /// [`Registry::push`] cannot fail
  pub(crate) fn reserve(&mut self) -> Result<(), Error> {
    self.resources
        .try_reserve(1)
        .map_err(|_| Error::OutOfMemory)
  }

  pub(crate) fn next_id(&mut self) -> ResourceId {
    let id = ResourceId(self.next_id);
    self.next_id += 1;
    id
  }

  pub(crate) fn push(&mut self, res: Resource) {
    self.resources.push(res);
  }

  pub(crate) fn remove(&mut self, id: ResourceId) -> Option<Resource> {
    self.resources
        .iter()
        .position(|r| r.id == id)
        .map(|ix| self.resources.remove(ix))
  }

  /// Remove every resource, most recently registered first
  pub(crate) fn drain(&mut self) -> impl Iterator<Item = Resource> + '_ {
    self.resources.drain(..).rev()
  }

  pub(crate) fn get(&self, id: ResourceId) -> Option<&Resource> {
    self.resources.iter().find(|r| r.id == id)
  }

  pub(crate) fn find_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Resource> {
    self.resources
        .iter_mut()
        .find(|r| r.binding.matches(path))
  }

  pub(crate) fn iter(&self) -> impl Iterator<Item = &Resource> {
    self.resources.iter()
  }

  pub(crate) fn len(&self) -> usize {
    self.resources.len()
  }
}
