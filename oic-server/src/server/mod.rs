use core::fmt;

use no_std_net::{IpAddr, Ipv6Addr, SocketAddr};
use std_alloc::boxed::Box;
use std_alloc::string::String;
use std_alloc::vec;

use crate::config::Config;
use crate::logging::{summary, TARGET};
use crate::net::{Addrd, Binding, Channel, Listener, Network};
use crate::packet::Packet;
use crate::platform::{DeviceId, Platform};
use crate::registry::{Registry, Resource, ENDPOINTS};
use crate::resource::{Bound, Flags, ResourceId, ResourceType, RESOURCE_TYPE_API_VERSION};
use crate::Error;

mod deferred;
mod discovery;
mod lifecycle;
mod notify;
mod request;

#[doc(inline)]
pub use notify::Notification;
#[doc(inline)]
pub use request::{PendingRequest, Request, Response};

/// Listeners are registered with and torn down in this order
const CHANNELS: [Channel; 3] = [Channel::Discovery, Channel::Unicast, Channel::Dtls];

fn any(port: u16) -> SocketAddr {
  SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)
}

fn discovery_binding() -> Binding {
  Binding::new(vec!["oic".into(), "res".into()], false)
}

/// Everything that only exists while the server is initialized
pub(crate) struct State<L> {
  pub(crate) discovery: L,
  pub(crate) unicast: L,
  pub(crate) dtls: Option<L>,
  pub(crate) registry: Registry,
  pub(crate) device_id: Option<DeviceId>,
  pub(crate) session: u64,
}

impl<L: Listener> State<L> {
  pub(crate) fn listener(&self, channel: Channel) -> Option<&L> {
    match channel {
      | Channel::Discovery => Some(&self.discovery),
      | Channel::Unicast => Some(&self.unicast),
      | Channel::Dtls => self.dtls.as_ref(),
    }
  }

  pub(crate) fn listener_mut(&mut self, channel: Channel) -> Option<&mut L> {
    match channel {
      | Channel::Discovery => Some(&mut self.discovery),
      | Channel::Unicast => Some(&mut self.unicast),
      | Channel::Dtls => self.dtls.as_mut(),
    }
  }

  /// Register `binding` with every listener.
  ///
  /// If one refuses, the listeners that accepted it are rolled back.
  fn bind(&mut self, binding: &Binding) -> Result<(), Error> {
    for (ix, &channel) in CHANNELS.iter().enumerate() {
      let listener = match self.listener_mut(channel) {
        | Some(l) => l,
        | None => continue,
      };

      if let Err(e) = listener.register_resource(binding) {
        log::warn!(target: TARGET,
                   "could not register {:?} with {} listener: {:?}",
                   binding.segments(),
                   channel,
                   e);
        CHANNELS[..ix].iter().rev().for_each(|&prev| {
                                     if let Some(l) = self.listener_mut(prev) {
                                       l.unregister_resource(binding).ok();
                                     }
                                   });
        return Err(Error::Transport(channel));
      }
    }

    Ok(())
  }

  /// Send the reply to a request that arrived on `channel`.
  ///
  /// Requests from the discovery listener are answered through the
  /// unicast listener.
  pub(crate) fn reply(&mut self, channel: Channel, addr: SocketAddr, rep: Packet) -> Result<(), Error> {
    let out = match channel {
      | Channel::Discovery => Channel::Unicast,
      | other => other,
    };

    log::trace!(target: TARGET, "{} -> {}: {}", out, addr, summary(&rep));

    self.listener_mut(out)
        .ok_or(Error::Transport(out))?
        .send(Addrd(rep, addr))
        .map_err(|e| {
          log::warn!(target: TARGET, "could not send reply to {}: {:?}", addr, e);
          Error::Transport(out)
        })
  }

  /// Unregister `binding` from every listener
  fn unbind(&mut self, binding: &Binding) {
    CHANNELS.iter().for_each(|&channel| {
                     if let Some(Err(e)) =
                       self.listener_mut(channel)
                           .map(|l| l.unregister_resource(binding))
                     {
                       log::warn!(target: TARGET,
                                  "could not unregister {:?} from {} listener: {:?}",
                                  binding.segments(),
                                  channel,
                                  e);
                     }
                   });
  }
}

/// An OIC server.
///
/// Owns the listeners created by its [`Network`], the resource registry
/// and the device id. Initialization is reference counted: every
/// successful [`Oic::init`] must be paired with an [`Oic::release`], and
/// the listeners are torn down when the last reference goes away.
pub struct Oic<N: Network, P> {
  net: N,
  platform: P,
  config: Config,
  refcnt: usize,
  sessions: u64,
  state: Option<State<N::Listener>>,
}

impl<N: Network, P> fmt::Debug for Oic<N, P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Oic")
     .field("config", &self.config)
     .field("refcnt", &self.refcnt)
     .field("resources",
            &self.state.as_ref().map(|s| s.registry.len()).unwrap_or(0))
     .field("secure",
            &self.state.as_ref().map(|s| s.dtls.is_some()).unwrap_or(false))
     .finish()
  }
}

impl<N, P> Oic<N, P>
  where N: Network,
        P: Platform + Clone + 'static
{
  /// Create a server. Nothing is bound until [`Oic::init`].
  pub fn new(net: N, platform: P, config: Config) -> Self {
    Self { net,
           platform,
           config,
           refcnt: 0,
           sessions: 0,
           state: None }
  }

  /// Runtime configuration
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Has [`Oic::init`] succeeded more times than [`Oic::release`] was called?
  pub fn is_initialized(&self) -> bool {
    self.refcnt > 0
  }

  /// Outstanding [`Oic::init`]s
  pub fn refcount(&self) -> usize {
    self.refcnt
  }

  /// Is a DTLS listener running?
  pub fn is_secure(&self) -> bool {
    self.state
        .as_ref()
        .map(|s| s.dtls.is_some())
        .unwrap_or(false)
  }

  /// The device id, if the platform provided a machine id
  pub fn device_id(&self) -> Option<&DeviceId> {
    self.state.as_ref().and_then(|s| s.device_id.as_ref())
  }

  /// The listener serving `channel`, for the transport to poll
  pub fn listener(&self, channel: Channel) -> Option<&N::Listener> {
    self.state.as_ref().and_then(|s| s.listener(channel))
  }

  /// See [`Oic::listener`]
  pub fn listener_mut(&mut self, channel: Channel) -> Option<&mut N::Listener> {
    self.state.as_mut().and_then(|s| s.listener_mut(channel))
  }

  /// Path of a registered resource
  pub fn href(&self, id: ResourceId) -> Option<&str> {
    self.state
        .as_ref()
        .and_then(|s| s.registry.get(id))
        .map(|r| r.href.as_str())
  }

  /// Flags of a registered resource, including [`Flags::SECURE`]
  /// when it was added by the server
  pub fn flags(&self, id: ResourceId) -> Option<Flags> {
    self.state
        .as_ref()
        .and_then(|s| s.registry.get(id))
        .map(|r| r.flags)
  }

  /// Bring the server up, or add a reference if it already is.
  ///
  /// Binds the discovery and unicast listeners on `[::]`, registers
  /// `/oic/res` with both, then tries to bind and secure a DTLS listener.
  /// The server runs without DTLS when that fails.
  /// Finally `/oic/d` and `/oic/p` are registered.
  pub fn init(&mut self) -> Result<(), Error> {
    if self.refcnt > 0 {
      self.refcnt += 1;
      return Ok(());
    }

    let ports = self.config.ports;
    let mut discovery = self.bind(Channel::Discovery, ports.discovery)?;
    let mut unicast = self.bind(Channel::Unicast, ports.unicast)?;

    let res = discovery_binding();
    discovery.register_resource(&res).map_err(|e| {
                                        log::warn!(target: TARGET,
                                                   "could not register /oic/res with discovery listener: {:?}",
                                                   e);
                                        Error::Transport(Channel::Discovery)
                                      })?;
    if let Err(e) = unicast.register_resource(&res) {
      log::warn!(target: TARGET,
                 "could not register /oic/res with unicast listener: {:?}",
                 e);
      discovery.unregister_resource(&res).ok();
      return Err(Error::Transport(Channel::Unicast));
    }

    let dtls = match self.net.bind(Channel::Dtls, any(ports.dtls)) {
      | Ok(mut dtls) => match self.net.secure(&mut discovery, &mut dtls) {
        | Ok(()) => Some(dtls),
        | Err(e) => {
          log::warn!(target: TARGET, "security subsystem could not be initialized: {:?}", e);
          log::info!(target: TARGET, "OIC server running in insecure mode");
          None
        },
      },
      | Err(e) => {
        log::info!(target: TARGET,
                   "DTLS listener could not be created ({:?}), OIC server running in insecure mode",
                   e);
        None
      },
    };

    let device_id = self.platform.machine_id().map(DeviceId::new);
    if device_id.is_none() {
      log::warn!(target: TARGET,
                 "machine id unavailable, /oic/d and /oic/res will fail");
    }

    self.sessions = self.sessions.wrapping_add(1);
    self.state = Some(State { discovery,
                              unicast,
                              dtls,
                              registry: Registry::new(),
                              device_id,
                              session: self.sessions });
    self.refcnt = 1;

    if let Err(e) = self.register_builtin() {
      log::error!(target: TARGET, "could not register builtin resources: {}", e);
      self.shutdown();
      return Err(e);
    }

    log::info!(target: TARGET,
               "OIC server up ({})",
               if self.is_secure() { "secure" } else { "insecure" });
    Ok(())
  }

  fn bind(&mut self, channel: Channel, port: u16) -> Result<N::Listener, Error> {
    self.net.bind(channel, any(port)).map_err(|e| {
                                        log::error!(target: TARGET,
                                                    "could not bind {} listener on port {}: {:?}",
                                                    channel,
                                                    port,
                                                    e);
                                        Error::Bind(channel)
                                      })
  }

  fn register_builtin(&mut self) -> Result<(), Error> {
    let device = discovery::Device { info: self.config.device.clone(),
                                     id: self.device_id().cloned(),
                                     compat: self.config.compat };
    self.register(&discovery::DEVICE, device, Flags::DISCOVERABLE | Flags::ACTIVE)?;

    let platform = discovery::PlatformRes { info: self.config.platform.clone(),
                                            platform: self.platform.clone() };
    self.register(&discovery::platform_type::<P>(),
                  platform,
                  Flags::DISCOVERABLE | Flags::ACTIVE)?;
    Ok(())
  }

  /// Drop a reference, tearing the server down when it was the last one
  pub fn release(&mut self) -> Result<(), Error> {
    match self.refcnt {
      | 0 => {
        log::warn!(target: TARGET, "release called without init");
        Err(Error::NotInitialized)
      },
      | 1 => {
        self.shutdown();
        Ok(())
      },
      | _ => {
        self.refcnt -= 1;
        Ok(())
      },
    }
  }

  /// Tear the server down no matter how many references are outstanding.
  ///
  /// Resources are unregistered most recent first, then `/oic/res`.
  pub fn shutdown(&mut self) {
    self.refcnt = 0;

    if let Some(mut state) = self.state.take() {
      let resources = state.registry.drain().collect::<std_alloc::vec::Vec<_>>();
      resources.iter().for_each(|r| state.unbind(&r.binding));

      let res = discovery_binding();
      state.discovery.unregister_resource(&res).ok();
      state.unicast.unregister_resource(&res).ok();

      log::info!(target: TARGET, "OIC server shut down");
    }
  }

  /// Register a resource.
  ///
  /// The resource is served at the descriptor's path, or at a generated
  /// `/sol/<hex>` path when it has none. When a DTLS listener is running
  /// the resource is marked [`Flags::SECURE`].
  pub fn register<C: 'static>(&mut self,
                              rt: &ResourceType<'_, C>,
                              ctx: C,
                              flags: Flags)
                              -> Result<ResourceId, Error> {
    let state = self.state.as_mut().ok_or(Error::NotInitialized)?;

    if rt.api_version != RESOURCE_TYPE_API_VERSION {
      log::warn!(target: TARGET,
                 "resource type api version {} does not match expected {}",
                 rt.api_version,
                 RESOURCE_TYPE_API_VERSION);
      return Err(Error::VersionMismatch { expected: RESOURCE_TYPE_API_VERSION,
                                          found: rt.api_version });
    }

    let href = match rt.path {
      | Some(path) => String::from(path),
      | None => ENDPOINTS.next()?,
    };

    let binding = Binding::from_href(&href, flags.contains(Flags::DISCOVERABLE))?;
    if state.registry.contains_href(&href) {
      log::warn!(target: TARGET, "{} is already registered", href);
      return Err(Error::DuplicatePath);
    }

    let mut flags = flags;
    if state.dtls.is_some() {
      flags |= Flags::SECURE;
    }

    state.registry.reserve()?;
    state.bind(&binding)?;

    let id = state.registry.next_id();
    log::debug!(target: TARGET,
                "registered {} (rt {:?}, flags {:#04x})",
                href,
                rt.resource_type,
                flags.bits());
    state.registry.push(Resource { id,
                                   href,
                                   resource_type: rt.resource_type.into(),
                                   interface: rt.interface.into(),
                                   flags,
                                   binding,
                                   handler: Box::new(Bound::new(rt, ctx)) });
    Ok(id)
  }

  /// Unregister a resource, removing it from every listener
  pub fn unregister(&mut self, id: ResourceId) -> Result<(), Error> {
    let state = self.state.as_mut().ok_or(Error::NotInitialized)?;

    match state.registry.remove(id) {
      | Some(res) => {
        state.unbind(&res.binding);
        log::debug!(target: TARGET, "unregistered {}", res.href);
        Ok(())
      },
      | None => {
        log::error!(target: TARGET, "could not find resource {:?}", id);
        Err(Error::NotFound)
      },
    }
  }

  /// Answer a request the transport received on `channel`.
  ///
  /// `/oic/res` is answered by the discovery responder, everything else
  /// by the registered resource's callbacks. Replies to requests from
  /// the discovery listener are sent through the unicast listener.
  /// Nothing is sent when the callback deferred its answer.
  pub fn handle(&mut self, channel: Channel, msg: Addrd<Packet>) -> Result<(), Error> {
    let state = self.state.as_mut().ok_or(Error::NotInitialized)?;
    let Addrd(req, addr) = msg;

    let method = match req.method() {
      | Some(m) => m,
      | None => {
        log::debug!(target: TARGET, "ignoring {} from {}", summary(&req), addr);
        return Err(Error::NotARequest);
      },
    };

    log::trace!(target: TARGET, "{} <- {}: {}", channel, addr, summary(&req));

    let rep = if discovery::is_discovery(&req.path) {
      Some(discovery::respond(&*state, &self.config, method, &req))
    } else {
      let origin = request::Origin { addr,
                                     channel,
                                     session: state.session,
                                     href: req.href() };
      lifecycle::respond(&mut state.registry,
                         origin,
                         method,
                         &req,
                         self.config.max_payload)
    };

    match rep {
      | Some(rep) => state.reply(channel, addr, rep),
      | None => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests;
