use std_alloc::rc::Rc;
use toad_msg::Type;

use super::{Oic, Response};
use crate::code;
use crate::logging::{summary, TARGET};
use crate::net::{Binding, Channel, Listener, Network};
use crate::packet::Packet;
use crate::platform::Platform;
use crate::repr::MapWriter;
use crate::resource::ResourceId;
use crate::Error;

/// A notification for the observers of a resource.
///
/// Created by [`Oic::notification_new`], filled through
/// [`Notification::writer_mut`] and sent with [`Oic::notify`].
/// Dropping it unsent is fine.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
  resource: ResourceId,
  binding: Binding,
  body: Response,
}

impl Notification {
  /// The resource being notified about
  pub fn resource(&self) -> ResourceId {
    self.resource
  }

  /// The representation being written
  pub fn writer(&self) -> &MapWriter {
    self.body.writer()
  }

  /// Write the representation
  pub fn writer_mut(&mut self) -> &mut MapWriter {
    self.body.writer_mut()
  }
}

impl<N, P> Oic<N, P>
  where N: Network,
        P: Platform + Clone + 'static
{
  /// Start a notification for a registered resource
  pub fn notification_new(&self, id: ResourceId) -> Result<Notification, Error> {
    let state = self.state.as_ref().ok_or(Error::NotInitialized)?;
    let res = state.registry.get(id).ok_or(Error::NotFound)?;

    let mut packet = Packet::new(Type::Ack, code::CONTENT);
    packet.path = res.binding.segments().to_vec();

    Ok(Notification { resource: id,
                      binding: res.binding.clone(),
                      body: Response::new(packet, self.config.max_payload) })
  }

  /// Send a notification to the resource's observers.
  ///
  /// The message goes out on the unicast listener, then on the DTLS
  /// listener if one is running. A unicast failure fails the call and
  /// skips DTLS. A DTLS failure fails the call after unicast observers
  /// were notified.
  pub fn notify(&mut self, notification: Notification) -> Result<(), Error> {
    let state = self.state.as_mut().ok_or(Error::NotInitialized)?;

    let Notification { resource,
                       binding,
                       body, } = notification;

    if state.registry.get(resource).is_none() {
      log::warn!(target: TARGET, "notification for unregistered resource {:?}", resource);
      return Err(Error::NotFound);
    }

    let msg = Rc::new(body.seal(code::CONTENT));
    log::trace!(target: TARGET, "notifying {}", summary(&msg));

    state.unicast
         .send_notification(&binding, Rc::clone(&msg))
         .map_err(|e| {
           log::warn!(target: TARGET,
                      "could not notify observers of {}: {:?}",
                      msg.href(),
                      e);
           Error::Transport(Channel::Unicast)
         })?;

    match state.dtls.as_mut() {
      | Some(dtls) => dtls.send_notification(&binding, Rc::clone(&msg))
                          .map_err(|e| {
                            log::warn!(target: TARGET,
                                       "could not notify secure observers of {}: {:?}",
                                       msg.href(),
                                       e);
                            Error::Transport(Channel::Dtls)
                          }),
      | None => Ok(()),
    }
  }
}
