use toad_msg::Type;

use super::{Oic, PendingRequest, Response};
use crate::logging::TARGET;
use crate::net::Network;
use crate::packet::Packet;
use crate::platform::Platform;
use crate::{Code, Error};

impl<N, P> Oic<N, P>
  where N: Network,
        P: Platform + Clone + 'static
{
  /// Start the answer to a deferred request
  pub fn response_new(&self, pending: &PendingRequest) -> Result<Response, Error> {
    let state = self.state.as_ref().ok_or(Error::NotInitialized)?;
    if pending.origin.session != state.session {
      return Err(Error::StaleRequest);
    }

    let mut packet = Packet::new(Type::Ack, Code::new(0, 0));
    packet.id = pending.id;
    packet.token = pending.token;
    Ok(Response::new(packet, self.config.max_payload))
  }

  /// Answer a deferred request.
  ///
  /// The response is closed and sent as an ACK carrying `code`, or 5.00
  /// without a payload when its map cannot be closed. Requests that
  /// arrived on the discovery listener are answered through the unicast
  /// listener. The request and the response are consumed whatever the
  /// outcome.
  pub fn send_response(&mut self,
                       pending: PendingRequest,
                       response: Response,
                       code: Code)
                       -> Result<(), Error> {
    let PendingRequest { origin, id, token } = pending;

    let state = match self.state.as_mut() {
      | Some(state) => state,
      | None => {
        log::warn!(target: TARGET, "answer to {} dropped: server is down", origin.href);
        return Err(Error::NotInitialized);
      },
    };

    if origin.session != state.session {
      log::warn!(target: TARGET,
                 "answer to {} dropped: it arrived before the server was restarted",
                 origin.href);
      return Err(Error::StaleRequest);
    }

    let mut rep = response.seal(code);
    rep.id = id;
    rep.token = token;

    log::debug!(target: TARGET, "deferred {} -> {:?}", origin.href, rep.code);
    state.reply(origin.channel, origin.addr, rep)
  }
}
