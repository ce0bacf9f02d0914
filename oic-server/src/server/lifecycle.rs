use super::request::Origin;
use super::{Request, Response};
use crate::code;
use crate::logging::TARGET;
use crate::packet::{Method, Packet};
use crate::registry::Registry;
use crate::repr::MapReader;
use crate::Code;

fn reply(req: &Packet, code: Code) -> Packet {
  let mut rep = Packet::response_to(req);
  rep.code = code;
  rep
}

/// Dispatch a request to the resource bound at its path.
///
/// PUT and POST must carry a CBOR map; anything else is a 4.00.
/// A method the resource has no callback for is a 5.01.
/// Yields `None` when the callback deferred its answer.
pub(crate) fn respond(registry: &mut Registry,
                      origin: Origin,
                      method: Method,
                      req: &Packet,
                      max_payload: usize)
                      -> Option<Packet> {
  let res = match registry.find_mut(&req.path) {
    | Some(res) => res,
    | None => {
      log::debug!(target: TARGET, "nothing registered at {}", req.href());
      return Some(reply(req, code::NOT_FOUND));
    },
  };

  if !res.handler.handles(method) {
    log::debug!(target: TARGET, "{} has no {} callback", res.href, method);
    return Some(reply(req, code::NOT_IMPLEMENTED));
  }

  let reader = if method.expects_payload() {
    if !req.has_cbor_content() {
      log::warn!(target: TARGET,
                 "{} {} with content format {:?}",
                 method,
                 res.href,
                 req.content_format);
      return Some(reply(req, code::BAD_REQUEST));
    }

    match MapReader::parse(&req.payload) {
      | Ok(reader) => reader,
      | Err(e) => {
        log::warn!(target: TARGET, "could not parse {} {} payload: {}", method, res.href, e);
        return Some(reply(req, code::BAD_REQUEST));
      },
    }
  } else {
    MapReader::empty()
  };

  let request = Request::new(req, origin.addr, origin.channel, reader);
  let mut rep = Response::for_request(req, max_payload).deferrable(origin);
  let code = res.handler
                .handle(method, &request, &mut rep)
                .unwrap_or(code::NOT_IMPLEMENTED);

  if rep.is_deferred() {
    log::debug!(target: TARGET, "{} {} deferred", method, res.href);
    return None;
  }

  log::debug!(target: TARGET, "{} {} -> {:?}", method, res.href, code);
  Some(rep.seal(code))
}
