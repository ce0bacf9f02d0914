//! `/oic/res`, `/oic/d` and `/oic/p`

use core::convert::Infallible;

use minicbor::encode::{Error as EncodeError, Write};
use minicbor::Encoder;
use std_alloc::string::String;
use std_alloc::vec::Vec;

use super::{Request, Response, State};
use crate::code;
use crate::config::{Compat, Config, DeviceInfo, PlatformInfo};
use crate::logging::TARGET;
use crate::net::Listener;
use crate::packet::{Method, Packet};
use crate::platform::{DeviceId, Platform};
use crate::registry::{Registry, Resource};
use crate::repr::{MapWriter, Sink};
use crate::resource::{Flags, ResourceType};
use crate::{Code, Error};

/// Is this the Uri-Path of the discovery resource?
pub(crate) fn is_discovery<S: AsRef<str>>(path: &[S]) -> bool {
  matches!(path, [a, b] if a.as_ref() == "oic" && b.as_ref() == "res")
}

/// Uri-Query options looked at; any beyond these are ignored
const QUERY_LEN: usize = 2;

/// `rt` and `if` query filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Filter<'a> {
  rt: Option<&'a str>,
  iface: Option<&'a str>,
}

impl<'a> Filter<'a> {
  /// Parse the Uri-Query of a discovery request.
  ///
  /// Only `rt=` and `if=` are understood, each at most once with a
  /// non-empty value. Options past the first [`QUERY_LEN`] are ignored.
  fn parse(req: &'a Packet) -> Option<Self> {
    let mut filter = Filter::default();

    for (q, pair) in req.query
                        .iter()
                        .zip(req.query_pairs())
                        .take(QUERY_LEN)
    {
      match pair {
        | Some(("rt", v)) if filter.rt.is_none() => filter.rt = Some(v).filter(|v| !v.is_empty()),
        | Some(("if", v)) if filter.iface.is_none() => {
          filter.iface = Some(v).filter(|v| !v.is_empty())
        },
        | _ => {
          log::warn!(target: TARGET, "invalid query parameter {:?}", q);
          return None;
        },
      }
    }

    Some(filter)
  }

  fn is_explicit(&self) -> bool {
    self.rt.is_some() || self.iface.is_some()
  }

  fn includes(&self, res: &Resource) -> bool {
    let flags = res.flags;
    let discoverable = flags.contains(Flags::DISCOVERABLE)
                       || (flags.contains(Flags::DISCOVERABLE_EXPLICIT) && self.is_explicit());

    discoverable
    && flags.contains(Flags::ACTIVE)
    && self.rt.map(|rt| res.resource_type == rt).unwrap_or(true)
    && self.iface
           .map(|i| res.interface.split(' ').any(|tok| tok == i))
           .unwrap_or(true)
  }
}

/// Counts the bytes an encoding would take without storing them
#[derive(Debug, Default)]
struct Tally(usize);

impl Write for Tally {
  type Error = Infallible;

  fn write_all(&mut self, bytes: &[u8]) -> Result<(), Infallible> {
    self.0 += bytes.len();
    Ok(())
  }
}

type Encoded<W> = Result<(), EncodeError<<W as Write>::Error>>;

/// Everything needed to encode the discovery payload
struct Links<'a> {
  registry: &'a Registry,
  filter: Filter<'a>,
  id: &'a DeviceId,
  compat: Compat,
  dtls_port: u16,
}

impl<'a> Links<'a> {
  /// A space-separated list: an array of its tokens, or plain text
  /// for OIC 1.0 clients
  fn tokens<W: Write>(&self, e: &mut Encoder<W>, s: &str) -> Encoded<W> {
    match self.compat {
      | Compat::Oic1_0 => {
        e.str(s)?;
      },
      | Compat::Oic1_1 => {
        e.begin_array()?;
        s.split(' ')
         .filter(|tok| !tok.is_empty())
         .try_for_each(|tok| e.str(tok).map(|_| ()))?;
        e.end()?;
      },
    }
    Ok(())
  }

  fn link<W: Write>(&self, e: &mut Encoder<W>, res: &Resource) -> Encoded<W> {
    let pairs = 2 + u64::from(!res.interface.is_empty()) + u64::from(!res.resource_type.is_empty());
    e.map(pairs)?.str("href")?.str(&res.href)?;

    if !res.interface.is_empty() {
      e.str("if")?;
      self.tokens(e, &res.interface)?;
    }

    if !res.resource_type.is_empty() {
      e.str("rt")?;
      self.tokens(e, &res.resource_type)?;
    }

    let bm = (res.flags & (Flags::OBSERVABLE | Flags::DISCOVERABLE)).bits();
    e.str("p")?.begin_map()?.str("bm")?.u8(bm)?;
    if res.flags.contains(Flags::SECURE) {
      e.str("sec")?.bool(true)?.str("port")?.u16(self.dtls_port)?;
    }
    e.end()?;
    Ok(())
  }

  fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Encoded<W> {
    e.array(1)?.map(2)?.str("di")?;
    match self.compat {
      | Compat::Oic1_1 => e.str(self.id.as_str())?,
      | Compat::Oic1_0 => e.bytes(self.id.bytes())?,
    };

    e.str("links")?.begin_array()?;
    self.registry
        .iter()
        .filter(|res| self.filter.includes(res))
        .try_for_each(|res| self.link(e, res))?;
    e.end()?;
    Ok(())
  }

  /// Learn the payload size with a counting pass, then encode into a
  /// buffer of exactly that size
  fn payload(&self) -> Result<Vec<u8>, Error> {
    let mut tally = Encoder::new(Tally::default());
    self.encode(&mut tally).map_err(|_| Error::OutOfMemory)?;
    let size = tally.writer().0;

    log::trace!(target: TARGET, "discovery payload needs {} bytes", size);

    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
       .map_err(|_| Error::OutOfMemory)?;

    self.encode(&mut Encoder::new(Sink::new(&mut buf, size)))
        .map_err(|_| Error::OutOfMemory)?;
    Ok(buf)
  }
}

/// Answer a request for `/oic/res`
pub(crate) fn respond<L: Listener>(state: &State<L>,
                                   config: &Config,
                                   method: Method,
                                   req: &Packet)
                                   -> Packet {
  let mut rep = Packet::response_to(req);

  if method != Method::GET {
    log::debug!(target: TARGET, "{} on /oic/res", method);
    rep.code = code::METHOD_NOT_ALLOWED;
    return rep;
  }

  let filter = match Filter::parse(req) {
    | Some(f) => f,
    | None => {
      rep.code = code::BAD_REQUEST;
      return rep;
    },
  };

  let id = match state.device_id.as_ref() {
    | Some(id) => id,
    | None => {
      log::warn!(target: TARGET, "cannot answer /oic/res: {}", Error::DeviceIdUnavailable);
      rep.code = code::INTERNAL_SERVER_ERROR;
      return rep;
    },
  };

  let links = Links { registry: &state.registry,
                      filter,
                      id,
                      compat: config.compat,
                      dtls_port: config.ports.dtls };

  match links.payload() {
    | Ok(payload) => {
      rep.code = code::CONTENT;
      rep.content_format = Some(crate::repr::CONTENT_FORMAT);
      rep.payload = payload;
    },
    | Err(e) => {
      log::warn!(target: TARGET, "could not encode discovery payload: {}", e);
      rep.code = code::INTERNAL_SERVER_ERROR;
    },
  }

  rep
}

/// Context of `/oic/d`
#[derive(Debug, Clone)]
pub(crate) struct Device {
  pub(crate) info: DeviceInfo,
  pub(crate) id: Option<DeviceId>,
  pub(crate) compat: Compat,
}

pub(crate) const DEVICE: ResourceType<'static, Device> =
  ResourceType::new("oic.wk.d", "oic.if.r").path("/oic/d")
                                           .get(device);

fn write_device(d: &Device, w: &mut MapWriter) -> Result<(), Error> {
  let id = d.id.as_ref().ok_or(Error::DeviceIdUnavailable)?;

  w.append("n", d.info.name.as_str())?;
  w.append("icv", d.info.spec_version.as_str())?;
  w.append("dmv", d.info.data_model_version.as_str())?;
  match d.compat {
    | Compat::Oic1_1 => w.append("di", id.as_str()),
    | Compat::Oic1_0 => w.append("di", &id.bytes()[..]),
  }
}

fn device(d: &mut Device, _: &Request, rep: &mut Response) -> Code {
  match write_device(d, rep.writer_mut()) {
    | Ok(()) => code::CONTENT,
    | Err(e) => {
      log::warn!(target: TARGET, "could not write /oic/d: {}", e);
      rep.discard();
      code::INTERNAL_SERVER_ERROR
    },
  }
}

/// Context of `/oic/p`
#[derive(Debug, Clone)]
pub(crate) struct PlatformRes<P> {
  pub(crate) info: PlatformInfo,
  pub(crate) platform: P,
}

pub(crate) fn platform_type<P: Platform>() -> ResourceType<'static, PlatformRes<P>> {
  ResourceType::new("oic.wk.p", "oic.if.r").path("/oic/p")
                                           .get(platform::<P>)
}

fn write_platform<P: Platform>(p: &PlatformRes<P>, w: &mut MapWriter) -> Result<(), Error> {
  let info = &p.info;
  [("mnmn", &info.manufacturer_name),
   ("mnml", &info.manufacturer_url),
   ("mnmo", &info.model_number),
   ("mndt", &info.manufacture_date),
   ("mnpv", &info.platform_version),
   ("mnhw", &info.hardware_version),
   ("mnfv", &info.firmware_version),
   ("mnsl", &info.support_url),
   ("pi", &info.platform_id)].iter()
                             .try_for_each(|(k, v)| w.append(k, v.as_str()))?;

  w.append("st", "")?;

  let os = p.platform
            .os_version()
            .unwrap_or_else(|| String::from("Unknown"));
  w.append("mnos", os.as_str())
}

fn platform<P: Platform>(p: &mut PlatformRes<P>, _: &Request, rep: &mut Response) -> Code {
  match write_platform(p, rep.writer_mut()) {
    | Ok(()) => code::CONTENT,
    | Err(e) => {
      log::warn!(target: TARGET, "could not write /oic/p: {}", e);
      rep.discard();
      code::INTERNAL_SERVER_ERROR
    },
  }
}
