//! A switchable light served over an in-memory transport.
//!
//! Run with `RUST_LOG=trace cargo run --example light` to see every
//! message the server exchanges.

use std::convert::Infallible;
use std::rc::Rc;

use no_std_net::SocketAddr;
use oic_server::config::Config;
use oic_server::net::{Addrd, Binding, Channel, Listener, Network};
use oic_server::packet::{Method, Packet};
use oic_server::platform;
use oic_server::repr::{MapReader, Value};
use oic_server::resource::{Flags, ResourceType};
use oic_server::server::{Request, Response};
use oic_server::{code, Code, Oic};

/// Prints what a real transport would put on the wire
#[derive(Debug)]
struct Loopback(Channel);

impl Listener for Loopback {
  type Error = Infallible;

  fn register_resource(&mut self, binding: &Binding) -> Result<(), Self::Error> {
    log::info!("[{}] serving /{}", self.0, binding.segments().join("/"));
    Ok(())
  }

  fn unregister_resource(&mut self, binding: &Binding) -> Result<(), Self::Error> {
    log::info!("[{}] no longer serving /{}", self.0, binding.segments().join("/"));
    Ok(())
  }

  fn send(&mut self, msg: Addrd<Packet>) -> Result<(), Self::Error> {
    let reply = msg.data();
    let repr = MapReader::parse(&reply.payload).map(|r| format!("{:?}", r.iter().collect::<Vec<_>>()))
                                               .unwrap_or_else(|_| format!("{} bytes", reply.payload.len()));
    log::info!("[{}] -> {}: {}.{:02} {}",
               self.0,
               msg.addr(),
               reply.code.class,
               reply.code.detail,
               repr);
    Ok(())
  }

  fn send_notification(&mut self, binding: &Binding, msg: Rc<Packet>) -> Result<(), Self::Error> {
    log::info!("[{}] notifying observers of /{} ({} byte payload)",
               self.0,
               binding.segments().join("/"),
               msg.payload.len());
    Ok(())
  }
}

#[derive(Debug, Default)]
struct Memory;

impl Network for Memory {
  type Listener = Loopback;

  fn bind(&mut self, channel: Channel, addr: SocketAddr) -> Result<Loopback, Infallible> {
    log::info!("binding {} listener on {}", channel, addr);
    Ok(Loopback(channel))
  }

  fn secure(&mut self, _: &mut Loopback, _: &mut Loopback) -> Result<(), Infallible> {
    Ok(())
  }
}

struct Light {
  on: bool,
}

fn get(light: &mut Light, _: &Request, rep: &mut Response) -> Code {
  match rep.writer_mut().append("value", light.on) {
    | Ok(()) => code::CONTENT,
    | Err(_) => code::INTERNAL_SERVER_ERROR,
  }
}

fn put(light: &mut Light, req: &Request, _: &mut Response) -> Code {
  match req.reader().get("value") {
    | Some(Value::Bool(on)) => {
      light.on = on;
      code::CHANGED
    },
    | _ => code::BAD_REQUEST,
  }
}

const LIGHT: ResourceType<'static, Light> =
  ResourceType::new("oic.r.switch.binary", "oic.if.a oic.if.baseline").path("/light/1")
                                                                     .get(get)
                                                                     .put(put);

fn main() -> Result<(), oic_server::Error> {
  simple_logger::init_with_env().ok();

  let client: SocketAddr = "[fe80::2]:40000".parse().expect("valid address");

  let mut oic = Oic::new(Memory, platform::Std, Config::default());
  oic.init()?;

  let light = oic.register(&LIGHT,
                           Light { on: false },
                           Flags::DISCOVERABLE | Flags::ACTIVE | Flags::OBSERVABLE)?;

  let mut discover = Packet::request(Method::GET, "/oic/res");
  discover.query.push("rt=oic.r.switch.binary".into());
  oic.handle(Channel::Discovery, Addrd(discover, client))?;

  oic.handle(Channel::Unicast,
             Addrd(Packet::request(Method::GET, "/light/1"), client))?;

  let mut toggle = Packet::request(Method::PUT, "/light/1");
  toggle.content_format = Some(oic_server::repr::CONTENT_FORMAT);
  toggle.payload = vec![0xa1, 0x65, b'v', b'a', b'l', b'u', b'e', 0xf5];
  oic.handle(Channel::Unicast, Addrd(toggle, client))?;

  let mut n = oic.notification_new(light)?;
  n.writer_mut().append("value", true)?;
  oic.notify(n)?;

  oic.handle(Channel::Unicast,
             Addrd(Packet::request(Method::GET, "/oic/p"), client))?;

  oic.release()
}
