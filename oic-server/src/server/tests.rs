use ::core::cell::RefCell;
use std_alloc::rc::Rc;
use std_alloc::string::String;
use std_alloc::vec::Vec;
use toad_msg::Type;

use super::*;
use crate::code;
use crate::config::Compat;
use crate::packet::Method;
use crate::repr::{MapReader, Value};
use crate::test::{addr, NetworkMock, PlatformMock, Shared};
use crate::Code;

type Server = Oic<NetworkMock, PlatformMock>;

struct Light {
  on: bool,
}

fn light_get(light: &mut Light, _: &Request, rep: &mut Response) -> Code {
  match rep.writer_mut().append("value", light.on) {
    | Ok(()) => code::CONTENT,
    | Err(_) => code::INTERNAL_SERVER_ERROR,
  }
}

fn light_put(light: &mut Light, req: &Request, _: &mut Response) -> Code {
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
                                                                     .get(light_get)
                                                                     .put(light_put);

fn server_with(config: Config, platform: PlatformMock, shared: Shared) -> (Server, Rc<RefCell<Shared>>) {
  let net = NetworkMock { shared: Rc::new(RefCell::new(shared)) };
  let shared = Rc::clone(&net.shared);
  (Oic::new(net, platform, config), shared)
}

fn server() -> (Server, Rc<RefCell<Shared>>) {
  let (mut oic, shared) = server_with(Config::default(), PlatformMock::default(), Shared::default());
  oic.init().unwrap();
  (oic, shared)
}

fn exchange(oic: &mut Server,
            shared: &Rc<RefCell<Shared>>,
            channel: Channel,
            req: Packet)
            -> (Channel, Packet) {
  oic.handle(channel, Addrd(req, addr())).unwrap();
  shared.borrow().last_sent().unwrap()
}

fn get(oic: &mut Server, shared: &Rc<RefCell<Shared>>, path: &str) -> Packet {
  exchange(oic, shared, Channel::Unicast, Packet::request(Method::GET, path)).1
}

fn discover(oic: &mut Server, shared: &Rc<RefCell<Shared>>, query: &[&str]) -> Packet {
  let mut req = Packet::request(Method::GET, "/oic/res");
  req.query = query.iter().map(|q| String::from(*q)).collect();
  exchange(oic, shared, Channel::Discovery, req).1
}

fn mentions(payload: &[u8], text: &str) -> bool {
  payload.windows(text.len()).any(|w| w == text.as_bytes())
}

#[test]
fn init_binds_listeners_and_builtin_resources() {
  let (oic, shared) = server();
  let shared = shared.borrow();

  assert_eq!(shared.bound,
             vec![(Channel::Discovery, "[::]:5683".parse::<SocketAddr>().unwrap()),
                  (Channel::Unicast, "[::]:0".parse::<SocketAddr>().unwrap()),
                  (Channel::Dtls, "[::]:5684".parse::<SocketAddr>().unwrap())]);
  assert_eq!(shared.registered_on(Channel::Discovery),
             vec!["oic/res", "oic/d", "oic/p"]);
  assert_eq!(shared.registered_on(Channel::Unicast),
             vec!["oic/res", "oic/d", "oic/p"]);
  assert_eq!(shared.registered_on(Channel::Dtls), vec!["oic/d", "oic/p"]);

  assert!(oic.is_initialized());
  assert!(oic.is_secure());
  assert_eq!(oic.refcount(), 1);
  assert_eq!(oic.device_id().map(|id| id.bytes()), Some(&[0x42; 16]));
}

#[test]
fn init_is_reference_counted() {
  let (mut oic, shared) = server();
  oic.init().unwrap();
  assert_eq!(oic.refcount(), 2);
  assert_eq!(shared.borrow().bound.len(), 3);

  oic.release().unwrap();
  assert!(oic.is_initialized());
  assert_eq!(shared.borrow().registered.len(), 8);

  oic.release().unwrap();
  assert!(!oic.is_initialized());
  assert!(shared.borrow().registered.is_empty());
  assert_eq!(oic.release(), Err(Error::NotInitialized));
}

#[test]
fn shutdown_ignores_refcount() {
  let (mut oic, shared) = server();
  oic.init().unwrap();
  oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE)
     .unwrap();

  oic.shutdown();
  assert_eq!(oic.refcount(), 0);
  assert!(shared.borrow().registered.is_empty());
  assert_eq!(oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE),
             Err(Error::NotInitialized));
}

#[test]
fn use_before_init() {
  let (mut oic, _) = server_with(Config::default(), PlatformMock::default(), Shared::default());
  assert_eq!(oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE),
             Err(Error::NotInitialized));
  assert_eq!(oic.handle(Channel::Unicast,
                        Addrd(Packet::request(Method::GET, "/oic/d"), addr())),
             Err(Error::NotInitialized));
  assert_eq!(oic.release(), Err(Error::NotInitialized));
}

#[test]
fn listener_bind_failure_fails_init() {
  let (mut oic, _) = server_with(Config::default(),
                                 PlatformMock::default(),
                                 Shared { fail_bind: vec![Channel::Unicast],
                                          ..Default::default() });
  assert_eq!(oic.init(), Err(Error::Bind(Channel::Unicast)));
  assert!(!oic.is_initialized());
}

#[test]
fn dtls_bind_failure_runs_insecure() {
  let (mut oic, shared) = server_with(Config::default(),
                                      PlatformMock::default(),
                                      Shared { fail_bind: vec![Channel::Dtls],
                                               ..Default::default() });
  oic.init().unwrap();
  assert!(!oic.is_secure());

  let id = oic.register(&LIGHT, Light { on: false }, Flags::DISCOVERABLE | Flags::ACTIVE)
              .unwrap();
  assert!(!oic.flags(id).unwrap().contains(Flags::SECURE));
  assert!(shared.borrow().registered_on(Channel::Dtls).is_empty());

  let rep = discover(&mut oic, &shared, &[]);
  assert!(!mentions(&rep.payload, "sec"));
}

#[test]
fn security_failure_drops_dtls_listener() {
  let (mut oic, shared) = server_with(Config::default(),
                                      PlatformMock::default(),
                                      Shared { fail_secure: true,
                                               ..Default::default() });
  oic.init().unwrap();
  assert!(!oic.is_secure());
  assert!(oic.listener(Channel::Dtls).is_none());
  assert!(shared.borrow().registered_on(Channel::Dtls).is_empty());
}

#[test]
fn register_round_trips_through_discovery() {
  let (mut oic, shared) = server();
  let id = oic.register(&LIGHT, Light { on: false }, Flags::DISCOVERABLE | Flags::ACTIVE)
              .unwrap();
  assert_eq!(oic.href(id), Some("/light/1"));
  assert!(oic.flags(id).unwrap().contains(Flags::SECURE));

  let rep = discover(&mut oic, &shared, &["rt=oic.r.switch.binary"]);
  assert_eq!(rep.code, code::CONTENT);
  assert_eq!(rep.content_format, Some(crate::repr::CONTENT_FORMAT));
  assert!(mentions(&rep.payload, "/light/1"));
  assert!(!mentions(&rep.payload, "/oic/d"));

  let rep = discover(&mut oic, &shared, &[]);
  assert!(mentions(&rep.payload, "/light/1"));
  assert!(mentions(&rep.payload, "/oic/d"));
  assert!(mentions(&rep.payload, "/oic/p"));

  oic.unregister(id).unwrap();
  let rep = discover(&mut oic, &shared, &["rt=oic.r.switch.binary"]);
  assert!(!mentions(&rep.payload, "/light/1"));
}

#[test]
fn discovery_filters_by_interface() {
  let (mut oic, shared) = server();
  oic.register(&LIGHT, Light { on: false }, Flags::DISCOVERABLE | Flags::ACTIVE)
     .unwrap();

  let rep = discover(&mut oic, &shared, &["if=oic.if.baseline"]);
  assert!(mentions(&rep.payload, "/light/1"));
  assert!(!mentions(&rep.payload, "/oic/p"));

  let rep = discover(&mut oic, &shared, &["if=oic.if.r"]);
  assert!(!mentions(&rep.payload, "/light/1"));
  assert!(mentions(&rep.payload, "/oic/p"));
}

#[test]
fn discovery_rejects_bad_requests() {
  let (mut oic, shared) = server();
  assert_eq!(discover(&mut oic, &shared, &["rt=a", "rt=b"]).code,
             code::BAD_REQUEST);
  assert_eq!(discover(&mut oic, &shared, &["x=y"]).code, code::BAD_REQUEST);

  let rep = exchange(&mut oic,
                     &shared,
                     Channel::Unicast,
                     Packet::request(Method::PUT, "/oic/res")).1;
  assert_eq!(rep.code, code::METHOD_NOT_ALLOWED);
}

#[test]
fn multicast_requests_are_answered_via_unicast() {
  let (mut oic, shared) = server();
  let (channel, rep) = exchange(&mut oic,
                                &shared,
                                Channel::Discovery,
                                Packet::request(Method::GET, "/oic/res"));
  assert_eq!(channel, Channel::Unicast);
  assert_eq!(rep.ty, Type::Ack);
  assert!(shared.borrow().sent_on(Channel::Discovery).is_empty());

  let (channel, _) = exchange(&mut oic,
                              &shared,
                              Channel::Dtls,
                              Packet::request(Method::GET, "/oic/d"));
  assert_eq!(channel, Channel::Dtls);
}

#[test]
fn path_validation() {
  let (mut oic, _) = server();
  ["", "light", "/light/", "/"].iter().for_each(|path| {
                                         let rt = ResourceType::new("x", "oic.if.r").path(path)
                                                                                    .get(light_get);
                                         assert_eq!(oic.register(&rt, Light { on: false }, Flags::ACTIVE),
                                                    Err(Error::InvalidPath));
                                       });

  oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE)
     .unwrap();
  assert_eq!(oic.register(&LIGHT, Light { on: true }, Flags::ACTIVE),
             Err(Error::DuplicatePath));

  let res = ResourceType::new("x", "oic.if.r").path("/oic/res");
  assert_eq!(oic.register(&res, (), Flags::ACTIVE), Err(Error::DuplicatePath));
}

fn anon(_: &mut (), _: &Request, _: &mut Response) -> Code {
  code::CONTENT
}

#[test]
fn generated_paths() {
  let (mut oic, shared) = server();
  let rt = ResourceType::new("x.anon", "oic.if.r").get(anon);
  let a = oic.register(&rt, (), Flags::ACTIVE).unwrap();
  let b = oic.register(&rt, (), Flags::ACTIVE).unwrap();

  let a = oic.href(a).map(String::from).unwrap();
  let b = oic.href(b).map(String::from).unwrap();
  assert!(a.starts_with("/sol/"));
  assert!(b.starts_with("/sol/"));
  assert_ne!(a, b);

  let rep = get(&mut oic, &shared, &a);
  assert_eq!(rep.code, code::CONTENT);
}

#[test]
fn version_mismatch() {
  let (mut oic, _) = server();
  let mut rt = LIGHT;
  rt.api_version = 2;
  assert_eq!(oic.register(&rt, Light { on: false }, Flags::ACTIVE),
             Err(Error::VersionMismatch { expected: 1,
                                          found: 2 }));
}

#[test]
fn failed_registration_is_rolled_back() {
  let (mut oic, shared) = server();
  shared.borrow_mut().fail_register = vec![Channel::Dtls];

  assert_eq!(oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE),
             Err(Error::Transport(Channel::Dtls)));
  assert!(!shared.borrow()
                 .registered_on(Channel::Discovery)
                 .contains(&String::from("light/1")));
  assert!(!shared.borrow()
                 .registered_on(Channel::Unicast)
                 .contains(&String::from("light/1")));

  shared.borrow_mut().fail_register.clear();
  oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE)
     .unwrap();
}

#[test]
fn double_unregister() {
  let (mut oic, shared) = server();
  let id = oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE)
              .unwrap();
  oic.unregister(id).unwrap();
  assert_eq!(oic.unregister(id), Err(Error::NotFound));
  assert_eq!(oic.href(id), None);
  assert_eq!(get(&mut oic, &shared, "/light/1").code, code::NOT_FOUND);
}

#[test]
fn get_only_resource_rejects_other_methods() {
  let (mut oic, shared) = server();
  let rt = ResourceType::new("x", "oic.if.r").path("/ro")
                                             .get(light_get);
  oic.register(&rt, Light { on: true }, Flags::ACTIVE)
     .unwrap();

  assert_eq!(get(&mut oic, &shared, "/ro").code, code::CONTENT);
  [Method::PUT, Method::POST, Method::DELETE].iter()
                                             .for_each(|&m| {
                                               let mut req = Packet::request(m, "/ro");
                                               req.content_format = Some(crate::repr::CONTENT_FORMAT);
                                               req.payload = vec![0xa0];
                                               let (_, rep) = exchange(&mut oic, &shared, Channel::Unicast, req);
                                               assert_eq!(rep.code, code::NOT_IMPLEMENTED);
                                             });
}

#[test]
fn light_scenario() {
  let (mut oic, shared) = server();
  oic.register(&LIGHT, Light { on: false }, Flags::DISCOVERABLE | Flags::ACTIVE)
     .unwrap();

  let rep = get(&mut oic, &shared, "/light/1");
  assert_eq!(rep.code, code::CONTENT);
  assert_eq!(MapReader::parse(&rep.payload).unwrap().get("value"),
             Some(Value::Bool(false)));

  let mut put = Packet::request(Method::PUT, "/light/1");
  put.content_format = Some(crate::repr::CONTENT_FORMAT);
  put.payload = vec![0xa1, 0x65, b'v', b'a', b'l', b'u', b'e', 0xf5];
  let (_, rep) = exchange(&mut oic, &shared, Channel::Unicast, put.clone());
  assert_eq!(rep.code, code::CHANGED);

  let rep = get(&mut oic, &shared, "/light/1");
  assert_eq!(MapReader::parse(&rep.payload).unwrap().get("value"),
             Some(Value::Bool(true)));

  put.content_format = None;
  let (_, rep) = exchange(&mut oic, &shared, Channel::Unicast, put);
  assert_eq!(rep.code, code::BAD_REQUEST);
}

#[test]
fn responses_echo_id_and_token() {
  let (mut oic, shared) = server();
  let mut req = Packet::request(Method::GET, "/oic/d");
  req.id = toad_msg::Id(77);
  req.token = toad_msg::Token(tinyvec::array_vec!([u8; 8] => 1, 2, 3));

  let (_, rep) = exchange(&mut oic, &shared, Channel::Unicast, req.clone());
  assert_eq!(rep.id, req.id);
  assert_eq!(rep.token, req.token);
}

#[test]
fn non_requests_are_ignored() {
  let (mut oic, shared) = server();
  let mut msg = Packet::request(Method::GET, "/oic/d");
  msg.ty = Type::Ack;
  assert_eq!(oic.handle(Channel::Unicast, Addrd(msg, addr())),
             Err(Error::NotARequest));

  let msg = Packet::new(Type::Con, code::CONTENT);
  assert_eq!(oic.handle(Channel::Unicast, Addrd(msg, addr())),
             Err(Error::NotARequest));
  assert!(shared.borrow().sent.is_empty());
}

#[test]
fn close_failure_is_internal_error() {
  let config = Config { max_payload: 8,
                        ..Default::default() };
  let (mut oic, shared) = server_with(config, PlatformMock::default(), Shared::default());
  oic.init().unwrap();
  oic.register(&LIGHT, Light { on: true }, Flags::ACTIVE)
     .unwrap();

  let rep = get(&mut oic, &shared, "/light/1");
  assert_eq!(rep.code, code::INTERNAL_SERVER_ERROR);
  assert!(rep.payload.is_empty());
  assert_eq!(rep.content_format, None);
}

#[test]
fn device_resource() {
  let (mut oic, shared) = server();
  let rep = get(&mut oic, &shared, "/oic/d");
  assert_eq!(rep.code, code::CONTENT);

  let map = MapReader::parse(&rep.payload).unwrap();
  assert_eq!(map.get("n"), Some(Value::Text("Unknown")));
  assert_eq!(map.get("icv"), Some(Value::Text("core.1.0.0")));
  assert_eq!(map.get("dmv"), Some(Value::Text("res.1.0.0")));
  assert_eq!(map.get("di"),
             Some(Value::Text("42424242-4242-4242-4242-424242424242")));
}

#[test]
fn legacy_device_id() {
  let config = Config { compat: Compat::Oic1_0,
                        ..Default::default() };
  let (mut oic, shared) = server_with(config, PlatformMock::default(), Shared::default());
  oic.init().unwrap();

  let rep = get(&mut oic, &shared, "/oic/d");
  assert_eq!(MapReader::parse(&rep.payload).unwrap().get("di"),
             Some(Value::Bytes(&[0x42; 16])));

  let rep = discover(&mut oic, &shared, &[]);
  assert_eq!(&rep.payload[..6], &[0x81, 0xa2, 0x62, b'd', b'i', 0x50]);
}

#[test]
fn platform_resource() {
  let (mut oic, shared) = server();
  let rep = get(&mut oic, &shared, "/oic/p");
  assert_eq!(rep.code, code::CONTENT);

  let map = MapReader::parse(&rep.payload).unwrap();
  let keys = map.iter().map(|(k, _)| k).collect::<Vec<_>>();
  assert_eq!(keys,
             vec!["mnmn", "mnml", "mnmo", "mndt", "mnpv", "mnhw", "mnfv", "mnsl", "pi", "st",
                  "mnos"]);
  assert_eq!(map.get("mnmn"), Some(Value::Text("Unknown")));
  assert_eq!(map.get("mnos"), Some(Value::Text("6.1.0")));

  let platform = PlatformMock { os_version: None,
                                ..Default::default() };
  let (mut oic, shared) = server_with(Config::default(), platform, Shared::default());
  oic.init().unwrap();
  let rep = get(&mut oic, &shared, "/oic/p");
  assert_eq!(MapReader::parse(&rep.payload).unwrap().get("mnos"),
             Some(Value::Text("Unknown")));
}

#[test]
fn missing_machine_id() {
  let platform = PlatformMock { machine_id: None,
                                ..Default::default() };
  let (mut oic, shared) = server_with(Config::default(), platform, Shared::default());
  oic.init().unwrap();

  let rep = get(&mut oic, &shared, "/oic/d");
  assert_eq!(rep.code, code::INTERNAL_SERVER_ERROR);
  assert!(rep.payload.is_empty());

  assert_eq!(discover(&mut oic, &shared, &[]).code,
             code::INTERNAL_SERVER_ERROR);
  assert_eq!(get(&mut oic, &shared, "/oic/p").code, code::CONTENT);
}

#[test]
fn notify_fans_out() {
  let (mut oic, shared) = server();
  let id = oic.register(&LIGHT,
                        Light { on: false },
                        Flags::DISCOVERABLE | Flags::ACTIVE | Flags::OBSERVABLE)
              .unwrap();

  let mut n = oic.notification_new(id).unwrap();
  n.writer_mut().append("value", true).unwrap();
  oic.notify(n).unwrap();

  let shared = shared.borrow();
  assert_eq!(shared.notified.len(), 2);
  let (uc, ub, um) = &shared.notified[0];
  let (dc, db, dm) = &shared.notified[1];
  assert_eq!((*uc, *dc), (Channel::Unicast, Channel::Dtls));
  assert_eq!(ub, db);
  assert_eq!(ub.segments(), &["light", "1"]);

  assert!(Rc::ptr_eq(um, dm));
  assert_eq!(Rc::strong_count(um), 2);
  assert_eq!(um.ty, Type::Ack);
  assert_eq!(um.code, code::CONTENT);
  assert_eq!(MapReader::parse(&um.payload).unwrap().get("value"),
             Some(Value::Bool(true)));
}

#[test]
fn notify_without_dtls() {
  let (mut oic, shared) = server_with(Config::default(),
                                      PlatformMock::default(),
                                      Shared { fail_bind: vec![Channel::Dtls],
                                               ..Default::default() });
  oic.init().unwrap();
  let id = oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE)
              .unwrap();

  oic.notify(oic.notification_new(id).unwrap()).unwrap();
  let shared = shared.borrow();
  assert_eq!(shared.notified.len(), 1);
  assert_eq!(shared.notified[0].0, Channel::Unicast);
}

#[test]
fn notify_unicast_failure_skips_dtls() {
  let (mut oic, shared) = server();
  let id = oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE)
              .unwrap();
  shared.borrow_mut().fail_send = vec![Channel::Unicast];

  let n = oic.notification_new(id).unwrap();
  assert_eq!(oic.notify(n), Err(Error::Transport(Channel::Unicast)));
  assert!(shared.borrow().notified.is_empty());
}

#[test]
fn notify_reports_dtls_failure() {
  let (mut oic, shared) = server();
  let id = oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE)
              .unwrap();
  shared.borrow_mut().fail_send = vec![Channel::Dtls];

  let n = oic.notification_new(id).unwrap();
  assert_eq!(oic.notify(n), Err(Error::Transport(Channel::Dtls)));

  let shared = shared.borrow();
  assert_eq!(shared.notified.len(), 1);
  assert_eq!(shared.notified[0].0, Channel::Unicast);
}

#[test]
fn notify_unregistered() {
  let (mut oic, shared) = server();
  let id = oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE)
              .unwrap();
  let n = oic.notification_new(id).unwrap();
  oic.unregister(id).unwrap();

  assert_eq!(oic.notify(n), Err(Error::NotFound));
  assert_eq!(oic.notification_new(id), Err(Error::NotFound));
  assert!(shared.borrow().notified.is_empty());
}

#[test]
fn notification_without_content() {
  let (mut oic, shared) = server();
  let id = oic.register(&LIGHT, Light { on: false }, Flags::ACTIVE)
              .unwrap();
  oic.notify(oic.notification_new(id).unwrap()).unwrap();

  let shared = shared.borrow();
  let (_, _, msg) = &shared.notified[0];
  assert!(msg.payload.is_empty());
  assert_eq!(msg.content_format, None);
}

type Parked = Rc<RefCell<Vec<PendingRequest>>>;

fn park(parked: &mut Parked, _: &Request, rep: &mut Response) -> Code {
  if let Some(pending) = rep.defer() {
    parked.borrow_mut().push(pending);
  }
  code::CONTENT
}

const LATER: ResourceType<'static, Parked> =
  ResourceType::new("x.later", "oic.if.r").path("/later").get(park);

fn parked(oic: &mut Server) -> (ResourceId, Parked) {
  let parked = Parked::default();
  let id = oic.register(&LATER, Rc::clone(&parked), Flags::ACTIVE)
              .unwrap();
  (id, parked)
}

#[test]
fn deferred_answer() {
  let (mut oic, shared) = server();
  let (_, parked) = parked(&mut oic);

  let mut req = Packet::request(Method::GET, "/later");
  req.id = toad_msg::Id(5);
  req.token = toad_msg::Token(tinyvec::array_vec!([u8; 8] => 9, 9));
  oic.handle(Channel::Unicast, Addrd(req.clone(), addr()))
     .unwrap();
  assert!(shared.borrow().sent.is_empty());

  let pending = parked.borrow_mut().pop().unwrap();
  assert_eq!(pending.href(), "/later");
  assert_eq!(pending.addr(), addr());

  let mut rep = oic.response_new(&pending).unwrap();
  rep.writer_mut().append("done", true).unwrap();
  oic.send_response(pending, rep, code::CONTENT).unwrap();

  let (channel, rep) = shared.borrow().last_sent().unwrap();
  assert_eq!(channel, Channel::Unicast);
  assert_eq!(rep.ty, Type::Ack);
  assert_eq!(rep.code, code::CONTENT);
  assert_eq!((rep.id, rep.token), (req.id, req.token));
  assert_eq!(MapReader::parse(&rep.payload).unwrap().get("done"),
             Some(Value::Bool(true)));
}

#[test]
fn deferred_multicast_request_is_answered_via_unicast() {
  let (mut oic, shared) = server();
  let (_, parked) = parked(&mut oic);
  oic.handle(Channel::Discovery,
             Addrd(Packet::request(Method::GET, "/later"), addr()))
     .unwrap();

  let pending = parked.borrow_mut().pop().unwrap();
  assert_eq!(pending.channel(), Channel::Discovery);
  let rep = oic.response_new(&pending).unwrap();
  oic.send_response(pending, rep, code::DELETED).unwrap();

  let shared = shared.borrow();
  assert!(shared.sent_on(Channel::Discovery).is_empty());
  let sent = shared.sent_on(Channel::Unicast);
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].code, code::DELETED);
  assert_eq!(sent[0].content_format, None);
  assert!(sent[0].payload.is_empty());
}

#[test]
fn deferred_answer_outlives_its_resource() {
  let (mut oic, shared) = server();
  let (id, parked) = parked(&mut oic);
  get_later(&mut oic);

  oic.unregister(id).unwrap();
  assert_eq!(Rc::strong_count(&parked), 1);

  let pending = parked.borrow_mut().pop().unwrap();
  let rep = oic.response_new(&pending).unwrap();
  oic.send_response(pending, rep, code::CONTENT).unwrap();
  assert_eq!(shared.borrow().sent_on(Channel::Unicast).len(), 1);
}

fn get_later(oic: &mut Server) {
  oic.handle(Channel::Unicast,
             Addrd(Packet::request(Method::GET, "/later"), addr()))
     .unwrap();
}

#[test]
fn deferred_answer_across_restart_is_refused() {
  let (mut oic, shared) = server();
  let (_, parked) = parked(&mut oic);
  get_later(&mut oic);
  get_later(&mut oic);

  let mut pending = parked.borrow_mut().drain(..).collect::<Vec<_>>();
  let second = pending.pop().unwrap();
  let first = pending.pop().unwrap();
  let first_rep = oic.response_new(&first).unwrap();
  let second_rep = oic.response_new(&second).unwrap();

  oic.release().unwrap();
  assert_eq!(oic.send_response(first, first_rep, code::CONTENT),
             Err(Error::NotInitialized));

  oic.init().unwrap();
  assert_eq!(oic.response_new(&second), Err(Error::StaleRequest));
  assert_eq!(oic.send_response(second, second_rep, code::CONTENT),
             Err(Error::StaleRequest));
  assert!(shared.borrow().sent.is_empty());
}

#[test]
fn deferred_close_failure_is_internal_error() {
  let config = Config { max_payload: 8,
                        ..Default::default() };
  let (mut oic, shared) = server_with(config, PlatformMock::default(), Shared::default());
  oic.init().unwrap();
  let (_, parked) = parked(&mut oic);
  get_later(&mut oic);

  let pending = parked.borrow_mut().pop().unwrap();
  let mut rep = oic.response_new(&pending).unwrap();
  rep.writer_mut().append("a", 1u8).unwrap();
  rep.writer_mut().append("bc", 1u8).unwrap();
  oic.send_response(pending, rep, code::CONTENT).unwrap();

  let (_, rep) = shared.borrow().last_sent().unwrap();
  assert_eq!(rep.code, code::INTERNAL_SERVER_ERROR);
  assert_eq!(rep.content_format, None);
  assert!(rep.payload.is_empty());
}

fn oversized(_: &mut (), _: &Request, rep: &mut Response) -> Code {
  let long = "x".repeat(2048);
  match rep.writer_mut().append("long", long.as_str()) {
    | Ok(()) => code::CONTENT,
    | Err(_) => code::DELETED,
  }
}

#[test]
fn failed_append_leaves_reply_without_payload() {
  let (mut oic, shared) = server();
  let rt = ResourceType::new("x.big", "oic.if.r").path("/big")
                                                 .get(oversized);
  oic.register(&rt, (), Flags::ACTIVE).unwrap();

  let rep = get(&mut oic, &shared, "/big");
  assert_eq!(rep.code, code::DELETED);
  assert_eq!(rep.content_format, None);
  assert!(rep.payload.is_empty());
}

#[test]
fn discovery_ignores_queries_past_the_second() {
  let (mut oic, shared) = server();
  let rep = discover(&mut oic, &shared, &["rt=oic.wk.d", "if=oic.if.r", "bogus"]);
  assert_eq!(rep.code, code::CONTENT);
  assert!(mentions(&rep.payload, "/oic/d"));
  assert!(!mentions(&rep.payload, "/oic/p"));
}
