//! `oic-server` is the server half of the Open Interconnect Consortium
//! (OIC) resource model, running on top of a CoAP transport.
//!
//! ## OIC
//! OIC devices expose **resources** (a light, a thermostat, a sensor reading)
//! at CoAP paths. Clients find them by asking any device for `/oic/res`,
//! usually via multicast, and then read or write them with plain
//! CoAP GET / PUT / POST / DELETE carrying CBOR maps.
//!
//! This crate provides:
//! - a resource registry with validated, unique paths
//! - the request / response lifecycle: dispatching inbound requests to
//!   resource callbacks, decoding request maps and encoding response maps
//! - the discovery responder (`/oic/res`) plus the device (`/oic/d`) and
//!   platform (`/oic/p`) resources every OIC server exposes
//! - observer notifications, fanned out over the insecure and DTLS listeners
//!
//! ## What this crate does not do
//! Sockets, CoAP framing, retransmission, observer bookkeeping and DTLS are
//! the transport's job. The transport is plugged in through the
//! [`net::Network`] and [`net::Listener`] traits and feeds parsed requests to
//! [`Oic::handle`].
//!
//! ```
//! use oic_server::code;
//! use oic_server::config::Config;
//! use oic_server::resource::{Flags, ResourceType};
//! use oic_server::server::{Request, Response};
//! # use oic_server::net::{Addrd, Binding, Channel, Listener, Network};
//! # use oic_server::packet::Packet;
//! # use oic_server::platform::Platform;
//! # use no_std_net::SocketAddr;
//! # use std::rc::Rc;
//! # #[derive(Debug)] struct Udp;
//! # impl Listener for Udp {
//! #   type Error = ();
//! #   fn register_resource(&mut self, _: &Binding) -> Result<(), ()> { Ok(()) }
//! #   fn unregister_resource(&mut self, _: &Binding) -> Result<(), ()> { Ok(()) }
//! #   fn send(&mut self, _: Addrd<Packet>) -> Result<(), ()> { Ok(()) }
//! #   fn send_notification(&mut self, _: &Binding, _: Rc<Packet>) -> Result<(), ()> { Ok(()) }
//! # }
//! # #[derive(Debug)] struct Net;
//! # impl Network for Net {
//! #   type Listener = Udp;
//! #   fn bind(&mut self, c: Channel, _: SocketAddr) -> Result<Udp, ()> {
//! #     if c == Channel::Dtls { Err(()) } else { Ok(Udp) }
//! #   }
//! #   fn secure(&mut self, _: &mut Udp, _: &mut Udp) -> Result<(), ()> { Ok(()) }
//! # }
//! # #[derive(Debug, Clone)] struct Host;
//! # impl Platform for Host {
//! #   fn machine_id(&self) -> Option<[u8; 16]> { Some([7; 16]) }
//! #   fn os_version(&self) -> Option<String> { None }
//! # }
//!
//! struct Light {
//!   on: bool,
//! }
//!
//! fn get(light: &mut Light, _: &Request, rep: &mut Response) -> oic_server::Code {
//!   match rep.writer_mut().append("value", light.on) {
//!     | Ok(()) => code::CONTENT,
//!     | Err(_) => code::INTERNAL_SERVER_ERROR,
//!   }
//! }
//!
//! let light = ResourceType::new("oic.r.switch.binary", "oic.if.a").path("/light/1")
//!                                                                  .get(get);
//!
//! let mut oic = oic_server::Oic::new(Net, Host, Config::default());
//! oic.init().unwrap();
//! let id = oic.register(&light, Light { on: false }, Flags::DISCOVERABLE | Flags::ACTIVE)
//!             .unwrap();
//! assert_eq!(oic.href(id), Some("/light/1"));
//! ```

#![doc(html_root_url = "https://docs.rs/oic-server/0.1.0")]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// features
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc as std_alloc;


pub(crate) mod logging;

mod registry;

/// response codes
pub mod code;

/// runtime configuration
pub mod config;

/// errors
pub mod error;

/// network contracts the transport implements
pub mod net;

/// CoAP messages as exchanged with the transport
pub mod packet;

/// host information (machine id, OS version)
pub mod platform;

/// reading and writing CBOR representation maps
pub mod repr;

/// resource descriptors and flags
pub mod resource;

/// the server context
pub mod server;

#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use server::Oic;
pub use toad_msg::Code;
