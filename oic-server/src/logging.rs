use core::fmt::Write;

use std_alloc::string::String;

use crate::code;
use crate::packet::Packet;

pub(crate) const TARGET: &str = "oic";

pub(crate) fn summary(msg: &Packet) -> String {
  let mut buf = String::new();
  let human = code::to_human(msg.code);
  write!(buf,
         "{:?} {} {} with {} byte payload",
         msg.ty,
         core::str::from_utf8(&human).unwrap_or("?.??"),
         msg.href(),
         msg.payload.len()).ok();
  buf
}
