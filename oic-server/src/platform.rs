use std_alloc::string::String;

/// Host facts the server needs but cannot learn on its own
pub trait Platform {
  /// The 16-byte machine identifier the device id is derived from
  fn machine_id(&self) -> Option<[u8; 16]>;

  /// Operating system version, reported in `/oic/p`
  fn os_version(&self) -> Option<String>;
}

/// A device id: the machine id, and its upper-case hyphenated UUID form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId {
  bytes: [u8; 16],
  text: String,
}

impl DeviceId {
  /// Derive the device id for a machine id
  ///
  /// ```
  /// use oic_server::platform::DeviceId;
  ///
  /// let id = DeviceId::new([0xab; 16]);
  /// assert_eq!(id.as_str(), "ABABABAB-ABAB-ABAB-ABAB-ABABABABABAB");
  /// ```
  pub fn new(bytes: [u8; 16]) -> Self {
    let mut buf = uuid::Uuid::encode_buffer();
    let text = uuid::Uuid::from_bytes(bytes).hyphenated()
                                            .encode_upper(&mut buf);
    Self { bytes,
           text: String::from(&*text) }
  }

  /// The raw machine id
  pub fn bytes(&self) -> &[u8; 16] {
    &self.bytes
  }

  /// The UUID string
  pub fn as_str(&self) -> &str {
    &self.text
  }
}

/// [`Platform`] for hosts with a Linux-style filesystem,
/// reading `/etc/machine-id` and `/proc/sys/kernel/osrelease`.
#[cfg(feature = "std")]
#[cfg_attr(any(docsrs, feature = "docs"), doc(cfg(feature = "std")))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Std;

#[cfg(feature = "std")]
impl Std {
  const MACHINE_ID: &'static str = "/etc/machine-id";
  const OS_RELEASE: &'static str = "/proc/sys/kernel/osrelease";

  fn parse_machine_id(contents: &str) -> Option<[u8; 16]> {
    let mut id = [0u8; 16];
    hex::decode_to_slice(contents.trim(), &mut id).ok()
                                                  .map(|_| id)
  }
}

#[cfg(feature = "std")]
impl Platform for Std {
  fn machine_id(&self) -> Option<[u8; 16]> {
    std::fs::read_to_string(Self::MACHINE_ID).map_err(|e| {
                                               log::warn!(target: crate::logging::TARGET, "could not read {}: {}", Self::MACHINE_ID, e)
                                             })
                                             .ok()
                                             .and_then(|s| Self::parse_machine_id(&s))
  }

  fn os_version(&self) -> Option<String> {
    std::fs::read_to_string(Self::OS_RELEASE).ok()
                                             .map(|s| s.trim().into())
                                             .filter(|s: &String| !s.is_empty())
  }
}
