use std_alloc::string::String;

/// Ports the server's listeners are bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Ports {
  /// Port of the multicast discovery listener.
  ///
  /// Defaults to the CoAP port, 5683.
  /// ```
  /// use oic_server::config::Ports;
  ///
  /// assert_eq!(Ports::default().discovery, 5683);
  /// ```
  pub discovery: u16,
  /// Port of the unicast listener replies and notifications leave from.
  ///
  /// Defaults to 0 (pick any free port).
  /// ```
  /// use oic_server::config::Ports;
  ///
  /// assert_eq!(Ports::default().unicast, 0);
  /// ```
  pub unicast: u16,
  /// Port of the DTLS listener. This is also the port advertised
  /// to clients for secure resources.
  ///
  /// Defaults to the CoAPS port, 5684.
  /// ```
  /// use oic_server::config::Ports;
  ///
  /// assert_eq!(Ports::default().dtls, 5684);
  /// ```
  pub dtls: u16,
}

impl Default for Ports {
  fn default() -> Self {
    Ports { discovery: 5683,
            unicast: 0,
            dtls: 5684 }
  }
}

/// Information served by `/oic/d`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceInfo {
  /// Human-friendly device name (`n`)
  pub name: String,
  /// Core specification version (`icv`)
  ///
  /// ```
  /// use oic_server::config::DeviceInfo;
  ///
  /// assert_eq!(DeviceInfo::default().spec_version, "core.1.0.0");
  /// ```
  pub spec_version: String,
  /// Resource data model version (`dmv`)
  ///
  /// ```
  /// use oic_server::config::DeviceInfo;
  ///
  /// assert_eq!(DeviceInfo::default().data_model_version, "res.1.0.0");
  /// ```
  pub data_model_version: String,
}

impl Default for DeviceInfo {
  fn default() -> Self {
    DeviceInfo { name: "Unknown".into(),
                 spec_version: "core.1.0.0".into(),
                 data_model_version: "res.1.0.0".into() }
  }
}

/// Information served by `/oic/p`.
///
/// Everything defaults to an empty string, except
/// the manufacturer name which defaults to `"Unknown"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlatformInfo {
  /// `mnmn`
  pub manufacturer_name: String,
  /// `mnml`
  pub manufacturer_url: String,
  /// `mnmo`
  pub model_number: String,
  /// `mndt`
  pub manufacture_date: String,
  /// `mnpv`
  pub platform_version: String,
  /// `mnhw`
  pub hardware_version: String,
  /// `mnfv`
  pub firmware_version: String,
  /// `mnsl`
  pub support_url: String,
  /// `pi`
  pub platform_id: String,
}

impl Default for PlatformInfo {
  fn default() -> Self {
    PlatformInfo { manufacturer_name: "Unknown".into(),
                   manufacturer_url: String::new(),
                   model_number: String::new(),
                   manufacture_date: String::new(),
                   platform_version: String::new(),
                   hardware_version: String::new(),
                   firmware_version: String::new(),
                   support_url: String::new(),
                   platform_id: String::new() }
  }
}

/// Which revision of the discovery payload layout to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Compat {
  /// `di` is a UUID text string, `if` and `rt` are arrays of strings
  Oic1_1,
  /// `di` is the raw 16-byte machine id, `if` and `rt` are
  /// single space-separated strings
  Oic1_0,
}

impl Default for Compat {
  fn default() -> Self {
    Compat::Oic1_1
  }
}

/// Runtime config
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
  /// See [`Ports`]
  pub ports: Ports,
  /// See [`DeviceInfo`]
  pub device: DeviceInfo,
  /// See [`PlatformInfo`]
  pub platform: PlatformInfo,
  /// Payload layout for discovery and `/oic/d`.
  ///
  /// Defaults to [`Compat::Oic1_1`]
  /// ```
  /// use oic_server::config::{Compat, Config};
  ///
  /// assert_eq!(Config::default().compat, Compat::Oic1_1);
  /// ```
  pub compat: Compat,
  /// Largest representation (in bytes) a response or notification
  /// may carry. Appending past this fails, and a response whose map
  /// cannot be closed within it is answered with 5.00.
  ///
  /// Defaults to 1024 bytes.
  /// ```
  /// use oic_server::config::Config;
  ///
  /// assert_eq!(Config::default().max_payload, 1024);
  /// ```
  pub max_payload: usize,
}

impl Default for Config {
  fn default() -> Self {
    Config { ports: Ports::default(),
             device: DeviceInfo::default(),
             platform: PlatformInfo::default(),
             compat: Compat::default(),
             max_payload: 1024 }
  }
}
