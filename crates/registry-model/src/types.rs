//! Value types embedded in the instance record.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a registered instance as reported to the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// Ready to receive traffic.
    Up,
    /// Registered but failing its health check.
    Down,
    /// Still initialising; not yet ready for traffic.
    Starting,
    /// Deliberately taken out of rotation.
    OutOfService,
    /// Status not known. Unrecognised values on the wire read as this.
    #[default]
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    /// Returns the wire spelling (`"UP"`, `"OUT_OF_SERVICE"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Starting => "STARTING",
            Self::OutOfService => "OUT_OF_SERVICE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change kind attached to instances in a delta response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Added,
    Modified,
    Deleted,
}

// ---------------------------------------------------------------------------
// Network location
// ---------------------------------------------------------------------------

/// A port number together with whether the instance listens on it.
///
/// Rendered as `{"$": 8080, "@enabled": "true"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortWrapper {
    #[serde(rename = "$")]
    pub port: u16,
    #[serde(rename = "@enabled", with = "crate::string_encoded::flag")]
    pub enabled: bool,
}

impl PortWrapper {
    /// Plain-HTTP port used when none is registered.
    pub const DEFAULT_PORT: u16 = 7001;
    /// TLS port used when none is registered.
    pub const DEFAULT_SECURE_PORT: u16 = 7002;

    /// An enabled port.
    pub fn enabled(port: u16) -> Self {
        Self { port, enabled: true }
    }

    /// A disabled port.
    pub fn disabled(port: u16) -> Self {
        Self { port, enabled: false }
    }

    pub(crate) fn default_unsecure() -> Self {
        Self::enabled(Self::DEFAULT_PORT)
    }

    pub(crate) fn default_secure() -> Self {
        Self::disabled(Self::DEFAULT_SECURE_PORT)
    }
}

/// Data-center flavour the instance runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataCenterName {
    Netflix,
    Amazon,
    #[default]
    MyOwn,
}

/// Data-center record, tagged with the server-side class discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCenterInfo {
    #[serde(rename = "@class")]
    pub class_name: String,
    pub name: DataCenterName,
}

impl DataCenterInfo {
    /// Discriminator the server expects for non-cloud data centers.
    pub const DEFAULT_CLASS: &'static str = "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo";
}

impl Default for DataCenterInfo {
    fn default() -> Self {
        Self {
            class_name: Self::DEFAULT_CLASS.to_owned(),
            name: DataCenterName::MyOwn,
        }
    }
}

// ---------------------------------------------------------------------------
// Lease
// ---------------------------------------------------------------------------

/// Lease bookkeeping for one registration. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseInfo {
    #[serde(default = "LeaseInfo::default_renewal_interval")]
    pub renewal_interval_in_secs: u32,
    #[serde(default = "LeaseInfo::default_duration")]
    pub duration_in_secs: u32,
    #[serde(default)]
    pub registration_timestamp: u64,
    #[serde(default)]
    pub last_renewal_timestamp: u64,
    #[serde(default)]
    pub eviction_timestamp: u64,
    #[serde(default)]
    pub service_up_timestamp: u64,
}

impl LeaseInfo {
    pub const DEFAULT_RENEWAL_INTERVAL_SECS: u32 = 30;
    pub const DEFAULT_DURATION_SECS: u32 = 90;

    fn default_renewal_interval() -> u32 {
        Self::DEFAULT_RENEWAL_INTERVAL_SECS
    }

    fn default_duration() -> u32 {
        Self::DEFAULT_DURATION_SECS
    }
}

impl Default for LeaseInfo {
    fn default() -> Self {
        Self {
            renewal_interval_in_secs: Self::DEFAULT_RENEWAL_INTERVAL_SECS,
            duration_in_secs: Self::DEFAULT_DURATION_SECS,
            registration_timestamp: 0,
            last_renewal_timestamp: 0,
            eviction_timestamp: 0,
            service_up_timestamp: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unrecognised_status_reads_as_unknown() {
        let status: InstanceStatus = serde_json::from_value(json!("RESTARTING")).unwrap();
        assert_eq!(status, InstanceStatus::Unknown);
    }

    #[test]
    fn status_uses_screaming_case_on_the_wire() {
        assert_eq!(serde_json::to_value(InstanceStatus::OutOfService).unwrap(), json!("OUT_OF_SERVICE"));
        assert_eq!(InstanceStatus::OutOfService.to_string(), "OUT_OF_SERVICE");
    }

    #[test]
    fn port_wrapper_renders_enabled_as_string() {
        let value = serde_json::to_value(PortWrapper::enabled(8080)).unwrap();
        assert_eq!(value, json!({"$": 8080, "@enabled": "true"}));
    }

    #[test]
    fn port_wrapper_accepts_native_boolean() {
        let port: PortWrapper = serde_json::from_value(json!({"$": 443, "@enabled": false})).unwrap();
        assert_eq!(port, PortWrapper::disabled(443));
    }

    #[test]
    fn lease_defaults_apply_to_missing_fields() {
        let lease: LeaseInfo = serde_json::from_value(json!({"registration_timestamp": 5})).unwrap();
        assert_eq!(lease.renewal_interval_in_secs, 30);
        assert_eq!(lease.duration_in_secs, 90);
        assert_eq!(lease.registration_timestamp, 5);
    }
}
