//! The instance record and its fixed wire layout.
//!
//! [`InstanceInfo`] does not derive `Serialize`. The registry expects a
//! historical layout that a field-by-field derive cannot produce (wrapped
//! ports, string-encoded flags and timestamps, an explicit empty-map marker
//! for metadata), so the record is written by a hand-written serializer that
//! enumerates the layout explicitly. Adding a field to the struct therefore
//! never changes what goes on the wire until the layout below is updated.
//!
//! The serializer distinguishes verbose and compact output through
//! [`serde::Serializer::is_human_readable`]: verbose (human-readable) output
//! always writes `metadata`, using the empty-map marker when there is none;
//! compact output leaves empty metadata out.

use std::collections::BTreeMap;

use serde::ser::{self, SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::string_encoded;
use crate::types::{ActionType, DataCenterInfo, InstanceStatus, LeaseInfo, PortWrapper};
use crate::wire::WireEntity;

/// Key of the class discriminator the server writes into an empty metadata map.
pub const METADATA_CLASS_KEY: &str = "@class";

/// Class discriminator marking an empty metadata map.
pub const EMPTY_METADATA_CLASS: &str = "java.util.Collections$EmptyMap";

/// Country id the server assigns when none is given.
const DEFAULT_COUNTRY_ID: u32 = 1;

/// Number of fields written for every instance regardless of content.
const ALWAYS_WRITTEN: usize = 12;

/// One registered service instance: identity, network location, status, and
/// free-form metadata.
///
/// `app`, `host_name`, and `ip_addr` form the required identity. Reading a
/// record without them fails; writing a record where any of them is empty
/// fails without producing partial output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstanceInfo {
    /// Server-unique id. Servers fall back to `host_name` when absent.
    #[serde(default)]
    pub instance_id: Option<String>,

    /// Application name, conventionally upper-case.
    pub app: String,

    #[serde(default)]
    pub app_group_name: Option<String>,

    pub ip_addr: String,

    pub host_name: String,

    #[serde(default)]
    pub status: InstanceStatus,

    #[serde(default)]
    pub overridden_status: InstanceStatus,

    #[serde(default = "PortWrapper::default_unsecure")]
    pub port: PortWrapper,

    #[serde(default = "PortWrapper::default_secure")]
    pub secure_port: PortWrapper,

    #[serde(default = "default_country_id")]
    pub country_id: u32,

    #[serde(default)]
    pub data_center_info: DataCenterInfo,

    #[serde(default)]
    pub lease_info: Option<LeaseInfo>,

    /// User-supplied key/value pairs. Keys are never renamed by the codec.
    #[serde(default, deserialize_with = "deserialize_metadata")]
    pub metadata: BTreeMap<String, String>,

    #[serde(default)]
    pub home_page_url: Option<String>,

    #[serde(default)]
    pub status_page_url: Option<String>,

    #[serde(default)]
    pub health_check_url: Option<String>,

    #[serde(default)]
    pub secure_health_check_url: Option<String>,

    #[serde(default)]
    pub vip_address: Option<String>,

    #[serde(default)]
    pub secure_vip_address: Option<String>,

    #[serde(default, deserialize_with = "string_encoded::flag::deserialize")]
    pub is_coordinating_discovery_server: bool,

    /// Epoch milliseconds.
    #[serde(default, deserialize_with = "string_encoded::millis::deserialize")]
    pub last_updated_timestamp: u64,

    /// Epoch milliseconds of the last local change not yet acknowledged by
    /// the server. Sent with heartbeats and status updates.
    #[serde(default, deserialize_with = "string_encoded::millis::deserialize")]
    pub last_dirty_timestamp: u64,

    #[serde(default)]
    pub action_type: Option<ActionType>,
}

fn default_country_id() -> u32 {
    DEFAULT_COUNTRY_ID
}

impl InstanceInfo {
    /// Creates a record with the required identity and server defaults for
    /// everything else.
    pub fn new(app: impl Into<String>, host_name: impl Into<String>, ip_addr: impl Into<String>) -> Self {
        Self {
            instance_id: None,
            app: app.into(),
            app_group_name: None,
            ip_addr: ip_addr.into(),
            host_name: host_name.into(),
            status: InstanceStatus::Up,
            overridden_status: InstanceStatus::Unknown,
            port: PortWrapper::default_unsecure(),
            secure_port: PortWrapper::default_secure(),
            country_id: DEFAULT_COUNTRY_ID,
            data_center_info: DataCenterInfo::default(),
            lease_info: None,
            metadata: BTreeMap::new(),
            home_page_url: None,
            status_page_url: None,
            health_check_url: None,
            secure_health_check_url: None,
            vip_address: None,
            secure_vip_address: None,
            is_coordinating_discovery_server: false,
            last_updated_timestamp: 0,
            last_dirty_timestamp: 0,
            action_type: None,
        }
    }

    /// The id the server files this record under: `instance_id` when set,
    /// otherwise `host_name`.
    pub fn id(&self) -> &str {
        self.instance_id.as_deref().unwrap_or(&self.host_name)
    }

    fn missing_identity_field(&self) -> Option<&'static str> {
        [("app", &self.app), ("host_name", &self.host_name), ("ip_addr", &self.ip_addr)]
            .into_iter()
            .find(|(_, value)| value.is_empty())
            .map(|(field, _)| field)
    }

    fn optional_field_count(&self) -> usize {
        [
            self.instance_id.is_some(),
            self.app_group_name.is_some(),
            self.lease_info.is_some(),
            self.home_page_url.is_some(),
            self.status_page_url.is_some(),
            self.health_check_url.is_some(),
            self.secure_health_check_url.is_some(),
            self.vip_address.is_some(),
            self.secure_vip_address.is_some(),
            self.action_type.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

impl WireEntity for InstanceInfo {
    const ROOT_NAME: &'static str = "instance";
}

impl Serialize for InstanceInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(field) = self.missing_identity_field() {
            return Err(ser::Error::custom(format_args!(
                "instance record is missing required field `{field}`"
            )));
        }

        let verbose = serializer.is_human_readable();
        let write_metadata = verbose || !self.metadata.is_empty();
        let len = ALWAYS_WRITTEN + self.optional_field_count() + usize::from(write_metadata);

        let mut state = serializer.serialize_struct("InstanceInfo", len)?;
        if let Some(instance_id) = &self.instance_id {
            state.serialize_field("instance_id", instance_id)?;
        }
        state.serialize_field("host_name", &self.host_name)?;
        state.serialize_field("app", &self.app)?;
        if let Some(group) = &self.app_group_name {
            state.serialize_field("app_group_name", group)?;
        }
        state.serialize_field("ip_addr", &self.ip_addr)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("overridden_status", &self.overridden_status)?;
        state.serialize_field("port", &self.port)?;
        state.serialize_field("secure_port", &self.secure_port)?;
        state.serialize_field("country_id", &self.country_id)?;
        state.serialize_field("data_center_info", &self.data_center_info)?;
        if let Some(lease) = &self.lease_info {
            state.serialize_field("lease_info", lease)?;
        }
        if !self.metadata.is_empty() {
            state.serialize_field("metadata", &self.metadata)?;
        } else if verbose {
            state.serialize_field("metadata", &EmptyMetadataMarker)?;
        }
        if let Some(url) = &self.home_page_url {
            state.serialize_field("home_page_url", url)?;
        }
        if let Some(url) = &self.status_page_url {
            state.serialize_field("status_page_url", url)?;
        }
        if let Some(url) = &self.health_check_url {
            state.serialize_field("health_check_url", url)?;
        }
        if let Some(url) = &self.secure_health_check_url {
            state.serialize_field("secure_health_check_url", url)?;
        }
        if let Some(vip) = &self.vip_address {
            state.serialize_field("vip_address", vip)?;
        }
        if let Some(vip) = &self.secure_vip_address {
            state.serialize_field("secure_vip_address", vip)?;
        }
        state.serialize_field(
            "is_coordinating_discovery_server",
            if self.is_coordinating_discovery_server { "true" } else { "false" },
        )?;
        state.serialize_field("last_updated_timestamp", &self.last_updated_timestamp.to_string())?;
        state.serialize_field("last_dirty_timestamp", &self.last_dirty_timestamp.to_string())?;
        if let Some(action) = &self.action_type {
            state.serialize_field("action_type", action)?;
        }
        state.end()
    }
}

struct EmptyMetadataMarker;

impl Serialize for EmptyMetadataMarker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(METADATA_CLASS_KEY, EMPTY_METADATA_CLASS)?;
        map.end()
    }
}

fn deserialize_metadata<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut metadata = Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default();
    if metadata.len() == 1 && metadata.get(METADATA_CLASS_KEY).is_some_and(|class| class == EMPTY_METADATA_CLASS) {
        metadata.remove(METADATA_CLASS_KEY);
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample() -> InstanceInfo {
        let mut instance = InstanceInfo::new("ORDERS", "orders-1.internal", "10.0.0.7");
        instance.instance_id = Some("orders-1:8080".to_owned());
        instance.port = PortWrapper::enabled(8080);
        instance.last_dirty_timestamp = 1_700_000_000_123;
        instance
    }

    #[test]
    fn verbose_layout_writes_wrapped_ports_and_string_flags() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["port"], json!({"$": 8080, "@enabled": "true"}));
        assert_eq!(value["secure_port"], json!({"$": 7002, "@enabled": "false"}));
        assert_eq!(value["is_coordinating_discovery_server"], json!("false"));
        assert_eq!(value["last_dirty_timestamp"], json!("1700000000123"));
        assert_eq!(value["metadata"], json!({"@class": "java.util.Collections$EmptyMap"}));
    }

    #[test]
    fn layout_orders_identity_first() {
        let value = serde_json::to_value(sample()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(&keys[..4], &["instance_id", "host_name", "app", "ip_addr"]);
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let value = serde_json::to_value(sample()).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("lease_info"));
        assert!(!object.contains_key("home_page_url"));
        assert!(!object.contains_key("action_type"));
    }

    #[test]
    fn missing_identity_fails_serialization() {
        let mut instance = sample();
        instance.ip_addr.clear();
        let err = serde_json::to_value(instance).unwrap_err();
        assert!(err.to_string().contains("ip_addr"), "{err}");
    }

    #[test]
    fn missing_identity_fails_deserialization() {
        let err = serde_json::from_value::<InstanceInfo>(json!({"host_name": "h", "ip_addr": "1.2.3.4"})).unwrap_err();
        assert!(err.to_string().contains("app"), "{err}");
    }

    #[test]
    fn empty_metadata_marker_is_stripped_on_input() {
        let value = serde_json::to_value(sample()).unwrap();
        let back: InstanceInfo = serde_json::from_value(value).unwrap();
        assert!(back.metadata.is_empty());
        assert_eq!(back, sample());
    }

    #[test]
    fn marker_key_among_real_entries_is_kept() {
        let mut instance = sample();
        instance.metadata.insert(METADATA_CLASS_KEY.to_owned(), EMPTY_METADATA_CLASS.to_owned());
        instance.metadata.insert("k".to_owned(), "v".to_owned());
        let value = serde_json::to_value(&instance).unwrap();
        let back: InstanceInfo = serde_json::from_value(value).unwrap();
        assert_eq!(back.metadata.len(), 2);
        assert_eq!(back, instance);
    }

    #[test]
    fn populated_metadata_round_trips() {
        let mut instance = sample();
        instance.metadata.insert("zoneName".to_owned(), "us-east-1a".to_owned());
        let value = serde_json::to_value(&instance).unwrap();
        assert_eq!(value["metadata"], json!({"zoneName": "us-east-1a"}));
        let back: InstanceInfo = serde_json::from_value(value).unwrap();
        assert_eq!(back, instance);
    }

    #[test]
    fn id_falls_back_to_host_name() {
        let mut instance = sample();
        assert_eq!(instance.id(), "orders-1:8080");
        instance.instance_id = None;
        assert_eq!(instance.id(), "orders-1.internal");
    }

    #[test]
    fn native_timestamps_are_accepted() {
        let mut value: Value = serde_json::to_value(sample()).unwrap();
        value["last_updated_timestamp"] = json!(42);
        value["is_coordinating_discovery_server"] = json!(true);
        let back: InstanceInfo = serde_json::from_value(value).unwrap();
        assert_eq!(back.last_updated_timestamp, 42);
        assert!(back.is_coordinating_discovery_server);
    }
}
