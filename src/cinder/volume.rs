/// Volume records and connection descriptors as returned by the volume API.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Volume lifecycle status.
///
/// Statuses this tool does not know about are kept verbatim in `Other` so
/// they round-trip unchanged into the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VolumeStatus {
    Creating,
    Available,
    Reserved,
    Attaching,
    Detaching,
    InUse,
    Maintenance,
    Deleting,
    AwaitingTransfer,
    Error,
    ErrorDeleting,
    BackingUp,
    RestoringBackup,
    ErrorBackingUp,
    ErrorRestoring,
    ErrorExtending,
    Downloading,
    Uploading,
    Retyping,
    Extending,
    Other(String),
}

impl VolumeStatus {
    /// Wire representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "creating",
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Attaching => "attaching",
            Self::Detaching => "detaching",
            Self::InUse => "in-use",
            Self::Maintenance => "maintenance",
            Self::Deleting => "deleting",
            Self::AwaitingTransfer => "awaiting-transfer",
            Self::Error => "error",
            Self::ErrorDeleting => "error_deleting",
            Self::BackingUp => "backing-up",
            Self::RestoringBackup => "restoring-backup",
            Self::ErrorBackingUp => "error_backing-up",
            Self::ErrorRestoring => "error_restoring",
            Self::ErrorExtending => "error_extending",
            Self::Downloading => "downloading",
            Self::Uploading => "uploading",
            Self::Retyping => "retyping",
            Self::Extending => "extending",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for VolumeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "creating" => Self::Creating,
            "available" => Self::Available,
            "reserved" => Self::Reserved,
            "attaching" => Self::Attaching,
            "detaching" => Self::Detaching,
            "in-use" => Self::InUse,
            "maintenance" => Self::Maintenance,
            "deleting" => Self::Deleting,
            "awaiting-transfer" => Self::AwaitingTransfer,
            "error" => Self::Error,
            "error_deleting" => Self::ErrorDeleting,
            "backing-up" => Self::BackingUp,
            "restoring-backup" => Self::RestoringBackup,
            "error_backing-up" => Self::ErrorBackingUp,
            "error_restoring" => Self::ErrorRestoring,
            "error_extending" => Self::ErrorExtending,
            "downloading" => Self::Downloading,
            "uploading" => Self::Uploading,
            "retyping" => Self::Retyping,
            "extending" => Self::Extending,
            _ => Self::Other(s),
        }
    }
}

impl From<VolumeStatus> for String {
    fn from(status: VolumeStatus) -> Self {
        match status {
            VolumeStatus::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A navigation link attached to an API resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub rel: String,
}

/// A volume record.
///
/// Keeps the object exactly as the server sent it, minus `links`, and exposes
/// a typed view of the fields the tool acts on. Serializing a `Volume` writes
/// back only the received fields, so reports never gain keys the server did
/// not send.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Volume {
    /// Volume UUID.
    pub id: String,
    /// Display name; the API allows unnamed volumes.
    pub name: Option<String>,
    /// Size in GiB.
    pub size: Option<u64>,
    /// Volume type name.
    pub volume_type: Option<String>,
    pub status: VolumeStatus,
    pub links: Vec<Link>,
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct VolumeView {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    volume_type: Option<String>,
    status: VolumeStatus,
    #[serde(default)]
    links: Vec<Link>,
}

impl TryFrom<Map<String, Value>> for Volume {
    type Error = serde_json::Error;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let view: VolumeView = serde_json::from_value(Value::Object(fields.clone()))?;
        fields.remove("links");
        Ok(Self {
            id: view.id,
            name: view.name,
            size: view.size,
            volume_type: view.volume_type,
            status: view.status,
            links: view.links,
            fields,
        })
    }
}

impl Serialize for Volume {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl Volume {
    /// Whether the volume is attached somewhere.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.status == VolumeStatus::InUse
    }

    /// Every field the server returned except `links`.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Connection descriptor returned by `os-initialize_connection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Transport tag, e.g. `iscsi` or `fibre_channel`.
    pub driver_volume_type: String,
    /// Protocol-specific attach data.
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn volume_json() -> Value {
        json!({
            "id": "6edbc2f4-1507-44f8-ac0d-eed1d2608d38",
            "name": "data01",
            "size": 10,
            "volume_type": "3par",
            "status": "in-use",
            "bootable": "false",
            "attachments": [{"server_id": "f4fda93b", "device": "/dev/vdb"}],
            "links": [
                {"href": "http://cinder:8776/v2/t/volumes/6edbc2f4", "rel": "self"},
                {"href": "http://cinder:8776/t/volumes/6edbc2f4", "rel": "bookmark"}
            ]
        })
    }

    #[test]
    fn test_volume_typed_fields() {
        let volume: Volume = serde_json::from_value(volume_json()).unwrap();
        assert_eq!(volume.name.as_deref(), Some("data01"));
        assert_eq!(volume.size, Some(10));
        assert!(volume.is_in_use());
        assert_eq!(volume.links.len(), 2);
        assert_eq!(volume.fields()["bootable"], json!("false"));
        assert!(!volume.fields().contains_key("links"));
    }

    #[test]
    fn test_volume_serialization_omits_links() {
        let volume: Volume = serde_json::from_value(volume_json()).unwrap();
        let value = serde_json::to_value(&volume).unwrap();
        let map = value.as_object().unwrap();
        assert!(!map.contains_key("links"));
        assert_eq!(map["status"], json!("in-use"));
        assert_eq!(map["attachments"][0]["device"], json!("/dev/vdb"));
    }

    #[test]
    fn test_unknown_status_round_trips() {
        let status: VolumeStatus = serde_json::from_value(json!("error_managing")).unwrap();
        assert_eq!(status, VolumeStatus::Other("error_managing".to_owned()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("error_managing"));
    }

    #[test]
    fn test_known_status_parses() {
        let status: VolumeStatus = serde_json::from_value(json!("available")).unwrap();
        assert_eq!(status, VolumeStatus::Available);
        assert_eq!(status.to_string(), "available");
    }

    #[test]
    fn test_unnamed_volume() {
        let volume: Volume = serde_json::from_value(json!({
            "id": "abc",
            "name": null,
            "size": 1,
            "status": "available"
        }))
        .unwrap();
        assert_eq!(volume.name, None);
        assert_eq!(volume.volume_type, None);
        assert!(!volume.is_in_use());
    }

    #[test]
    fn test_serialization_keeps_only_received_fields() {
        let volume: Volume = serde_json::from_value(json!({
            "id": "abc",
            "status": "available",
            "links": []
        }))
        .unwrap();
        assert_eq!(volume.size, None);
        assert_eq!(
            serde_json::to_value(&volume).unwrap(),
            json!({"id": "abc", "status": "available"})
        );
    }

    #[test]
    fn test_explicit_null_is_kept() {
        let volume: Volume = serde_json::from_value(json!({
            "id": "abc",
            "name": null,
            "size": 1,
            "status": "in-use"
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&volume).unwrap(),
            json!({"id": "abc", "name": null, "size": 1, "status": "in-use"})
        );
    }

    #[test]
    fn test_missing_status_is_rejected() {
        let err = serde_json::from_value::<Volume>(json!({"id": "abc"})).unwrap_err();
        assert!(err.to_string().contains("status"));
    }
}
