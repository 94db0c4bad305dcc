use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form server document stored on the order row as JSONB: the plan the
/// customer picked, the connection info filled in after provisioning, and an
/// append-only provisioning audit log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerDetails {
    pub plan: ServerPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionInfo>,
    #[serde(default)]
    pub provisioning_log: Vec<ProvisioningLogEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerPlan {
    pub name: String,
    pub location: String,
    pub memory_mb: i32,
    pub slots: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningLogStatus {
    Started,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvisioningLogEntry {
    pub status: ProvisioningLogStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl ProvisioningLogEntry {
    pub fn new(
        status: ProvisioningLogStatus,
        message: impl Into<String>,
        request: Option<Value>,
        response: Option<Value>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            request,
            response,
            created_at: Utc::now(),
        }
    }
}

impl ServerDetails {
    pub fn from_value(value: &Value) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_value(&self) -> anyhow::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// The provisioning log is append-only; existing entries are never rewritten.
    pub fn append_log(&mut self, entry: ProvisioningLogEntry) {
        self.provisioning_log.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entries_accumulate_in_order() {
        let mut details = ServerDetails::default();
        details.append_log(ProvisioningLogEntry::new(
            ProvisioningLogStatus::Started,
            "create requested",
            None,
            None,
        ));
        details.append_log(ProvisioningLogEntry::new(
            ProvisioningLogStatus::Failed,
            "panel unreachable",
            Some(serde_json::json!({"action": "create"})),
            None,
        ));

        assert_eq!(details.provisioning_log.len(), 2);
        assert_eq!(
            details.provisioning_log[0].status,
            ProvisioningLogStatus::Started
        );
        assert_eq!(
            details.provisioning_log[1].status,
            ProvisioningLogStatus::Failed
        );
    }

    #[test]
    fn survives_jsonb_round_trip() {
        let mut details = ServerDetails {
            plan: ServerPlan {
                name: "iron-4gb".to_string(),
                location: "sg".to_string(),
                memory_mb: 4096,
                slots: 20,
            },
            contact_email: Some("player@example.com".to_string()),
            connection: Some(ConnectionInfo {
                host: "node1.example.com".to_string(),
                port: 25565,
                panel_url: None,
            }),
            provisioning_log: vec![],
        };
        details.append_log(ProvisioningLogEntry::new(
            ProvisioningLogStatus::Success,
            "server allocated",
            None,
            Some(serde_json::json!({"server_id": "srv-1"})),
        ));

        let value = details.to_value().unwrap();
        let parsed = ServerDetails::from_value(&value).unwrap();
        assert_eq!(parsed, details);
    }
}
