use serde::Deserialize;

/// Where device registrations live and how this device is identified.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DeviceStoreConfig {
    /// Firestore collection holding one registration document per user
    pub collection_path: String,
}

impl Default for DeviceStoreConfig {
    fn default() -> Self {
        Self { collection_path: "user-devices".to_string() }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct FirestoreConfig {
    /// Firebase project id
    pub project_id: String,

    /// Firestore database id
    #[serde(default = "default_database_id")]
    pub database_id: String,

    /// Override for the Firestore REST endpoint, e.g. a local emulator
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_database_id() -> String {
    "(default)".to_string()
}

impl FirestoreConfig {
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self { project_id: project_id.into(), database_id: default_database_id(), endpoint: None }
    }
}
