use crate::services::documents::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceStoreError {
    #[error("Notifications are not enabled")]
    NotificationsDisabled,
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, DeviceStoreError>;
