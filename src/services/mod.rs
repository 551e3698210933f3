pub mod device_info;
pub mod device_store;
pub mod documents;
pub mod permissions;
pub(crate) mod reconciler;
pub mod session;
pub mod tokens;
