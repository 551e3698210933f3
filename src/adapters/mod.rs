pub mod device_info;
pub mod firestore;
pub mod messaging;
