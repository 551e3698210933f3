//! Automatic FCM device registration for signed-in Firebase users.
//!
//! One document per user in Cloud Firestore tracks every device the user is
//! signed in on. [`DeviceStore`] keeps this device's entry in that document
//! up to date as sessions start, tokens rotate and users sign out.

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;

pub use adapters::device_info::StaticDeviceInfo;
pub use adapters::firestore::{BearerTokenSource, FirestoreDocumentStore};
pub use adapters::messaging::TokenRelay;
pub use config::{DeviceStoreConfig, FirestoreConfig};
pub use domain::device::{DeviceRecord, UserDevices};
pub use domain::user::AuthUser;
pub use error::{DeviceStoreError, Result};
pub use services::device_info::DeviceDescriber;
pub use services::device_store::{DeviceStore, DeviceStoreBuilder};
pub use services::documents::{DocumentPath, DocumentStore, FieldPath, StoreError};
pub use services::permissions::{AlwaysAllowed, NotificationPermissions};
pub use services::session::SessionProvider;
pub use services::tokens::{TokenError, TokenIssuer, TokenRotation};
