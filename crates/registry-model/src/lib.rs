//! Wire model for the service-registry transport.
//!
//! This crate contains every entity exchanged with the registry server, the
//! root-name tag each top-level payload is wrapped in, and the small value
//! types shared by the transport layer. It performs no I/O; the
//! `registry-transport` crate owns HTTP, TLS, and the JSON codec.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | [`RegistryEndpoint`] |
//! | [`types`] | Status enums, port wrapper, data-center and lease records |
//! | [`instance`] | [`InstanceInfo`] and its fixed wire layout |
//! | [`application`] | [`Application`] and [`Applications`] |
//! | [`wire`] | The [`WireEntity`] root-name tag |
//! | [`errors`] | [`RetryPolicy`] |

pub mod application;
pub mod errors;
pub mod identifiers;
pub mod instance;
pub mod types;
pub mod wire;

mod string_encoded;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use application::{Application, Applications};
pub use errors::RetryPolicy;
pub use identifiers::RegistryEndpoint;
pub use instance::{InstanceInfo, EMPTY_METADATA_CLASS, METADATA_CLASS_KEY};
pub use types::{ActionType, DataCenterInfo, DataCenterName, InstanceStatus, LeaseInfo, PortWrapper};
pub use wire::WireEntity;
