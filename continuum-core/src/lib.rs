pub mod config;
pub mod domain;
pub mod error;
pub mod model;
pub mod observability;

pub use config::{DomainConfig, RequestConfig};
pub use domain::{Domain, Envelope, Members, Resource, Service, Store};
pub use error::{ContinuumError, Result};
pub use model::{ContainerKind, Field, FieldKind, Model, ModelOverrides, Validated, ValidatedInstance};
