//! Registry module for Docker registry interactions
//!
//! Endpoint discovery, bearer authentication and the HTTP transport for the
//! Registry API v2.

pub mod auth;
pub mod endpoint;
pub mod transport;

pub use auth::{Auth, Credentials};
pub use endpoint::{ApiVersion, ConfiguredEndpoints, Endpoint, EndpointConfig, EndpointLookup};
pub use transport::{
    ApiSupport, BlobPutRequest, BlobRequest, HttpTransport, ManifestPutRequest, RegistryTransport,
    TransportConfig,
};
