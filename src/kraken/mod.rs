//! Octopus Energy Japan (Kraken) GraphQL integration
//!
//! Split into the transport seam, the GraphQL client, the session, and the
//! readings repository built on top of them.

pub mod auth;
pub mod client;
pub mod queries;
pub mod readings;
pub mod transport;
pub mod types;

pub use auth::{AuthSession, SessionCredentials, token_expiry};
pub use client::MeteringClient;
pub use readings::ReadingsRepository;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::HHReading;
