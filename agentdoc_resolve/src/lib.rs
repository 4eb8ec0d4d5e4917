//! Reading stored content back.
//!
//! - [`GatewayRace`]: fetches an identifier from every gateway of a
//!   protocol at once and keeps the first success in list order.
//! - [`UriResolver`]: turns a storage URI into bytes or a parsed document,
//!   dispatching on the URI scheme.

mod race;
pub use race::{GatewayRace, fetch_direct};

mod uri_resolver;
pub use uri_resolver::{Loaded, UriResolver};
