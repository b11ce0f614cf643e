//! `tillpoint-auth` — authentication boundary.
//!
//! The core treats authentication as a capability it *receives*: a verified
//! token yields a staff identity and a role. This crate is intentionally
//! decoupled from HTTP and storage.

pub mod claims;
pub mod jwt;
pub mod roles;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use roles::Role;
