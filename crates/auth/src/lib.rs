//! `salonbook-auth`: authentication and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how to
//! mint and verify session tokens, hash passwords, and decide whether a
//! principal holds a permission. Nothing here performs IO.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use account::{Account, AccountStatus, NewAccount, normalize_email};
pub use authorize::{authorize, permissions_for_roles, AuthzError, Principal};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator, TokenError};
pub use password::{hash_password, verify_missing_account, verify_password, PasswordError};
pub use permissions::Permission;
pub use principal::{OwnerMembership, PrincipalId};
pub use roles::Role;
