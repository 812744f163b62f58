//! Parties domain module (buyer and seller profiles).
//!
//! Profiles carry the registry documents sellers need for export paperwork.
//! Verification against the registries is stubbed behind `RegistryVerifier`.

pub mod profile;
pub mod verification;

pub use profile::{RegistryDocument, RegistryKind, UserProfile, UserRole};
pub use verification::{RegistryVerifier, StubRegistryVerifier};
