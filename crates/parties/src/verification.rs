//! Registry document verification.

use agromarket_core::{DomainError, DomainResult};

use crate::profile::RegistryKind;

/// Checks a registry number against the issuing authority.
///
/// Implementations are synchronous; a real registry client would sit behind
/// this trait without changes to profile handling.
pub trait RegistryVerifier: Send + Sync {
    fn verify(&self, kind: RegistryKind, number: &str) -> DomainResult<()>;
}

impl<V> RegistryVerifier for std::sync::Arc<V>
where
    V: RegistryVerifier + ?Sized,
{
    fn verify(&self, kind: RegistryKind, number: &str) -> DomainResult<()> {
        (**self).verify(kind, number)
    }
}

/// Format-only checks standing in for the registries.
///
/// - RUT: exactly 10 characters
/// - DIAN (NIT): exactly 9 characters
/// - INVIMA: starts with `RSAD`
/// - ICA: starts with `ICA`
#[derive(Debug, Clone, Copy, Default)]
pub struct StubRegistryVerifier;

impl RegistryVerifier for StubRegistryVerifier {
    fn verify(&self, kind: RegistryKind, number: &str) -> DomainResult<()> {
        let accepted = match kind {
            RegistryKind::Rut => number.chars().count() == 10,
            RegistryKind::Dian => number.chars().count() == 9,
            RegistryKind::Invima => number.starts_with("RSAD"),
            RegistryKind::Ica => number.starts_with("ICA"),
        };

        if accepted {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "{kind} registry rejected number '{number}'"
            )))
        }
    }
}
