use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use agromarket_core::{DomainError, DomainResult, Entity, UserId, ValueObject};

use crate::verification::RegistryVerifier;

/// Whether a user buys or sells on the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Buyer,
    Seller,
}

/// Government registry a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    /// Tax registration (RUT).
    Rut,
    /// Tax authority registration (DIAN / NIT).
    Dian,
    /// Sanitary registration (INVIMA).
    Invima,
    /// Agricultural registration (ICA).
    Ica,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 4] = [
        RegistryKind::Rut,
        RegistryKind::Dian,
        RegistryKind::Invima,
        RegistryKind::Ica,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegistryKind::Rut => "RUT",
            RegistryKind::Dian => "DIAN",
            RegistryKind::Invima => "INVIMA",
            RegistryKind::Ica => "ICA",
        }
    }
}

impl core::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified registry document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub number: String,
    pub expires_on: NaiveDate,
}

impl ValueObject for RegistryDocument {}

impl RegistryDocument {
    /// Whole days from `today` until expiry; negative once expired.
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.expires_on - today).num_days()
    }
}

/// A buyer or seller account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    id: UserId,
    name: String,
    email: String,
    phone: String,
    role: UserRole,
    address: Option<String>,
    sanitary_certificate: Option<String>,
    documents: BTreeMap<RegistryKind, RegistryDocument>,
}

impl Entity for UserProfile {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl UserProfile {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        role: UserRole,
    ) -> DomainResult<Self> {
        let name = name.into();
        let email = email.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if !email.contains('@') {
            return Err(DomainError::validation(format!("invalid email '{email}'")));
        }

        Ok(Self {
            id,
            name,
            email,
            phone: phone.into(),
            role,
            address: None,
            sanitary_certificate: None,
            documents: BTreeMap::new(),
        })
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_sanitary_certificate(mut self, certificate: impl Into<String>) -> Self {
        self.sanitary_certificate = Some(certificate.into());
        self
    }

    pub fn id_typed(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn sanitary_certificate(&self) -> Option<&str> {
        self.sanitary_certificate.as_deref()
    }

    pub fn document(&self, kind: RegistryKind) -> Option<&RegistryDocument> {
        self.documents.get(&kind)
    }

    pub fn documents(&self) -> impl Iterator<Item = (RegistryKind, &RegistryDocument)> {
        self.documents.iter().map(|(kind, doc)| (*kind, doc))
    }

    /// Verify a registry number and, if accepted, store it with its expiry.
    ///
    /// A rejected document leaves the profile unchanged. A previously stored
    /// document of the same kind is replaced.
    pub fn submit_document<V>(
        &mut self,
        verifier: &V,
        kind: RegistryKind,
        number: impl Into<String>,
        expires_on: NaiveDate,
    ) -> DomainResult<()>
    where
        V: RegistryVerifier + ?Sized,
    {
        let number = number.into();
        verifier.verify(kind, &number)?;
        self.documents.insert(kind, RegistryDocument { number, expires_on });
        Ok(())
    }

    /// Documents expiring within `window_days` of `today`.
    ///
    /// Documents already expired, or expiring today, are not included.
    pub fn expiring_documents(
        &self,
        today: NaiveDate,
        window_days: u32,
    ) -> Vec<(RegistryKind, &RegistryDocument)> {
        self.documents()
            .filter(|(_, doc)| {
                let days = doc.days_remaining(today);
                days > 0 && days <= i64::from(window_days)
            })
            .collect()
    }

    /// Whether the profile carries what the foreign-trade window (VUCE) and
    /// the tax portal (MUISCA) require: a RUT and a DIAN registration.
    pub fn foreign_trade_ready(&self) -> bool {
        self.documents.contains_key(&RegistryKind::Rut)
            && self.documents.contains_key(&RegistryKind::Dian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::StubRegistryVerifier;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_seller() -> UserProfile {
        UserProfile::new(
            UserId::new(),
            "Finca La Esperanza",
            "ventas@esperanza.co",
            "3001234567",
            UserRole::Seller,
        )
        .unwrap()
    }

    #[test]
    fn new_profile_validates_name_and_email() {
        assert!(UserProfile::new(UserId::new(), " ", "a@b.co", "", UserRole::Buyer).is_err());
        assert!(UserProfile::new(UserId::new(), "Ana", "nope", "", UserRole::Buyer).is_err());

        let profile = test_seller().with_address("Vereda El Placer");
        assert_eq!(profile.address(), Some("Vereda El Placer"));
        assert_eq!(profile.documents().count(), 0);
    }

    #[test]
    fn accepted_document_is_stored_with_expiry() {
        let mut profile = test_seller();
        profile
            .submit_document(&StubRegistryVerifier, RegistryKind::Rut, "9001234567", date(2030, 1, 1))
            .unwrap();

        let doc = profile.document(RegistryKind::Rut).unwrap();
        assert_eq!(doc.number, "9001234567");
        assert_eq!(doc.expires_on, date(2030, 1, 1));
    }

    #[test]
    fn rejected_document_leaves_profile_unchanged() {
        let mut profile = test_seller();
        profile
            .submit_document(&StubRegistryVerifier, RegistryKind::Ica, "ICA-001", date(2030, 1, 1))
            .unwrap();
        let before = profile.clone();

        let err = profile
            .submit_document(&StubRegistryVerifier, RegistryKind::Ica, "XX-002", date(2031, 1, 1))
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(profile, before);
    }

    #[test]
    fn expiring_window_excludes_expired_and_distant_documents() {
        let today = date(2025, 3, 1);
        let mut profile = test_seller();
        let verifier = StubRegistryVerifier;
        profile.submit_document(&verifier, RegistryKind::Rut, "9001234567", date(2025, 3, 16)).unwrap();
        profile.submit_document(&verifier, RegistryKind::Dian, "900123456", date(2025, 3, 17)).unwrap();
        profile.submit_document(&verifier, RegistryKind::Invima, "RSAD-77", date(2025, 3, 1)).unwrap();
        profile.submit_document(&verifier, RegistryKind::Ica, "ICA-9", date(2025, 2, 20)).unwrap();

        let kinds: Vec<RegistryKind> = profile
            .expiring_documents(today, 15)
            .into_iter()
            .map(|(kind, _)| kind)
            .collect();

        assert_eq!(kinds, vec![RegistryKind::Rut]);
    }

    #[test]
    fn foreign_trade_needs_rut_and_dian() {
        let mut profile = test_seller();
        let verifier = StubRegistryVerifier;
        profile.submit_document(&verifier, RegistryKind::Rut, "9001234567", date(2030, 1, 1)).unwrap();
        assert!(!profile.foreign_trade_ready());

        profile.submit_document(&verifier, RegistryKind::Dian, "900123456", date(2030, 1, 1)).unwrap();
        assert!(profile.foreign_trade_ready());
    }

    #[test]
    fn registry_kinds_serialize_lowercase() {
        assert_eq!(serde_json::to_value(RegistryKind::Invima).unwrap(), "invima");
        assert_eq!(RegistryKind::Invima.to_string(), "INVIMA");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a document is reported iff it expires 1..=window days from today.
        #[test]
        fn expiring_matches_day_window(offset in -40i64..40, window in 0u32..30) {
            let today = date(2025, 6, 15);
            let mut profile = test_seller();
            profile
                .submit_document(
                    &StubRegistryVerifier,
                    RegistryKind::Rut,
                    "9001234567",
                    today + chrono::Duration::days(offset),
                )
                .unwrap();

            let reported = !profile.expiring_documents(today, window).is_empty();
            prop_assert_eq!(reported, offset > 0 && offset <= i64::from(window));
        }
    }
}
