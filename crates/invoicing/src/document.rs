use core::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agromarket_core::DomainError;

/// Kind of commercial document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Electronic invoice, tied to an order.
    ElectronicInvoice,
    /// Certificate of origin, tied to a product.
    CertificateOfOrigin,
}

impl DocumentKind {
    pub fn tag(self) -> &'static str {
        match self {
            DocumentKind::ElectronicInvoice => "FE",
            DocumentKind::CertificateOfOrigin => "CO",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "FE" => Some(DocumentKind::ElectronicInvoice),
            "CO" => Some(DocumentKind::CertificateOfOrigin),
            _ => None,
        }
    }
}

/// Synthetic document identifier: `<tag>-<entity>-<unix millis>-<sequence>`.
///
/// The entity part may itself contain dashes (UUIDs do); parsing anchors on
/// the first and the last two separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentNumber {
    kind: DocumentKind,
    entity: String,
    issued_at_millis: i64,
    sequence: u64,
}

impl DocumentNumber {
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn issued_at_millis(&self) -> i64 {
        self.issued_at_millis
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl core::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.kind.tag(),
            self.entity,
            self.issued_at_millis,
            self.sequence
        )
    }
}

impl FromStr for DocumentNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DomainError::invalid_id(format!("DocumentNumber: malformed '{s}'"));

        let (tag, rest) = s.split_once('-').ok_or_else(malformed)?;
        let kind = DocumentKind::from_tag(tag).ok_or_else(malformed)?;

        let mut tail = rest.rsplitn(3, '-');
        let sequence = tail.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
        let issued_at_millis = tail.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
        let entity = tail.next().filter(|e| !e.is_empty()).ok_or_else(malformed)?;

        Ok(Self {
            kind,
            entity: entity.to_string(),
            issued_at_millis,
            sequence,
        })
    }
}

impl TryFrom<String> for DocumentNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentNumber> for String {
    fn from(value: DocumentNumber) -> Self {
        value.to_string()
    }
}

/// Source of document numbers.
///
/// Implementations stand in for an external invoicing system; swapping one in
/// must not require changes to order handling.
pub trait DocumentNumberGenerator: Send + Sync {
    fn generate(&self, kind: DocumentKind, entity: &str, at: DateTime<Utc>) -> DocumentNumber;
}

impl<G> DocumentNumberGenerator for std::sync::Arc<G>
where
    G: DocumentNumberGenerator + ?Sized,
{
    fn generate(&self, kind: DocumentKind, entity: &str, at: DateTime<Utc>) -> DocumentNumber {
        (**self).generate(kind, entity, at)
    }
}

/// Timestamp plus a monotonic counter.
///
/// The counter makes numbers from one generator unique even when two are
/// requested within the same millisecond.
#[derive(Debug)]
pub struct SequentialDocumentGenerator {
    next: AtomicU64,
}

impl SequentialDocumentGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialDocumentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentNumberGenerator for SequentialDocumentGenerator {
    fn generate(&self, kind: DocumentKind, entity: &str, at: DateTime<Utc>) -> DocumentNumber {
        DocumentNumber {
            kind,
            entity: entity.to_string(),
            issued_at_millis: at.timestamp_millis(),
            sequence: self.next.fetch_add(1, Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn invoice_numbers_carry_tag_entity_and_timestamp() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let number = SequentialDocumentGenerator::new().generate(
            DocumentKind::ElectronicInvoice,
            "42",
            at,
        );

        assert_eq!(number.to_string(), "FE-42-1700000000123-1");
        assert_eq!(number.kind(), DocumentKind::ElectronicInvoice);
        assert_eq!(number.entity(), "42");
    }

    #[test]
    fn numbers_are_unique_within_the_same_instant() {
        let generator = SequentialDocumentGenerator::new();
        let at = Utc::now();

        let numbers: HashSet<String> = (0..100)
            .map(|_| generator.generate(DocumentKind::CertificateOfOrigin, "7", at).to_string())
            .collect();

        assert_eq!(numbers.len(), 100);
    }

    #[test]
    fn parse_handles_uuid_entities() {
        let entity = "0190a3e2-7b4c-7d1e-9f00-0123456789ab";
        let raw = format!("CO-{entity}-1700000000000-9");

        let number: DocumentNumber = raw.parse().unwrap();

        assert_eq!(number.kind(), DocumentKind::CertificateOfOrigin);
        assert_eq!(number.entity(), entity);
        assert_eq!(number.issued_at_millis(), 1_700_000_000_000);
        assert_eq!(number.sequence(), 9);
        assert_eq!(number.to_string(), raw);
    }

    #[test]
    fn parse_rejects_unknown_tags_and_missing_parts() {
        for raw in ["XX-1-2-3", "FE-1-2", "FE--2-3", "FE", "FE-abc-notanumber-1"] {
            assert!(
                matches!(raw.parse::<DocumentNumber>(), Err(DomainError::InvalidId(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn serializes_as_plain_string() {
        let number: DocumentNumber = "FE-5-10-2".parse().unwrap();
        assert_eq!(serde_json::to_value(&number).unwrap(), "FE-5-10-2");
    }
}
