//! Commercial document stubs.
//!
//! Electronic invoices and certificates of origin are not issued by a real
//! tax authority here; this crate only mints the identifiers that stand in
//! for them.

pub mod document;

pub use document::{DocumentKind, DocumentNumber, DocumentNumberGenerator, SequentialDocumentGenerator};
