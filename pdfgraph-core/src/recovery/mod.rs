//! Recovery for files whose cross-reference index cannot be used
//!
//! When `startxref` is missing, points nowhere, or the chain it starts is
//! unreadable, [`PdfReader`](crate::parser::PdfReader) falls back to
//! scanning the file body. The rebuilt index marks itself with
//! [`XRefTable::is_recovered`](crate::parser::XRefTable::is_recovered).
//!
//! # Example
//!
//! ```rust
//! use pdfgraph::parser::{FilterRegistry, ParseOptions};
//! use pdfgraph::recovery::recover_xref;
//!
//! let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";
//! let table = recover_xref(data, &ParseOptions::default(), &FilterRegistry::default()).unwrap();
//! assert!(table.is_recovered());
//! assert_eq!(table.len(), 1);
//! ```

pub mod xref_recovery;

pub use xref_recovery::{recover_xref, RecoveryStats, XRefRecovery};

/// Whether a document should be opened through recovery without even
/// trying the stored index: no `startxref` in the trailing bytes.
pub fn needs_xref_recovery(data: &[u8]) -> bool {
    let tail = &data[data.len().saturating_sub(2048)..];
    !tail.windows(9).any(|w| w == b"startxref")
}
