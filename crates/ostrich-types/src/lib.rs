//! Foundation types for OSTRICH versioned triple archives.
//!
//! Every other crate in the workspace depends on `ostrich-types`.
//!
//! # Key Types
//!
//! - [`Term`]: Structured RDF term with the flat archive encoding (the term codec)
//! - [`Triple`] / [`EncodedTriple`]: Structured and flat triples; the flat form orders
//!   canonically (SPO)
//! - [`TripleDelta`]: Triple tagged as addition or deletion
//! - [`TripleVersions`]: Triple with the versions at which it holds
//! - [`TriplePattern`]: `Bound | Wildcard` per position
//! - [`Window`] / [`SearchPage`] / [`Count`]: Paging contract shared by all query modes

pub mod error;
pub mod pattern;
pub mod term;
pub mod triple;

pub use error::TypeError;
pub use pattern::{Count, SearchPage, TermPattern, TriplePattern, Window};
pub use term::{Literal, Term, XSD_STRING};
pub use triple::{
    first_unsorted, sort_deltas, EncodedDelta, EncodedTriple, EncodedVersions, Triple,
    TripleDelta, TripleVersions,
};
