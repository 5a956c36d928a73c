//! Token warehouse: ownership of the token sequence and derived indices
//!
//! The warehouse takes the token stream an external tokenizer produced
//! from a normalized buffer, builds every derived index exactly once
//! (type index, bidirectional open/close pairs, parents, sections; the
//! children index is memoized lazily), and answers structural queries in
//! sublinear time during dispatch.

pub mod indices;
pub mod queries;
pub mod sections;
pub mod token;

pub use indices::{SourceInfo, Warehouse};
pub use sections::{Section, SectionIndex};
pub use token::{LineSpan, Nesting, Token};
