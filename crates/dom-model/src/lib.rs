//! In-memory page model used by the recorder crates.
//!
//! A [`Page`] owns every node of every window in one arena so node identity
//! is a cheap `NodeId` comparison, including across frame boundaries.
//! Frames are separate windows with their own document; shadow roots hang
//! off their host element and are never part of the host's child list.

pub mod errors;
pub mod mutation;
pub mod node;
pub mod page;
pub mod parse;
pub mod xpath;

pub use errors::DomError;
pub use mutation::MutationRecord;
pub use node::{ElementData, NodeId, NodeKind, ShadowRootMode, WindowId};
pub use page::{normalize_space, origin_of, Page, Window};
