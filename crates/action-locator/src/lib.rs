//! Locator synthesis for recorded elements
//!
//! Produces, for any element in a page or shadow tree:
//! - a primary locator: the first candidate in a fixed priority chain
//!   (id, test attributes, name, aria-label, text, placeholder, relative
//!   path) that evaluates to exactly that element
//! - a full positional path, always available but never verified
//!
//! Both are XPath expressions scoped to the element's own tree: the owning
//! document, or the shadow root the element lives in.

pub mod errors;
pub mod paths;
pub mod strategies;
pub mod synthesizer;
pub mod types;

pub use errors::*;
pub use paths::*;
pub use strategies::*;
pub use synthesizer::*;
pub use types::*;
