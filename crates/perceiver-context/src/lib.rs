//! Context tracing for recorded elements.
//!
//! Two independent dimensions: the iframe ancestry of the element's window
//! and the shadow-host ancestry of the element inside its document. Both
//! tracers are pure queries over the page.

pub mod errors;
pub mod frames;
pub mod model;
pub mod resolver;
pub mod shadow;

pub use errors::ContextError;
pub use frames::FrameTracer;
pub use model::{FrameDescriptor, ShadowHostDescriptor, CLOSED_SHADOW_NOTE};
pub use resolver::{
    CrossOriginFrameResolver, FrameIdentityResolver, FrameRegistry, FrameResolution,
    SameOriginFrameResolver,
};
pub use shadow::trace_shadow_context;
