pub mod pixel;
pub mod project;

// Projection crate: small, well-tested coordinate primitives only.
pub use pixel::*;
pub use project::*;
