pub mod address;
pub mod books;
pub mod verse;

// Corpus crate: the canonical book table and verse addressing primitives.
pub use address::*;
pub use books::*;
pub use verse::*;
