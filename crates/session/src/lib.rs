pub mod changelog;
pub mod inspect;
pub mod markers;
pub mod similarity;

pub use changelog::*;
pub use inspect::*;
pub use markers::*;
pub use similarity::*;
