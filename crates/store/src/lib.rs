pub mod client;
pub mod dataset;
pub mod protocol;
pub mod worker;

pub use client::*;
pub use dataset::*;
pub use protocol::*;
pub use worker::*;
