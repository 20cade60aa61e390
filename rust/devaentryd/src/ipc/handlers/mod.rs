pub mod core;
pub mod entries;
pub mod session;
pub mod workflow;
