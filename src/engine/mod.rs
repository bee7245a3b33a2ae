//! Core engine — resolve → wait → bid.

pub mod executor;
pub mod resolver;
pub mod scheduler;
