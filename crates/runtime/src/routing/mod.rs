//! Request routing
//!
//! Resolves which handler should receive a generation request. An explicit
//! override always wins; otherwise declarative rules are evaluated by
//! descending priority, and the keyword intent classifier is the last resort.

pub mod classifier;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod policy;

pub use classifier::*;
pub use config::*;
pub use decision::*;
pub use engine::*;
pub use error::*;
pub use policy::*;
