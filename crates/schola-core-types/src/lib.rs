//! Core types shared across the Schola command engine
//!
//! This crate provides the small vocabulary every other crate speaks:
//!
//! - **Correlation types**: RequestId, TraceId, RequestContext
//! - **Action context**: the explicit ambient context handed to every
//!   do / undo / commit / rollback call
//! - **Schema constants**: Canonical field keys and event names for logging

pub mod action;
pub mod correlation;
pub mod schema;

pub use action::ActionContext;
pub use correlation::{RequestContext, RequestId, TraceId};
