//! Canonical schema constants for structured logging
//!
//! These constants keep the engine's log fields consistent.

// Canonical field keys
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Command identifiers
pub const FIELD_COMMAND_ID: &str = "command_id";
pub const FIELD_CONTEXT_ID: &str = "context_id";
pub const FIELD_STRATEGY: &str = "strategy";
pub const FIELD_NESTED_LEN: &str = "nested_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Engine operation names
pub const OP_CREATE_CONTEXT: &str = "composite.create_context";
pub const OP_DO: &str = "composite.do";
pub const OP_UNDO: &str = "composite.undo";
pub const OP_COMPENSATE: &str = "composite.compensate";
