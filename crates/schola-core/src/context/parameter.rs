//! Redo / undo parameters carried by a context.

use serde_json::Value;

use super::ContextHandle;

/// Opaque payload flowing through commands (entities, ids, partial results)
pub type Payload = Value;

/// Parameter stored on a context
#[derive(Debug, Clone)]
pub enum Parameter {
    /// Plain payload for an atomic command
    Value(Payload),
    /// Fan-out wrapper, redo parameter of a composite context
    Macro(MacroCommandParameter),
    /// Nested contexts captured by a composite do, its undo parameter
    Nested(Vec<ContextHandle>),
}

impl Parameter {
    pub fn as_value(&self) -> Option<&Payload> {
        match self {
            Parameter::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_macro(&self) -> Option<&MacroCommandParameter> {
        match self {
            Parameter::Macro(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&[ContextHandle]> {
        match self {
            Parameter::Nested(n) => Some(n),
            _ => None,
        }
    }
}

impl From<Payload> for Parameter {
    fn from(value: Payload) -> Self {
        Parameter::Value(value)
    }
}

/// Root input of a composite plus one context per nested command.
///
/// Order is significant: it is the do order, and its reverse is the undo
/// order. The handles are shared with the composite's undo parameter, so
/// nested state stays observable after the do pass.
#[derive(Debug, Clone)]
pub struct MacroCommandParameter {
    root_input: Payload,
    nested_contexts: Vec<ContextHandle>,
}

impl MacroCommandParameter {
    pub fn new(root_input: Payload, nested_contexts: Vec<ContextHandle>) -> Self {
        Self {
            root_input,
            nested_contexts,
        }
    }

    pub fn root_input(&self) -> &Payload {
        &self.root_input
    }

    pub fn nested_contexts(&self) -> &[ContextHandle] {
        &self.nested_contexts
    }

    pub fn len(&self) -> usize {
        self.nested_contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nested_contexts.is_empty()
    }
}
