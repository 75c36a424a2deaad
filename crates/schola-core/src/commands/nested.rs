//! Nested commands of a composite and their input preparation

use std::sync::Arc;

use super::{AtomicCommand, Command, Leaf};
use crate::context::{Context, Payload};

/// A command registered inside a composite
#[derive(Clone)]
pub enum NestedCommand {
    Atomic(Arc<dyn Command>),
    /// Another composite (macro-of-macros)
    Composite(Arc<dyn Command>),
}

impl NestedCommand {
    /// Wrap a business leaf
    pub fn atomic(command: impl AtomicCommand + 'static) -> Self {
        NestedCommand::Atomic(Arc::new(Leaf::new(command)))
    }

    pub fn composite(command: impl Command + 'static) -> Self {
        NestedCommand::Composite(Arc::new(command))
    }

    pub fn command(&self) -> &Arc<dyn Command> {
        match self {
            NestedCommand::Atomic(c) | NestedCommand::Composite(c) => c,
        }
    }

    pub fn id(&self) -> &str {
        self.command().id()
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, NestedCommand::Composite(_))
    }
}

impl std::fmt::Debug for NestedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NestedCommand::Atomic(c) => f.debug_tuple("Atomic").field(&c.id()).finish(),
            NestedCommand::Composite(c) => f.debug_tuple("Composite").field(&c.id()).finish(),
        }
    }
}

/// Builds the context of one nested command from the composite's input
pub trait NestedContextPreparer: Send + Sync {
    fn prepare(&self, composite_id: &str, nested: &NestedCommand, input: &Payload) -> Context;
}

/// Hands the composite input unchanged to every nested command
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPreparer;

impl NestedContextPreparer for DefaultPreparer {
    fn prepare(&self, composite_id: &str, nested: &NestedCommand, input: &Payload) -> Context {
        match nested {
            NestedCommand::Atomic(command) => command.create_context(input.clone()),
            NestedCommand::Composite(command) => {
                tracing::debug!(
                    composite_id,
                    nested_id = command.id(),
                    "preparing nested composite"
                );
                command.create_context(input.clone())
            }
        }
    }
}

/// Selects `input[<nested id>]` for each nested command
///
/// A missing key yields a null input, so the nested factory reports a
/// `CannotCreateContext` naming that command, unless shared fallback is on,
/// in which case the whole input is passed.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyedInputPreparer {
    shared_fallback: bool,
}

impl KeyedInputPreparer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shared_fallback(mut self) -> Self {
        self.shared_fallback = true;
        self
    }
}

impl NestedContextPreparer for KeyedInputPreparer {
    fn prepare(&self, composite_id: &str, nested: &NestedCommand, input: &Payload) -> Context {
        let selected = match input.get(nested.id()) {
            Some(value) => value.clone(),
            None if self.shared_fallback => input.clone(),
            None => {
                tracing::debug!(
                    composite_id,
                    nested_id = nested.id(),
                    "no keyed input for nested command"
                );
                Payload::Null
            }
        };
        DefaultPreparer.prepare(composite_id, nested, &selected)
    }
}
