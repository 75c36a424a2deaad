use super::{Context, State};

/// Observer of context state transitions.
///
/// Called synchronously, on the thread performing the transition, while the
/// context is being mutated. Inside a composite the nested context's handle
/// is locked for the whole call, and peers may be locked by other pool
/// tasks, so implementations must not lock any handle of the same composite:
/// neither the notified context's own handle nor the nested contexts reached
/// through the composite's parameters. A panic inside a listener is
/// contained by the context and logged.
pub trait StateChangedListener: Send + Sync {
    fn state_changed(&self, context: &Context, previous: State, current: State);
}

impl<F> StateChangedListener for F
where
    F: Fn(&Context, State, State) + Send + Sync,
{
    fn state_changed(&self, context: &Context, previous: State, current: State) {
        self(context, previous, current)
    }
}
