/// Lifecycle state of an execution context.
///
/// Valid transitions:
/// - `Init` -> `Ready` (redo parameter set) | `Fail` (creation failed)
/// - `Ready` -> `Work` | `Cancel` | `Fail`
/// - `Work` -> `Done` | `Fail`, or `Undone` | `Fail` when the work is an undo
/// - `Done` -> `Work` (undo started)
///
/// `Undone`, `Fail` and `Cancel` are terminal; `Done` is terminal unless an
/// undo is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Init,
    Ready,
    Work,
    Done,
    Undone,
    Fail,
    Cancel,
}

impl State {
    /// True when no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Undone | State::Fail | State::Cancel)
    }

    /// Check the transition graph. `undoing` tells whether a `Work` state was
    /// entered from `Done`.
    pub(crate) fn can_transition(self, to: State, undoing: bool) -> bool {
        match (self, to) {
            (State::Init, State::Ready) | (State::Init, State::Fail) => true,
            (State::Ready, State::Work | State::Cancel | State::Fail) => true,
            (State::Work, State::Done) => !undoing,
            (State::Work, State::Undone) => undoing,
            (State::Work, State::Fail) => true,
            (State::Done, State::Work) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Init => "INIT",
            State::Ready => "READY",
            State::Work => "WORK",
            State::Done => "DONE",
            State::Undone => "UNDONE",
            State::Fail => "FAIL",
            State::Cancel => "CANCEL",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
