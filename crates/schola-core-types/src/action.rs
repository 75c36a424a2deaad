//! Explicit action context
//!
//! The facade action that triggered a command invocation (its name and the
//! request correlation) is passed by value through every engine operation
//! instead of living in an ambient thread-local.

use crate::correlation::{RequestContext, RequestId};

/// Context of the facade action a command runs under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionContext {
    action_name: String,
    request: RequestContext,
}

impl ActionContext {
    /// Create a context for `action_name` with a fresh request id
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            request: RequestContext::new(),
        }
    }

    /// Attach an existing request correlation
    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request.request_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::TraceId;

    #[test]
    fn test_action_context_keeps_request() {
        let request = RequestContext::new().with_trace_id(TraceId::from_string("t-1"));
        let action = ActionContext::new("student.register").with_request(request.clone());

        assert_eq!(action.action_name(), "student.register");
        assert_eq!(action.request(), &request);
        assert_eq!(action.request_id(), &request.request_id);
    }

    #[test]
    fn test_fresh_contexts_get_distinct_requests() {
        let a = ActionContext::new("profile.create");
        let b = ActionContext::new("profile.create");
        assert_ne!(a.request_id(), b.request_id());
    }
}
