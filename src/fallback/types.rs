use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// A named alternative operation in a fallback chain
pub struct FallbackOption<T, E> {
    name: String,
    operation: Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>,
}

impl<T, E> FallbackOption<T, E> {
    pub fn new<F, Fut>(name: impl Into<String>, operation: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            name: name.into(),
            operation: Box::new(move || operation().boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, BoxFuture<'static, Result<T, E>>) {
        let future = (self.operation)();
        (self.name, future)
    }
}

impl<T, E> fmt::Debug for FallbackOption<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackOption")
            .field("name", &self.name)
            .field("operation", &"<operation>")
            .finish()
    }
}

/// Record of one option tried by a fallback chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackAttempt {
    pub option_name: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl FallbackAttempt {
    pub fn succeeded(option_name: impl Into<String>) -> Self {
        Self {
            option_name: option_name.into(),
            succeeded: true,
            error_message: None,
        }
    }

    pub fn failed(option_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            option_name: option_name.into(),
            succeeded: false,
            error_message: Some(error_message.into()),
        }
    }
}

/// Successful result of a fallback chain
#[derive(Debug)]
pub struct FallbackOutcome<T> {
    pub result: T,
    /// Name of the option that produced `result`
    pub source: String,
    /// Every option tried, in order, ending with the successful one
    pub attempts: Vec<FallbackAttempt>,
}

/// Deterministic replay of fallback bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackSimulation {
    pub attempts: Vec<FallbackAttempt>,
    pub source: String,
}
