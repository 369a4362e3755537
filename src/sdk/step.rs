//! Step trait - the unit of computation in a graph

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::error::StepError;
use super::state::{StateUpdate, StateView};

/// A named unit of computation
///
/// Steps receive an owned snapshot of the state (or, when reached through a
/// fan-out, only their dispatch payload) and return a partial update. They
/// never mutate shared state; the engine merges what they return.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, view: StateView) -> Result<StateUpdate, StepError>;
}

type StepFn = dyn Fn(StateView) -> BoxFuture<'static, Result<StateUpdate, StepError>> + Send + Sync;

/// Step backed by an async closure
pub struct FnStep {
    func: Box<StepFn>,
}

impl FnStep {
    /// Wrap a closure returning a boxed future
    ///
    /// ```rust,ignore
    /// let step = FnStep::new(|view| Box::pin(async move {
    ///     let query: String = view.require("main_query")?;
    ///     StateUpdate::new().with("echo", query)
    /// }));
    /// ```
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(StateView) -> BoxFuture<'static, Result<StateUpdate, StepError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            func: Box::new(func),
        }
    }

    /// Wrap a synchronous closure
    pub fn sync<F>(func: F) -> Self
    where
        F: Fn(StateView) -> Result<StateUpdate, StepError> + Send + Sync + 'static,
    {
        Self::new(move |view| {
            let result = func(view);
            Box::pin(async move { result })
        })
    }
}

#[async_trait]
impl Step for FnStep {
    async fn run(&self, view: StateView) -> Result<StateUpdate, StepError> {
        (self.func)(view).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_async_fn_step() {
        let step = FnStep::new(|view| {
            Box::pin(async move {
                let query: String = view.require("main_query")?;
                StateUpdate::new().with("echo", format!("{}!", query))
            })
        });

        let view = StateUpdate::from_json(json!({"main_query": "hi"}))
            .unwrap()
            .into_view();
        let update = step.run(view).await.unwrap();
        assert_eq!(update.get("echo"), Some(&json!("hi!")));
    }

    #[tokio::test]
    async fn test_sync_fn_step_propagates_error() {
        let step = FnStep::sync(|view| {
            let _: String = view.require("missing")?;
            Ok(StateUpdate::new())
        });

        let err = step.run(StateView::default()).await.unwrap_err();
        assert!(matches!(err, StepError::MissingField(_)));
    }
}
