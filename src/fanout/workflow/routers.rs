// SPDX-License-Identifier: MIT

//! Router implementations
//!
//! - `FnRouter` - closure router, selecting or fanning out
//! - `ConditionRouter` - first matching `when` branch picks the label
//! - `FanOutRouter` - one dispatch per labelled item of a list field

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::fanout::workflow::condition::{self, Expression};
use crate::fanout::workflow::graph::END;
use crate::sdk::error::{ConfigError, StepError};
use crate::sdk::router::{DispatchRequest, Route, Router};
use crate::sdk::state::{StateUpdate, StateView};

type RouteFn = dyn Fn(&StateView) -> Result<Route, StepError> + Send + Sync;

/// Router backed by a closure
pub struct FnRouter {
    func: Box<RouteFn>,
    labels: Option<BTreeSet<String>>,
    fans_out: bool,
}

impl FnRouter {
    /// Router selecting a single successor
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&StateView) -> Result<Route, StepError> + Send + Sync + 'static,
    {
        Self {
            func: Box::new(func),
            labels: None,
            fans_out: false,
        }
    }

    /// Router allowed to return dispatch requests
    pub fn fan_out<F>(func: F) -> Self
    where
        F: Fn(&StateView) -> Result<Route, StepError> + Send + Sync + 'static,
    {
        Self {
            fans_out: true,
            ..Self::new(func)
        }
    }

    /// Declare the labels the closure can return
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }
}

impl Router for FnRouter {
    fn route(&self, view: &StateView) -> Result<Route, StepError> {
        (self.func)(view)
    }

    fn labels(&self) -> Option<BTreeSet<String>> {
        self.labels.clone()
    }

    fn fans_out(&self) -> bool {
        self.fans_out
    }
}

/// Router choosing a label from ordered `when` conditions
#[derive(Debug, Clone)]
pub struct ConditionRouter {
    branches: Vec<(Expression, String)>,
    default: Option<String>,
}

impl ConditionRouter {
    pub fn new() -> Self {
        Self {
            branches: Vec::new(),
            default: None,
        }
    }

    /// Add a branch; the first branch whose condition holds wins
    pub fn when(mut self, condition: &str, label: impl Into<String>) -> Result<Self, ConfigError> {
        let expr = condition::parse(condition)?;
        self.branches.push((expr, label.into()));
        Ok(self)
    }

    /// Label used when no branch matches
    pub fn otherwise(mut self, label: impl Into<String>) -> Self {
        self.default = Some(label.into());
        self
    }
}

impl Default for ConditionRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for ConditionRouter {
    fn route(&self, view: &StateView) -> Result<Route, StepError> {
        self.branches
            .iter()
            .find(|(expr, _)| condition::evaluate(expr, view))
            .map(|(_, label)| label.clone())
            .or_else(|| self.default.clone())
            .map(Route::Label)
            .ok_or_else(|| StepError::failed("no branch matched and no default label is set"))
    }

    fn labels(&self) -> Option<BTreeSet<String>> {
        Some(
            self.branches
                .iter()
                .map(|(_, label)| label.clone())
                .chain(self.default.clone())
                .collect(),
        )
    }
}

/// Dispatches one child per item of a list field
///
/// Each item's label field names the routing label. Items labelled with the
/// end marker are dropped without a dispatch. When the router knows its
/// targets, items with any other unknown label are dropped as well.
#[derive(Debug, Clone)]
pub struct FanOutRouter {
    over: String,
    label_field: String,
    payload_key: String,
    fields: Option<Vec<String>>,
    targets: Option<BTreeSet<String>>,
}

impl FanOutRouter {
    /// `over`: list field to iterate; `label_field`: item field naming the
    /// target; `payload_key`: key the item is handed to the child under
    pub fn new(
        over: impl Into<String>,
        label_field: impl Into<String>,
        payload_key: impl Into<String>,
    ) -> Self {
        Self {
            over: over.into(),
            label_field: label_field.into(),
            payload_key: payload_key.into(),
            fields: None,
            targets: None,
        }
    }

    /// Only pass these item fields to the child
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Labels that resolve to a worker step
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    fn payload(&self, item: &Value) -> Value {
        match (&self.fields, item) {
            (Some(fields), Value::Object(obj)) => Value::Object(
                fields
                    .iter()
                    .filter_map(|f| obj.get(f).map(|v| (f.clone(), v.clone())))
                    .collect::<Map<_, _>>(),
            ),
            _ => item.clone(),
        }
    }
}

impl Router for FanOutRouter {
    fn route(&self, view: &StateView) -> Result<Route, StepError> {
        let items = match view.get(&self.over) {
            None | Some(Value::Null) => return Ok(Route::Dispatch(vec![])),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(StepError::invalid_field(
                    &self.over,
                    format!("expected a list, got {}", other),
                ))
            }
        };

        let mut requests = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let label = item
                .get(&self.label_field)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    StepError::invalid_field(
                        &self.over,
                        format!("item {} has no string '{}'", index, self.label_field),
                    )
                })?;

            if label == END {
                log::debug!("Item {} of '{}' is labelled END, not dispatching", index, self.over);
                continue;
            }
            if let Some(targets) = &self.targets {
                if !targets.contains(label) {
                    log::warn!(
                        "Item {} of '{}' has unknown label '{}', not dispatching",
                        index,
                        self.over,
                        label
                    );
                    continue;
                }
            }

            let mut payload = StateUpdate::new();
            payload.insert(self.payload_key.clone(), self.payload(item));
            requests.push(DispatchRequest::new(label, payload));
        }

        Ok(Route::Dispatch(requests))
    }

    fn labels(&self) -> Option<BTreeSet<String>> {
        self.targets.clone()
    }

    fn fans_out(&self) -> bool {
        true
    }
}
