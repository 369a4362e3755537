//! Condition expression evaluator

use super::ast::{CompareOp, Expression, Literal};
use crate::sdk::state::StateView;
use serde_json::Value;

/// Evaluate a condition expression against a state snapshot
pub fn evaluate(expr: &Expression, view: &StateView) -> bool {
    match expr {
        Expression::True => true,
        Expression::False => false,
        Expression::Compare { path, op, right } => compare(view.get_path(path), *op, right),
        Expression::And(left, right) => evaluate(left, view) && evaluate(right, view),
        Expression::Or(left, right) => evaluate(left, view) || evaluate(right, view),
        Expression::Not(inner) => !evaluate(inner, view),
    }
}

fn compare(left: Option<&Value>, op: CompareOp, right: &Literal) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::NotEq => !values_equal(left, right),
        CompareOp::Gt => compare_numbers(left, right, |a, b| a > b),
        CompareOp::Gte => compare_numbers(left, right, |a, b| a >= b),
        CompareOp::Lt => compare_numbers(left, right, |a, b| a < b),
        CompareOp::Lte => compare_numbers(left, right, |a, b| a <= b),
        CompareOp::Contains => contains(left, right),
    }
}

fn literal_matches(value: &Value, literal: &Literal) -> bool {
    match (value, literal) {
        (Value::Null, Literal::Null) => true,
        (Value::String(s), Literal::String(rs)) => s == rs,
        (Value::Number(n), Literal::Number(rn)) => n
            .as_f64()
            .map(|f| (f - rn).abs() < f64::EPSILON)
            .unwrap_or(false),
        (Value::Bool(b), Literal::Boolean(rb)) => b == rb,
        _ => false,
    }
}

fn values_equal(left: Option<&Value>, right: &Literal) -> bool {
    match left {
        // Missing fields compare equal to null
        None => *right == Literal::Null,
        Some(value) => literal_matches(value, right),
    }
}

fn compare_numbers(left: Option<&Value>, right: &Literal, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (left.and_then(Value::as_f64), right) {
        (Some(l), Literal::Number(r)) => cmp(l, *r),
        _ => false,
    }
}

fn contains(left: Option<&Value>, right: &Literal) -> bool {
    match (left, right) {
        (Some(Value::String(s)), Literal::String(needle)) => s.contains(needle.as_str()),
        (Some(Value::Array(items)), literal) => items.iter().any(|v| literal_matches(v, literal)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::workflow::condition::parser::parse;
    use crate::sdk::state::StateUpdate;
    use serde_json::json;

    fn view(value: Value) -> StateView {
        StateUpdate::from_json(value).unwrap().into_view()
    }

    fn check(input: &str, state: &StateView) -> bool {
        evaluate(&parse(input).unwrap(), state)
    }

    #[test]
    fn test_string_equality() {
        let state = view(json!({"agent_name": "worker_1"}));
        assert!(check("agent_name == 'worker_1'", &state));
        assert!(!check("agent_name == 'worker_2'", &state));
        assert!(check("agent_name != 'worker_2'", &state));
    }

    #[test]
    fn test_number_comparison() {
        let state = view(json!({"score": 7.5}));
        assert!(check("score > 5", &state));
        assert!(!check("score > 10", &state));
        assert!(check("score >= 7.5", &state));
        assert!(check("score <= 7.5", &state));
        assert!(!check("score < 7", &state));
    }

    #[test]
    fn test_numbers_against_strings_are_false() {
        let state = view(json!({"score": "high"}));
        assert!(!check("score > 1", &state));
        assert!(!check("score < 1", &state));
    }

    #[test]
    fn test_missing_field_is_null() {
        let state = StateView::default();
        assert!(check("missing == null", &state));
        assert!(!check("missing != null", &state));
        assert!(!check("missing == 'value'", &state));
    }

    #[test]
    fn test_contains() {
        let state = view(json!({
            "main_query": "Create S3 bucket and Lambda function",
            "tags": ["bug", "urgent"],
            "ids": [1, 2, 3]
        }));
        assert!(check("main_query contains 'Lambda'", &state));
        assert!(!check("main_query contains 'lambda'", &state));
        assert!(check("tags contains 'urgent'", &state));
        assert!(!check("tags contains 'frontend'", &state));
        assert!(check("ids contains 2", &state));
    }

    #[test]
    fn test_logical_operators() {
        let state = view(json!({"intent": "code", "confidence": 0.9, "done": false}));
        assert!(check("intent == 'code' and confidence > 0.8", &state));
        assert!(!check("intent == 'search' and confidence > 0.8", &state));
        assert!(check("intent == 'search' or confidence > 0.8", &state));
        assert!(check("not done == true", &state));
        assert!(!check("not (intent == 'code' or done == true)", &state));
    }

    #[test]
    fn test_nested_path() {
        let state = view(json!({"current_task": {"description": "Task 1", "agent_name": "worker_1"}}));
        assert!(check("current_task.agent_name == 'worker_1'", &state));
        assert!(!check("current_task.description == 'Task 2'", &state));
    }
}
