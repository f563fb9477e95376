use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use concord_consensus::Reducer;

/// Merge rule applied to vote values, selected in the node config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceStrategy {
    /// Numeric sum. Integers stay integers while they fit in `i64`.
    #[default]
    Sum,
    /// Numeric maximum.
    Max,
    /// Keep the value of the first vote.
    First,
    /// Keep the value of the latest vote.
    Last,
}

impl ReduceStrategy {
    pub fn reducer(self) -> Reducer<Value> {
        match self {
            ReduceStrategy::Sum => Arc::new(|acc: &Value, v: Value| sum(acc, &v)),
            ReduceStrategy::Max => Arc::new(|acc: &Value, v: Value| {
                if number(&v)? > number(acc)? {
                    Ok(v)
                } else {
                    Ok(acc.clone())
                }
            }),
            ReduceStrategy::First => Arc::new(|acc: &Value, _: Value| Ok(acc.clone())),
            ReduceStrategy::Last => Arc::new(|_: &Value, v: Value| Ok(v)),
        }
    }
}

fn sum(acc: &Value, v: &Value) -> Result<Value, String> {
    if let (Some(a), Some(b)) = (acc.as_i64(), v.as_i64()) {
        if let Some(total) = a.checked_add(b) {
            return Ok(Value::from(total));
        }
    }
    let total = number(acc)? + number(v)?;
    Number::from_f64(total)
        .map(Value::Number)
        .ok_or_else(|| format!("sum is not a finite number: {total}"))
}

fn number(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("expected a numeric vote value, got {value}"))
}
