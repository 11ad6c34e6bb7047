//! `Stats` namespace: descriptive statistics and correlation.

use crate::registry::{CallError, CallResult, Namespace};
use crate::value::Value;

use super::numbers;

pub(super) fn namespace() -> Namespace {
    Namespace::new("Stats")
        .with_function("mean", |args| unary(args, mean))
        .with_function("median", |args| unary(args, median))
        .with_function("variance", |args| unary(args, variance))
        .with_function("std_dev", |args| unary(args, std_dev))
        .with_function("min", |args| unary(args, min))
        .with_function("max", |args| unary(args, max))
        .with_function("sum", |args| Ok(Value::Number(numbers(args, 0, "data")?.iter().sum())))
        .with_function("describe", describe)
        .with_function("pearson", pearson)
}

fn unary(args: &[Value], f: fn(&[f64]) -> Result<f64, CallError>) -> CallResult {
    let data = numbers(args, 0, "data")?;
    f(&data).map(Value::Number)
}

fn non_empty(data: &[f64], what: &str) -> Result<(), CallError> {
    if data.is_empty() {
        Err(CallError(format!("{} of empty data", what)))
    } else {
        Ok(())
    }
}

fn mean(data: &[f64]) -> Result<f64, CallError> {
    non_empty(data, "mean")?;
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

fn median(data: &[f64]) -> Result<f64, CallError> {
    non_empty(data, "median")?;
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Ok(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Sample variance (n - 1 denominator).
fn variance(data: &[f64]) -> Result<f64, CallError> {
    if data.len() < 2 {
        return Err("variance needs at least two values".into());
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    Ok(ss / (data.len() - 1) as f64)
}

fn std_dev(data: &[f64]) -> Result<f64, CallError> {
    variance(data).map(f64::sqrt)
}

fn min(data: &[f64]) -> Result<f64, CallError> {
    non_empty(data, "min")?;
    Ok(data.iter().copied().fold(f64::INFINITY, f64::min))
}

fn max(data: &[f64]) -> Result<f64, CallError> {
    non_empty(data, "max")?;
    Ok(data.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

fn describe(args: &[Value]) -> CallResult {
    let data = numbers(args, 0, "data")?;
    non_empty(&data, "describe")?;
    let spread = if data.len() > 1 { std_dev(&data)? } else { 0.0 };
    Ok(Value::object([
        ("count", Value::from(data.len())),
        ("mean", Value::Number(mean(&data)?)),
        ("median", Value::Number(median(&data)?)),
        ("std_dev", Value::Number(spread)),
        ("min", Value::Number(min(&data)?)),
        ("max", Value::Number(max(&data)?)),
    ]))
}

fn pearson(args: &[Value]) -> CallResult {
    let x = numbers(args, 0, "x")?;
    let y = numbers(args, 1, "y")?;
    if x.len() != y.len() {
        return Err(CallError(format!(
            "x and y must have equal length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err("pearson needs at least two points".into());
    }
    let (mx, my) = (mean(&x)?, mean(&y)?);
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in x.iter().zip(&y) {
        cov += (a - mx) * (b - my);
        vx += (a - mx).powi(2);
        vy += (b - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return Err("pearson is undefined for constant input".into());
    }
    Ok(Value::Number(cov / (vx.sqrt() * vy.sqrt())))
}
