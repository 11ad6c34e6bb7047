//! Bundled domain library.
//!
//! A small set of statistics, sequence and alignment functions exposed as the
//! `Stats`, `Seq` and `Align` namespaces. Hosts with their own library build
//! a [`Registry`] directly instead.

mod align;
mod seq;
mod stats;

use crate::registry::{CallError, Registry};
use crate::value::Value;

pub(crate) fn builtin_registry() -> Registry {
    Registry::new()
        .with_namespace(stats::namespace())
        .with_namespace(seq::namespace())
        .with_namespace(align::namespace())
}

fn arg<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a Value, CallError> {
    args.get(index)
        .ok_or_else(|| CallError(format!("missing argument '{}'", name)))
}

fn number(args: &[Value], index: usize, name: &str) -> Result<f64, CallError> {
    let value = arg(args, index, name)?;
    value.as_f64().ok_or_else(|| {
        CallError(format!(
            "argument '{}' must be a number, got {}",
            name,
            value.type_name()
        ))
    })
}

fn string<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a str, CallError> {
    let value = arg(args, index, name)?;
    value.as_str().ok_or_else(|| {
        CallError(format!(
            "argument '{}' must be a string, got {}",
            name,
            value.type_name()
        ))
    })
}

fn numbers(args: &[Value], index: usize, name: &str) -> Result<Vec<f64>, CallError> {
    let value = arg(args, index, name)?;
    let items = value.as_array().ok_or_else(|| {
        CallError(format!(
            "argument '{}' must be an array of numbers, got {}",
            name,
            value.type_name()
        ))
    })?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_f64().ok_or_else(|| {
                CallError(format!(
                    "argument '{}' must contain only numbers, element {} is {}",
                    name,
                    i,
                    item.type_name()
                ))
            })
        })
        .collect()
}
