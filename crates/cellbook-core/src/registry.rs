//! Namespace/function registry.
//!
//! The interpreter only needs lookup-by-name and invoke-with-positional
//! arguments. Every function shares the signature
//! `Fn(&[Value]) -> Result<Value, CallError>`.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Failure reported by a library function.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct CallError(pub String);

impl From<String> for CallError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for CallError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

pub type CallResult = std::result::Result<Value, CallError>;

/// A callable library function.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> CallResult + Send + Sync>;

/// A named table of functions.
#[derive(Clone)]
pub struct Namespace {
    name: String,
    functions: FxHashMap<String, NativeFn>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: FxHashMap::default(),
        }
    }

    /// Add a function, replacing any previous one with the same name.
    pub fn with_function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, function: &str) -> Option<&NativeFn> {
        self.functions.get(function)
    }

    /// Function names, sorted.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("functions", &self.function_names())
            .finish()
    }
}

/// Registry of namespaces, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    namespaces: FxHashMap<String, Namespace>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled library namespaces (`Stats`, `Seq`, `Align`).
    pub fn builtin() -> Self {
        crate::library::builtin_registry()
    }

    /// Register a namespace, replacing any previous one with the same name.
    pub fn register(&mut self, namespace: Namespace) -> &mut Self {
        self.namespaces.insert(namespace.name.clone(), namespace);
        self
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.register(namespace);
        self
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// Namespace names, sorted.
    pub fn namespace_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.namespaces.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve `namespace.function`.
    pub fn lookup(&self, namespace: &str, function: &str) -> Result<&NativeFn> {
        let ns = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| Error::UnknownNamespace(namespace.to_string()))?;
        ns.get(function).ok_or_else(|| Error::UnknownFunction {
            namespace: namespace.to_string(),
            function: function.to_string(),
        })
    }

    /// Resolve and invoke `namespace.function(args)`.
    pub fn call(&self, namespace: &str, function: &str, args: &[Value]) -> Result<Value> {
        let f = self.lookup(namespace, function)?;
        f(args).map_err(|e| Error::FunctionThrow(e.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new().with_namespace(
            Namespace::new("Test")
                .with_function("echo", |args| Ok(args.first().cloned().unwrap_or_default()))
                .with_function("fail", |_| Err("boom".into())),
        )
    }

    #[test]
    fn test_call() {
        let value = registry()
            .call("Test", "echo", &[Value::Number(7.0)])
            .unwrap();
        assert_eq!(value, Value::Number(7.0));
    }

    #[test]
    fn test_unknown_namespace() {
        let err = registry().call("Nope", "echo", &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownNamespace(ref ns) if ns == "Nope"));
        assert_eq!(err.to_string(), "Unknown namespace: Nope");
    }

    #[test]
    fn test_unknown_function() {
        let err = registry().call("Test", "nope", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown function: Test.nope");
    }

    #[test]
    fn test_function_failure_passes_message_through() {
        let err = registry().call("Test", "fail", &[]).unwrap_err();
        assert!(matches!(err, Error::FunctionThrow(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_names_are_sorted() {
        let reg = registry().with_namespace(Namespace::new("Alpha"));
        assert_eq!(reg.namespace_names(), ["Alpha", "Test"]);
        assert_eq!(reg.namespace("Test").unwrap().function_names(), ["echo", "fail"]);
    }
}
