//! Line classification.

use crate::value::{Context, Value};

use super::literal::{is_identifier, is_word_char, parse_args};

/// A call into a registry namespace with already-resolved arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub namespace: String,
    pub function: String,
    pub args: Vec<Value>,
}

/// The parsed form of one source line.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Blank line or comment.
    Skip,
    /// `display(<args>)`. The argument text is evaluated by the interpreter.
    Display { args: String },
    /// `var = Namespace.function(args)`
    Assign { var: String, call: Call },
    /// `var = <literal or variable>`
    AssignLiteral { var: String, expr: String },
    /// `Namespace.function(args)`
    Call(Call),
    /// Anything else. Looked up as a variable name at execution time.
    Expression(String),
}

/// Parse one line against the current context.
///
/// Never fails: lines that match no specific form degrade to
/// [`Statement::Expression`].
pub fn parse_line(line: &str, context: &Context) -> Statement {
    let line = line.trim();

    if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
        return Statement::Skip;
    }

    if let Some(args) = display_args(line) {
        return Statement::Display {
            args: args.to_string(),
        };
    }

    if let Some((var, rest)) = split_assignment(line) {
        return match parse_call(rest, context) {
            Some(call) => Statement::Assign {
                var: var.to_string(),
                call,
            },
            None => Statement::AssignLiteral {
                var: var.to_string(),
                expr: rest.to_string(),
            },
        };
    }

    if let Some(call) = parse_call(line, context) {
        return Statement::Call(call);
    }

    Statement::Expression(line.to_string())
}

/// Parse `Namespace.function(args)` spanning the whole of `expr`.
///
/// The namespace must start with an uppercase ASCII letter. The argument
/// list runs from the first `(` after the function name to the final `)`.
pub fn parse_call(expr: &str, context: &Context) -> Option<Call> {
    let (namespace, rest) = expr.split_once('.')?;
    if !namespace.starts_with(|c: char| c.is_ascii_uppercase())
        || !namespace.chars().all(is_word_char)
    {
        return None;
    }

    let (function, rest) = rest.split_once('(')?;
    if function.is_empty() || !function.chars().all(is_word_char) {
        return None;
    }

    let args = rest.strip_suffix(')')?;
    Some(Call {
        namespace: namespace.to_string(),
        function: function.to_string(),
        args: parse_args(args, context),
    })
}

fn display_args(line: &str) -> Option<&str> {
    line.strip_prefix("display(")?
        .strip_suffix(')')
        .filter(|args| !args.is_empty())
}

/// Split `name = rest` where `name` is an identifier and `rest` is non-empty.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let (lhs, rhs) = line.split_once('=')?;
    let var = lhs.trim_end();
    let rest = rhs.trim();
    (is_identifier(var) && !rest.is_empty()).then_some((var, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Statement {
        parse_line(line, &Context::new())
    }

    #[test]
    fn test_skip_lines() {
        assert_eq!(parse(""), Statement::Skip);
        assert_eq!(parse("    "), Statement::Skip);
        assert_eq!(parse("// comment"), Statement::Skip);
        assert_eq!(parse("  # also a comment"), Statement::Skip);
    }

    #[test]
    fn test_assign_call() {
        assert_eq!(
            parse("x = Stats.mean([1, 2, 3])"),
            Statement::Assign {
                var: "x".to_string(),
                call: Call {
                    namespace: "Stats".to_string(),
                    function: "mean".to_string(),
                    args: vec![Value::from(vec![1.0, 2.0, 3.0])],
                },
            }
        );
    }

    #[test]
    fn test_assign_literal() {
        assert_eq!(
            parse("greeting='hello'"),
            Statement::AssignLiteral {
                var: "greeting".to_string(),
                expr: "'hello'".to_string(),
            }
        );
        // Lowercase namespace is not a call.
        assert_eq!(
            parse("y = stats.mean(1)"),
            Statement::AssignLiteral {
                var: "y".to_string(),
                expr: "stats.mean(1)".to_string(),
            }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            parse("display(x, \"table\")"),
            Statement::Display {
                args: "x, \"table\"".to_string(),
            }
        );
        // Needs at least one character between the parentheses.
        assert_eq!(parse("display()"), Statement::Expression("display()".to_string()));
    }

    #[test]
    fn test_display_takes_priority_over_assignment() {
        assert_eq!(
            parse("display(a = 1)"),
            Statement::Display {
                args: "a = 1".to_string(),
            }
        );
    }

    #[test]
    fn test_bare_call() {
        assert_eq!(
            parse("Seq.gc_content(\"GGCC\")"),
            Statement::Call(Call {
                namespace: "Seq".to_string(),
                function: "gc_content".to_string(),
                args: vec![Value::from("GGCC")],
            })
        );
        assert_eq!(
            parse("Core.now()"),
            Statement::Call(Call {
                namespace: "Core".to_string(),
                function: "now".to_string(),
                args: vec![],
            })
        );
    }

    #[test]
    fn test_fallback_to_expression() {
        assert_eq!(parse("x"), Statement::Expression("x".to_string()));
        assert_eq!(parse("1 + 2"), Statement::Expression("1 + 2".to_string()));
        assert_eq!(
            parse("Stats.mean(1"),
            Statement::Expression("Stats.mean(1".to_string())
        );
        assert_eq!(parse("= 3"), Statement::Expression("= 3".to_string()));
        assert_eq!(parse("x ="), Statement::Expression("x =".to_string()));
    }

    #[test]
    fn test_arguments_resolve_against_context() {
        let mut ctx = Context::new();
        ctx.set("data", Value::from(vec![4.0, 5.0]));

        let Statement::Call(call) = parse_line("Stats.sum(data)", &ctx) else {
            panic!("expected a call");
        };
        assert_eq!(call.args, vec![Value::from(vec![4.0, 5.0])]);
    }
}
