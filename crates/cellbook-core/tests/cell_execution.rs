//! Integration tests for running cells through the public API.

use cellbook_core::parser::parse_value;
use cellbook_core::{
    Call, Context, Interpreter, NO_OUTPUT, OutputKind, Statement, Value, classify, parse_line,
};

fn run(interp: &Interpreter, source: &str, ctx: &Context) -> (cellbook_core::OutputDescriptor, Context) {
    let outcome = interp.execute(source, ctx).unwrap();
    (outcome.output, outcome.context)
}

#[test]
fn test_assign_call_parse() {
    let stmt = parse_line("x = Stats.mean([1, 2, 3])", &Context::new());
    assert_eq!(
        stmt,
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
fn test_context_chains_across_cells() {
    let interp = Interpreter::builtin();
    let (_, ctx) = run(&interp, "seq = \"ATGCGC\"\ngc = Seq.gc_content(seq)", &Context::new());
    let (out, ctx) = run(&interp, "display(gc)", &ctx);

    assert_eq!(out.kind, OutputKind::Text);
    assert_eq!(out.data, Value::from(format!("{}", 4.0 / 6.0)));
    assert_eq!(ctx.names().collect::<Vec<_>>(), ["seq", "gc"]);
}

#[test]
fn test_snapshot_semantics() {
    // Arguments capture the value at the time the line runs.
    let interp = Interpreter::builtin();
    let source = "a = [1, 2]\nb = Stats.sum(a)\na = [10]\nc = Stats.sum(a)";
    let (_, ctx) = run(&interp, source, &Context::new());
    assert_eq!(ctx.get("b"), Some(&Value::Number(3.0)));
    assert_eq!(ctx.get("c"), Some(&Value::Number(10.0)));
}

#[test]
fn test_library_outputs_classify() {
    let interp = Interpreter::builtin();

    let (out, _) = run(&interp, "Stats.describe([1, 2, 3])", &Context::new());
    assert_eq!(out.kind, OutputKind::Table);
    assert_eq!(out.data.as_array().map(|rows| rows.len()), Some(1));

    let (out, _) = run(&interp, "Align.global(\"ACGT\", \"AGT\")", &Context::new());
    assert_eq!(out.kind, OutputKind::Alignment);

    let (out, _) = run(&interp, "r = Seq.reverse_complement(\"AACG\")\ndisplay(r, \"sequence\")", &Context::new());
    assert_eq!(out.kind, OutputKind::Sequence);
    assert_eq!(out.data, Value::from("CGTT"));

    let (out, _) = run(&interp, "Seq.kmers(\"ACGT\", 2)", &Context::new());
    assert_eq!(out.kind, OutputKind::Text);
}

#[test]
fn test_comments_only_cell() {
    let interp = Interpreter::builtin();
    let (out, ctx) = run(&interp, "# header\n// nothing to do", &Context::new());
    assert_eq!(out.data, Value::from(NO_OUTPUT));
    assert!(ctx.is_empty());
}

#[test]
fn test_failure_message_is_verbatim() {
    let interp = Interpreter::builtin();
    let err = interp
        .execute("Seq.gc_content(\"ACXG\")", &Context::new())
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid DNA base 'X' at position 2");
}

#[test]
fn test_value_roundtrips_through_context_json() {
    let nested = parse_value(
        "{name: 'sample', tags: ['a', \"b\"], depth: -2.5, ok: true, none: null, rows: [[1, 2], {k: 3}]}",
        &Context::new(),
    );
    let mut ctx = Context::new();
    ctx.set("nested", nested.clone());
    ctx.set("empty", Value::Array(vec![]));
    ctx.set("blank", Value::from(""));

    let json = serde_json::to_string(&ctx).unwrap();
    let back: Context = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ctx);
    assert_eq!(back.get("nested").map(Value::type_name), Some("object"));
}

#[test]
fn test_overflowing_numbers_stay_numbers_across_the_boundary() {
    let interp = Interpreter::builtin();
    let source = format!("big = {}\nr = Stats.sum([big, 1])", "9".repeat(400));
    let (_, ctx) = run(&interp, &source, &Context::new());
    assert_eq!(ctx.get("big"), Some(&Value::Number(f64::INFINITY)));

    let json = serde_json::to_string(&ctx).unwrap();
    let back: Context = serde_json::from_str(&json).unwrap();
    assert_eq!(back.get("big").map(Value::type_name), Some("number"));
    assert_eq!(back, ctx);

    let (out, _) = run(&interp, "display(r)", &back);
    assert_eq!(out.data, Value::from("Infinity"));
}

#[test]
fn test_stats_object_classifies_as_table() {
    let value = parse_value("{mean: 2, count: 3}", &Context::new());
    let out = classify(value.clone(), None);
    assert_eq!(out.kind, OutputKind::Table);
    assert_eq!(out.data, Value::Array(vec![value]));
}
