//! Output formatting for terminal display.

use cellbook_core::{OutputDescriptor, OutputKind, Value};

use crate::colors;

/// Print a cell result in a readable format.
pub fn print_output(cell_id: &str, output: &OutputDescriptor) {
    let color = if output.is_error() { colors::RED } else { colors::CYAN };
    println!(
        "\n{}{}:{} {}{} · {}ms{}",
        color,
        cell_id,
        colors::RESET,
        colors::DIM,
        output.kind.as_str(),
        output.timing_ms,
        colors::RESET
    );

    for line in render(output).lines() {
        println!("  {}", line);
    }
}

/// Plain-text rendering of an output descriptor.
pub fn render(output: &OutputDescriptor) -> String {
    match output.kind {
        OutputKind::Text | OutputKind::Sequence | OutputKind::Error => output.data.to_text(),
        OutputKind::Table => render_table(&output.data),
        OutputKind::Alignment => render_alignment(&output.data),
    }
}

/// One line per row; objects as `key: value` pairs.
fn render_table(data: &Value) -> String {
    let Some(rows) = data.as_array() else {
        return data.to_text();
    };
    rows.iter()
        .map(|row| match row {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join("  "),
            Value::Array(cells) => cells
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join("\t"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_alignment(data: &Value) -> String {
    let Some(map) = data.as_object() else {
        return data.to_text();
    };
    let field = |key: &str| map.get(key).map(Value::to_string).unwrap_or_default();
    let mut lines = vec![field("aligned_query"), field("aligned_target")];
    if let Some(score) = map.get("score") {
        lines.push(format!("score: {}", score));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_rows() {
        let out = OutputDescriptor::new(
            OutputKind::Table,
            Value::Array(vec![Value::object([
                ("count", Value::Number(3.0)),
                ("mean", Value::Number(2.0)),
            ])]),
        );
        assert_eq!(render(&out), "count: 3  mean: 2");
    }

    #[test]
    fn test_render_alignment() {
        let out = OutputDescriptor::new(
            OutputKind::Alignment,
            Value::object([
                ("aligned_query", Value::from("ACGT")),
                ("aligned_target", Value::from("A-GT")),
                ("score", Value::Number(4.0)),
            ]),
        );
        assert_eq!(render(&out), "ACGT\nA-GT\nscore: 4");
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render(&OutputDescriptor::text("5")), "5");
        assert_eq!(render(&OutputDescriptor::error("boom")), "boom");
    }
}
