//! Notebook file format.
//!
//! A notebook is plain text split into cells by separator lines starting
//! with `%%`. Text after the marker names the cell; unnamed cells get
//! `cell-N` from their 1-based position. Text before the first separator
//! forms a leading cell when it is not blank.
//!
//! ```text
//! %% load
//! data = [1, 2, 3]
//! %%
//! Stats.describe(data)
//! ```

use std::path::Path;

use anyhow::Context as _;
use cellbook_server::CellSource;

const SEPARATOR: &str = "%%";

/// Read and split a notebook file.
pub fn load(path: &Path) -> anyhow::Result<Vec<CellSource>> {
    if !path.exists() {
        anyhow::bail!("Notebook not found: {}", path.display());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read notebook {}", path.display()))?;
    parse(&text)
}

/// Split notebook text into cells.
pub fn parse(text: &str) -> anyhow::Result<Vec<CellSource>> {
    let mut cells: Vec<(Option<String>, Vec<&str>)> = Vec::new();
    let mut preamble: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(name) = line.trim_start().strip_prefix(SEPARATOR) {
            let name = name.trim();
            cells.push(((!name.is_empty()).then(|| name.to_string()), Vec::new()));
        } else if let Some((_, body)) = cells.last_mut() {
            body.push(line);
        } else {
            preamble.push(line);
        }
    }

    if preamble.iter().any(|line| !line.trim().is_empty()) {
        cells.insert(0, (None, preamble));
    }

    let mut out: Vec<CellSource> = Vec::with_capacity(cells.len());
    for (i, (name, body)) in cells.into_iter().enumerate() {
        let id = name.unwrap_or_else(|| format!("cell-{}", i + 1));
        if out.iter().any(|cell| cell.id == id) {
            anyhow::bail!("Duplicate cell id: {}", id);
        }
        out.push(CellSource::new(id, body.join("\n").trim().to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_unnamed_cells() {
        let cells = parse("%% load\nx = 1\n\n%%\ndisplay(x)\n").unwrap();
        assert_eq!(
            cells,
            vec![CellSource::new("load", "x = 1"), CellSource::new("cell-2", "display(x)")]
        );
    }

    #[test]
    fn test_preamble_becomes_first_cell() {
        let cells = parse("a = 1\n%% next\nb = 2").unwrap();
        assert_eq!(cells[0], CellSource::new("cell-1", "a = 1"));
        assert_eq!(cells[1].id, "next");

        let cells = parse("\n\n%%\nb = 2").unwrap();
        assert_eq!(cells, vec![CellSource::new("cell-1", "b = 2")]);
    }

    #[test]
    fn test_no_separators() {
        let cells = parse("x = Stats.mean([1, 2])").unwrap();
        assert_eq!(cells, vec![CellSource::new("cell-1", "x = Stats.mean([1, 2])")]);
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = parse("%% a\n1\n%% a\n2").unwrap_err();
        assert_eq!(err.to_string(), "Duplicate cell id: a");
    }
}
