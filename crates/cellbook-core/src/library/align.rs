//! `Align` namespace: pairwise global alignment of DNA sequences.

use crate::registry::{CallError, CallResult, Namespace};
use crate::value::Value;

use super::{arg, string};

pub(super) fn namespace() -> Namespace {
    Namespace::new("Align")
        .with_function("global", global)
        .with_function("score", |args| {
            let (query, target, scoring) = inputs(args)?;
            Ok(Value::Number(needleman_wunsch(&query, &target, &scoring).score as f64))
        })
}

/// Largest accepted magnitude for a scoring value. Keeps every DP cell well
/// inside `i64`.
const MAX_SCORE: i64 = 1_000_000;

#[derive(Debug, Clone, Copy)]
struct Scoring {
    matched: i64,
    mismatch: i64,
    gap: i64,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            matched: 2,
            mismatch: -1,
            gap: -2,
        }
    }
}

impl Scoring {
    /// Read overrides from an optional `{match, mismatch, gap}` object.
    fn from_arg(value: Option<&Value>) -> Result<Self, CallError> {
        let mut scoring = Self::default();
        let Some(value) = value else {
            return Ok(scoring);
        };
        let map = value
            .as_object()
            .ok_or_else(|| CallError(format!("scoring must be an object, got {}", value.type_name())))?;
        for (key, v) in map {
            let n = v
                .as_f64()
                .filter(|n| n.fract() == 0.0 && n.abs() <= MAX_SCORE as f64)
                .ok_or_else(|| {
                    CallError(format!(
                        "scoring '{}' must be an integer between -{} and {}",
                        key, MAX_SCORE, MAX_SCORE
                    ))
                })? as i64;
            match key.as_str() {
                "match" => scoring.matched = n,
                "mismatch" => scoring.mismatch = n,
                "gap" => scoring.gap = n,
                other => return Err(CallError(format!("unknown scoring field '{}'", other))),
            }
        }
        Ok(scoring)
    }

    fn pair(&self, a: u8, b: u8) -> i64 {
        if a == b { self.matched } else { self.mismatch }
    }
}

struct Alignment {
    query: String,
    target: String,
    score: i64,
}

fn inputs(args: &[Value]) -> Result<(Vec<u8>, Vec<u8>, Scoring), CallError> {
    let query = string(args, 0, "query")?.trim().to_ascii_uppercase().into_bytes();
    let target = string(args, 1, "target")?.trim().to_ascii_uppercase().into_bytes();
    let scoring = Scoring::from_arg(args.get(2))?;
    if query.is_empty() || target.is_empty() {
        return Err("cannot align an empty sequence".into());
    }
    Ok((query, target, scoring))
}

fn global(args: &[Value]) -> CallResult {
    arg(args, 1, "target")?;
    let (query, target, scoring) = inputs(args)?;
    let aln = needleman_wunsch(&query, &target, &scoring);

    let matches = aln
        .query
        .bytes()
        .zip(aln.target.bytes())
        .filter(|(a, b)| a == b && *a != b'-')
        .count();
    let length = aln.query.len();

    Ok(Value::object([
        ("aligned_query", Value::String(aln.query)),
        ("aligned_target", Value::String(aln.target)),
        ("score", Value::Number(aln.score as f64)),
        ("identity", Value::Number(matches as f64 / length as f64)),
    ]))
}

/// Linear-gap global alignment. Ties prefer diagonal, then a gap in the
/// target, then a gap in the query.
fn needleman_wunsch(query: &[u8], target: &[u8], scoring: &Scoring) -> Alignment {
    let (n, m) = (query.len(), target.len());
    let mut h = vec![vec![0i64; m + 1]; n + 1];
    for (i, row) in h.iter_mut().enumerate() {
        row[0] = i as i64 * scoring.gap;
    }
    for j in 0..=m {
        h[0][j] = j as i64 * scoring.gap;
    }
    for i in 1..=n {
        for j in 1..=m {
            let diag = h[i - 1][j - 1] + scoring.pair(query[i - 1], target[j - 1]);
            let up = h[i - 1][j] + scoring.gap;
            let left = h[i][j - 1] + scoring.gap;
            h[i][j] = diag.max(up).max(left);
        }
    }

    let mut aq = Vec::with_capacity(n + m);
    let mut at = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && h[i][j] == h[i - 1][j - 1] + scoring.pair(query[i - 1], target[j - 1]) {
            aq.push(query[i - 1]);
            at.push(target[j - 1]);
            i -= 1;
            j -= 1;
        } else if i > 0 && h[i][j] == h[i - 1][j] + scoring.gap {
            aq.push(query[i - 1]);
            at.push(b'-');
            i -= 1;
        } else {
            aq.push(b'-');
            at.push(target[j - 1]);
            j -= 1;
        }
    }
    aq.reverse();
    at.reverse();

    Alignment {
        query: String::from_utf8_lossy(&aq).into_owned(),
        target: String::from_utf8_lossy(&at).into_owned(),
        score: h[n][m],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sequences() {
        let out = global(&[Value::from("ACGT"), Value::from("acgt")]).unwrap();
        let obj = out.as_object().unwrap();
        assert_eq!(obj["aligned_query"], Value::from("ACGT"));
        assert_eq!(obj["aligned_target"], Value::from("ACGT"));
        assert_eq!(obj["score"], Value::Number(8.0));
        assert_eq!(obj["identity"], Value::Number(1.0));
    }

    #[test]
    fn test_gap_in_target() {
        let out = global(&[Value::from("ACGT"), Value::from("AGT")]).unwrap();
        let obj = out.as_object().unwrap();
        assert_eq!(obj["aligned_query"], Value::from("ACGT"));
        assert_eq!(obj["aligned_target"], Value::from("A-GT"));
        assert_eq!(obj["score"], Value::Number(4.0));
        assert_eq!(obj["identity"], Value::Number(0.75));
    }

    #[test]
    fn test_custom_scoring() {
        let scoring = Value::object([("match", Value::Number(1.0)), ("gap", Value::Number(-1.0))]);
        let score = namespace().get("score").unwrap()(&[
            Value::from("ACGT"),
            Value::from("AGT"),
            scoring,
        ])
        .unwrap();
        assert_eq!(score, Value::Number(2.0));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            global(&[Value::from("ACGT")]).unwrap_err().0,
            "missing argument 'target'"
        );
        let bad = Value::object([("bonus", Value::Number(1.0))]);
        assert_eq!(
            global(&[Value::from("A"), Value::from("A"), bad]).unwrap_err().0,
            "unknown scoring field 'bonus'"
        );
    }

    #[test]
    fn test_out_of_range_scoring_rejected() {
        let huge = Value::object([("match", Value::Number(9_999_999_999_999_999_999.0))]);
        let err = global(&[Value::from("ACGT"), Value::from("ACGT"), huge]).unwrap_err();
        assert_eq!(err.0, "scoring 'match' must be an integer between -1000000 and 1000000");

        let fractional = Value::object([("gap", Value::Number(-1.5))]);
        assert!(global(&[Value::from("A"), Value::from("A"), fractional]).is_err());

        let edge = Value::object([("match", Value::Number(1_000_000.0))]);
        let out = global(&[Value::from("ACGT"), Value::from("ACGT"), edge]).unwrap();
        assert_eq!(out.as_object().unwrap()["score"], Value::Number(4_000_000.0));
    }
}
