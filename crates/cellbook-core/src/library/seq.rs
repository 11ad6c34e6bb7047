//! `Seq` namespace: nucleotide sequence utilities.

use crate::registry::{CallError, CallResult, Namespace};
use crate::value::Value;

use super::{number, string};

pub(super) fn namespace() -> Namespace {
    Namespace::new("Seq")
        .with_function("length", |args| {
            Ok(Value::from(string(args, 0, "seq")?.chars().count()))
        })
        .with_function("gc_content", gc_content)
        .with_function("reverse_complement", reverse_complement)
        .with_function("transcribe", transcribe)
        .with_function("kmers", kmers)
}

/// Uppercase and validate a DNA sequence (IUPAC `ACGTN`).
fn dna(raw: &str) -> Result<String, CallError> {
    let upper = raw.trim().to_ascii_uppercase();
    match upper
        .chars()
        .enumerate()
        .find(|&(_, c)| !matches!(c, 'A' | 'C' | 'G' | 'T' | 'N'))
    {
        Some((pos, base)) => Err(CallError(format!(
            "invalid DNA base '{}' at position {}",
            base, pos
        ))),
        None => Ok(upper),
    }
}

fn gc_content(args: &[Value]) -> CallResult {
    let seq = dna(string(args, 0, "seq")?)?;
    if seq.is_empty() {
        return Err("gc_content of empty sequence".into());
    }
    let gc = seq.chars().filter(|c| matches!(c, 'G' | 'C')).count();
    Ok(Value::Number(gc as f64 / seq.len() as f64))
}

fn reverse_complement(args: &[Value]) -> CallResult {
    let seq = dna(string(args, 0, "seq")?)?;
    let rc: String = seq
        .chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'T' => 'A',
            'C' => 'G',
            'G' => 'C',
            other => other,
        })
        .collect();
    Ok(Value::String(rc))
}

fn transcribe(args: &[Value]) -> CallResult {
    let seq = dna(string(args, 0, "seq")?)?;
    Ok(Value::String(seq.replace('T', "U")))
}

fn kmers(args: &[Value]) -> CallResult {
    let seq = dna(string(args, 0, "seq")?)?;
    let k = number(args, 1, "k")?;
    if k < 1.0 || k.fract() != 0.0 {
        return Err(CallError(format!("k must be a positive integer, got {}", k)));
    }
    let k = k as usize;
    if k > seq.len() {
        return Ok(Value::Array(Vec::new()));
    }
    let kmers = (0..=seq.len() - k)
        .map(|i| Value::String(seq[i..i + k].to_string()))
        .collect();
    Ok(Value::Array(kmers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> CallResult {
        let ns = namespace();
        let f = ns.get(name).unwrap();
        f(args)
    }

    #[test]
    fn test_gc_content() {
        assert_eq!(call("gc_content", &[Value::from("ggcc")]).unwrap(), Value::Number(1.0));
        assert_eq!(call("gc_content", &[Value::from("ATGC")]).unwrap(), Value::Number(0.5));
    }

    #[test]
    fn test_reverse_complement_and_transcribe() {
        assert_eq!(
            call("reverse_complement", &[Value::from("AACG")]).unwrap(),
            Value::from("CGTT")
        );
        assert_eq!(call("transcribe", &[Value::from("ATTG")]).unwrap(), Value::from("AUUG"));
    }

    #[test]
    fn test_invalid_base() {
        let err = call("gc_content", &[Value::from("ACXG")]).unwrap_err();
        assert_eq!(err.0, "invalid DNA base 'X' at position 2");
    }

    #[test]
    fn test_kmers() {
        assert_eq!(
            call("kmers", &[Value::from("ACGT"), Value::Number(3.0)]).unwrap(),
            Value::Array(vec!["ACG".into(), "CGT".into()])
        );
        assert_eq!(
            call("kmers", &[Value::from("AC"), Value::Number(3.0)]).unwrap(),
            Value::Array(vec![])
        );
        assert!(call("kmers", &[Value::from("AC"), Value::Number(0.0)]).is_err());
    }

    #[test]
    fn test_length() {
        assert_eq!(call("length", &[Value::from("ACGT")]).unwrap(), Value::Number(4.0));
    }
}
