//! Maven version parsing, comparison, and pattern matching.
//!
//! Maven versions use a custom ordering that differs from semver:
//! - Segments are split on `.` and `-`
//! - Numeric segments compare as numbers
//! - String qualifiers have a special ordering:
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (release) < `sp`
//! - Unknown qualifiers sort lexicographically, after the known ones
//!
//! This is the single source of truth for version ordering in the resolver:
//! stream selection, no-stream fallback, and cross-channel arbitration all
//! go through [`compare`] or [`latest_of`].

use std::cmp::Ordering;

use regex::Regex;

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(QualifierKind),
    Text(String),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

fn parse_segments(version: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for ch in version.chars() {
        if ch == '.' || ch == '-' {
            if !current.is_empty() {
                segments.push(classify(&current));
                current.clear();
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        segments.push(classify(&current));
    }

    segments
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "" | "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(n) => {
            if *n > 0 {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        Segment::Qualifier(q) => q.cmp(&QualifierKind::Release),
        Segment::Text(s) if s.is_empty() => Ordering::Equal,
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
        (Segment::Numeric(_), Segment::Qualifier(_)) => Ordering::Greater,
        (Segment::Qualifier(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Segment::Qualifier(q), Segment::Text(_)) => {
            if *q >= QualifierKind::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Segment::Text(_), Segment::Qualifier(q)) => {
            if *q >= QualifierKind::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

/// Compare two Maven version strings under `ComparableVersion` semantics.
///
/// Ties (equal under segment comparison) are broken by exact string equality;
/// two versions that tokenize identically but differ as strings (which does
/// not happen with this tokenizer, since it is lossless modulo separators)
/// would otherwise collapse — callers that need a strict total order over
/// distinct strings should pair this with string equality, as [`latest_of`] does.
pub fn compare(a: &str, b: &str) -> Ordering {
    let sa = parse_segments(a);
    let sb = parse_segments(b);
    let max_len = sa.len().max(sb.len());
    for i in 0..max_len {
        let ord = compare_segments(sa.get(i), sb.get(i));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Anchored full match of a version string against a regex pattern.
///
/// Anchoring is applied by wrapping `pattern` in `^(?:...)$` if it is not
/// already anchored, so a `versionPattern` of `"1\\..*"` matches `"1.2.3"`
/// in full rather than merely containing a matching substring.
pub fn matches(version: &str, pattern: &Regex) -> bool {
    let anchored = anchor(pattern.as_str());
    match Regex::new(&anchored) {
        Ok(re) => re.is_match(version),
        Err(_) => pattern.is_match(version),
    }
}

fn anchor(pattern: &str) -> String {
    let starts = pattern.starts_with('^');
    let ends = pattern.ends_with('$');
    match (starts, ends) {
        (true, true) => pattern.to_string(),
        (true, false) => format!("{pattern}$"),
        (false, true) => format!("^{pattern}"),
        (false, false) => format!("^(?:{pattern})$"),
    }
}

/// The comparator-greatest version among `candidates`, or `None` if empty.
///
/// Ties under [`compare`] (distinct strings that tokenize to the same
/// ordering key) keep the first-encountered candidate, mirroring the
/// resolver's "earliest wins on ties" rule elsewhere in arbitration.
pub fn latest_of<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<&str> = None;
    for candidate in candidates {
        best = match best {
            None => Some(candidate),
            Some(current) => {
                if compare(candidate, current) == Ordering::Greater {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

/// Whether `version` is a Maven `-SNAPSHOT` version.
pub fn is_snapshot(version: &str) -> bool {
    version.ends_with("-SNAPSHOT")
}

/// The base version without a trailing `-SNAPSHOT` suffix.
pub fn base_version(version: &str) -> &str {
    version.strip_suffix("-SNAPSHOT").unwrap_or(version)
}
