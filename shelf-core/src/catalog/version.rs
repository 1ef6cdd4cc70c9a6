//! Version ordering used to pick the newest package record
//!
//! Every pair of versions compares with the same Debian-style rules, so the
//! ordering is total and sorting never depends on input order: optional
//! numeric epoch, upstream version compared run by run, then revision after
//! the last `-`. A leading `v` before a digit is ignored. Pre-releases are
//! written with `~` (`1.0~beta1` sorts before `1.0`).

use std::cmp::Ordering;

/// Compare two version strings, newest last
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    compare_debian(normalize(a), normalize(b))
}

/// Drop surrounding whitespace and a `v` prefix on `v1.2`-style tags
fn normalize(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => trimmed,
    }
}

fn compare_debian(a: &str, b: &str) -> Ordering {
    let (epoch_a, upstream_a, revision_a) = split_debian(a);
    let (epoch_b, upstream_b, revision_b) = split_debian(b);

    epoch_a
        .cmp(&epoch_b)
        .then_with(|| compare_runs(upstream_a, upstream_b))
        .then_with(|| compare_runs(revision_a, revision_b))
}

fn split_debian(version: &str) -> (u64, &str, &str) {
    let (epoch, rest) = match version.split_once(':') {
        Some((epoch, rest)) if !epoch.is_empty() && epoch.bytes().all(|b| b.is_ascii_digit()) => {
            (epoch.parse().unwrap_or(u64::MAX), rest)
        }
        _ => (0, version),
    };

    match rest.rsplit_once('-') {
        Some((upstream, revision)) => (epoch, upstream, revision),
        None => (epoch, rest, ""),
    }
}

/// Weight of a non-digit byte; `~` sorts before the end of the string
fn weight(byte: Option<u8>) -> i32 {
    match byte {
        None => 0,
        Some(b'~') => -1,
        Some(b) if b.is_ascii_digit() => 0,
        Some(b) if b.is_ascii_alphabetic() => i32::from(b),
        Some(b) => i32::from(b) + 256,
    }
}

fn compare_runs(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let is_digit = |s: &[u8], i: usize| s.get(i).is_some_and(u8::is_ascii_digit);

    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        while (i < a.len() && !is_digit(a, i)) || (j < b.len() && !is_digit(b, j)) {
            let wa = weight(a.get(i).copied());
            let wb = weight(b.get(j).copied());
            if wa != wb {
                return wa.cmp(&wb);
            }
            i += 1;
            j += 1;
        }

        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while is_digit(a, i) && is_digit(b, j) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        // A longer digit run is the larger number
        if is_digit(a, i) {
            return Ordering::Greater;
        }
        if is_digit(b, j) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod version_tests {
    use super::*;

    #[test]
    fn test_numeric_runs() {
        assert_eq!(compare_versions("1.2.0", "1.10.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "1.99.99"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.10"), Ordering::Less);
        assert_eq!(compare_versions("0010.1", "10.1"), Ordering::Equal);
        assert_eq!(compare_versions("1.2.3.4", "1.2.3"), Ordering::Greater);
    }

    #[test]
    fn test_v_prefix_is_ignored() {
        assert_eq!(compare_versions("v1.2.0", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("v2", "10"), Ordering::Less);
        assert_eq!(compare_versions(" 1.0 ", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_tilde_sorts_before_release() {
        assert_eq!(compare_versions("2.0~beta1", "2.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0~beta2", "2.0~beta1"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0~rc1", "1.0.0"), Ordering::Less);
    }

    #[test]
    fn test_epoch_wins_over_upstream() {
        assert_eq!(compare_versions("1:0.9", "2.0"), Ordering::Greater);
        assert_eq!(compare_versions("1:0.9", "2:0.1"), Ordering::Less);
    }

    #[test]
    fn test_revisions() {
        assert_eq!(compare_versions("1.0-1", "1.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0-2", "1.0-10"), Ordering::Less);
        assert_eq!(compare_versions("1.0a-2", "1.0a-10"), Ordering::Less);
        assert_eq!(compare_versions("1.0b", "1.0a"), Ordering::Greater);
        // A hyphen-suffixed tag is a revision, newer than the bare version
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0"), Ordering::Greater);
    }

    /// Mixed version styles that used to form an ordering cycle
    const MIXED: &[&str] = &[
        "1.0.0-beta",
        "1.0.0",
        "1.0.0-alpha~",
        "1.0-1",
        "1.0",
        "v1.0.0",
        "1.0~rc1",
        "1:0.1",
        "2.0.0+build",
        "1.0a",
        "0.9.9",
        "1.0.0-1",
    ];

    #[test]
    fn test_ordering_is_total_over_mixed_styles() {
        for a in MIXED {
            assert_eq!(compare_versions(a, a), Ordering::Equal, "{a} vs itself");

            for b in MIXED {
                let ab = compare_versions(a, b);
                assert_eq!(ab, compare_versions(b, a).reverse(), "{a} vs {b} is not antisymmetric");

                for c in MIXED {
                    let bc = compare_versions(b, c);
                    if ab != Ordering::Greater && bc != Ordering::Greater {
                        assert_ne!(
                            compare_versions(a, c),
                            Ordering::Greater,
                            "{a} <= {b} <= {c} but {a} > {c}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_sorting_mixed_styles_is_order_independent() {
        let mut forward: Vec<&str> = MIXED.to_vec();
        let mut reverse: Vec<&str> = MIXED.iter().rev().copied().collect();
        forward.sort_by(|a, b| compare_versions(a, b).then_with(|| a.cmp(b)));
        reverse.sort_by(|a, b| compare_versions(a, b).then_with(|| a.cmp(b)));

        assert_eq!(forward, reverse);
        assert_eq!(forward.last(), Some(&"1:0.1"));
    }
}
