use anyhow::{bail, Result};

/// Threshold expression over a numeric input.
///
/// Accepted forms: `<N`, `<=N`, `>N`, `>=N`, `N-M` (inclusive on both ends)
/// and a bare `N` for an exact match. Bounds may be fractional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeOp {
    LessThan(f64),
    LessEqual(f64),
    GreaterThan(f64),
    GreaterEqual(f64),
    Equal(f64),
    Between(f64, f64), // Inclusive range: N-M
}

impl RangeOp {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(val) = s.strip_prefix(">=") {
            Ok(RangeOp::GreaterEqual(parse_bound(val)?))
        } else if let Some(val) = s.strip_prefix("<=") {
            Ok(RangeOp::LessEqual(parse_bound(val)?))
        } else if let Some(val) = s.strip_prefix('>') {
            Ok(RangeOp::GreaterThan(parse_bound(val)?))
        } else if let Some(val) = s.strip_prefix('<') {
            Ok(RangeOp::LessThan(parse_bound(val)?))
        } else if s.contains('-') && !s.starts_with('-') {
            // Range format: "40-79.5"
            let parts: Vec<&str> = s.split('-').collect();
            if parts.len() == 2 {
                let low = parse_bound(parts[0])?;
                let high = parse_bound(parts[1])?;
                if low > high {
                    bail!("Range lower bound exceeds upper bound: {}", s)
                }
                Ok(RangeOp::Between(low, high))
            } else {
                bail!("Invalid range format: {}", s)
            }
        } else {
            Ok(RangeOp::Equal(parse_bound(s)?))
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        match self {
            RangeOp::LessThan(n) => value < *n,
            RangeOp::LessEqual(n) => value <= *n,
            RangeOp::GreaterThan(n) => value > *n,
            RangeOp::GreaterEqual(n) => value >= *n,
            RangeOp::Equal(n) => value == *n,
            RangeOp::Between(low, high) => value >= *low && value <= *high,
        }
    }

    /// Points where `matches` can change its answer.
    pub fn bounds(&self) -> Vec<f64> {
        match *self {
            RangeOp::LessThan(n)
            | RangeOp::LessEqual(n)
            | RangeOp::GreaterThan(n)
            | RangeOp::GreaterEqual(n)
            | RangeOp::Equal(n) => vec![n],
            RangeOp::Between(low, high) => vec![low, high],
        }
    }
}

/// Every bound of `ops` plus `extra`, sorted ascending without duplicates.
pub fn breakpoints(ops: &[RangeOp], extra: &[f64]) -> Vec<f64> {
    let mut points: Vec<f64> = ops
        .iter()
        .flat_map(|op| op.bounds())
        .chain(extra.iter().copied())
        .collect();
    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup();
    points
}

/// Values that decide every membership question over `points`: each point
/// itself plus the midpoint of each gap between neighbours. Between two
/// consecutive breakpoints no `RangeOp` can change its answer.
pub fn decisive_values(points: &[f64]) -> Vec<f64> {
    let mut values = Vec::with_capacity(points.len() * 2);
    for (i, point) in points.iter().enumerate() {
        if let Some(next) = points.get(i + 1) {
            values.push(*point);
            values.push(point + (next - point) / 2.0);
        } else {
            values.push(*point);
        }
    }
    values
}

fn parse_bound(raw: &str) -> Result<f64> {
    let value: f64 = raw.trim().parse()?;
    if !value.is_finite() {
        bail!("Bound must be a finite number: {}", raw.trim())
    }
    Ok(value)
}

/// Outcome of a first-match bucket lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketMatch {
    pub index: usize,
    pub range: String,
    pub score: f64,
}

/// Return the score of the first bucket whose range matches `value`.
///
/// Buckets with an unparseable range are skipped; rule sets are validated
/// before they reach the engine, so in practice every range parses.
pub fn first_match<T, F1, F2>(
    value: f64,
    buckets: &[T],
    get_range: F1,
    get_score: F2,
) -> Option<BucketMatch>
where
    F1: Fn(&T) -> &str,
    F2: Fn(&T) -> f64,
{
    for (index, bucket) in buckets.iter().enumerate() {
        let range_str = get_range(bucket);
        if let Ok(range) = RangeOp::parse(range_str) {
            if range.matches(value) {
                return Some(BucketMatch {
                    index,
                    range: range_str.to_string(),
                    score: get_score(bucket),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_less_than() {
        let range = RangeOp::parse("<10").unwrap();
        assert!(range.matches(9.99));
        assert!(!range.matches(10.0));
        assert!(!range.matches(15.0));
    }

    #[test]
    fn test_parse_range_less_equal() {
        let range = RangeOp::parse("<=50").unwrap();
        assert!(range.matches(50.0));
        assert!(!range.matches(50.5));
    }

    #[test]
    fn test_parse_range_greater_than() {
        let range = RangeOp::parse(">250").unwrap();
        assert!(!range.matches(250.0));
        assert!(range.matches(252.5));
    }

    #[test]
    fn test_parse_range_greater_equal() {
        let range = RangeOp::parse(">=80").unwrap();
        assert!(!range.matches(79.9));
        assert!(range.matches(80.0));
        assert!(range.matches(100.0));
    }

    #[test]
    fn test_parse_range_equal() {
        let range = RangeOp::parse("0").unwrap();
        assert!(range.matches(0.0));
        assert!(!range.matches(0.5));
    }

    #[test]
    fn test_parse_range_between_fractional() {
        let range = RangeOp::parse("40 - 79.5").unwrap();
        assert_eq!(range, RangeOp::Between(40.0, 79.5));
        assert!(range.matches(40.0));
        assert!(range.matches(79.5));
        assert!(!range.matches(79.6));
    }

    #[test]
    fn test_parse_range_rejects_inverted_between() {
        assert!(RangeOp::parse("80-40").is_err());
    }

    #[test]
    fn test_parse_range_rejects_garbage() {
        assert!(RangeOp::parse("most").is_err());
        assert!(RangeOp::parse("<").is_err());
        assert!(RangeOp::parse("1-2-3").is_err());
        assert!(RangeOp::parse("<inf").is_err());
    }

    #[test]
    fn test_breakpoints_and_decisive_values() {
        let ops = vec![
            RangeOp::parse("<33.3").unwrap(),
            RangeOp::parse(">=33.5").unwrap(),
            RangeOp::parse("10-33.3").unwrap(),
        ];
        let points = breakpoints(&ops, &[0.0, 100.0]);
        assert_eq!(points, vec![0.0, 10.0, 33.3, 33.5, 100.0]);

        let values = decisive_values(&points);
        assert_eq!(values.len(), 9);
        assert!(values.contains(&33.3));
        assert!(values.iter().any(|v| *v > 33.3 && *v < 33.5));
        assert_eq!(values.last(), Some(&100.0));
    }

    #[test]
    fn test_first_match_wins() {
        let buckets = vec![("<40", 83.0), ("<80", 17.0), (">=0", 3.0)];
        let hit = first_match(20.0, &buckets, |b| b.0, |b| b.1).unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.score, 83.0);

        let hit = first_match(95.0, &buckets, |b| b.0, |b| b.1).unwrap();
        assert_eq!(hit.index, 2);
        assert_eq!(hit.range, ">=0");
    }

    #[test]
    fn test_first_match_none_and_skips_invalid() {
        let buckets = vec![("bad", 1.0), ("<10", 2.0)];
        assert_eq!(first_match(5.0, &buckets, |b| b.0, |b| b.1).unwrap().score, 2.0);
        assert!(first_match(50.0, &buckets, |b| b.0, |b| b.1).is_none());
    }
}
