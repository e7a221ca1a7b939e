//! Debian package version ordering.
//!
//! Versions have the shape `[epoch:]upstream[-revision]`. Comparison follows
//! dpkg: epochs numerically, then upstream and revision with the alternating
//! non-digit/digit algorithm, where `~` sorts before anything (even the end of
//! the string) and letters sort before other punctuation.

use std::cmp::Ordering;
use std::fmt;

/// Ordering capability used by the scanner. `None` means one side is malformed.
pub trait VersionOrdering: Send + Sync {
    fn compare(&self, left: &str, right: &str) -> Option<Ordering>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DpkgVersionOrdering;

impl VersionOrdering for DpkgVersionOrdering {
    fn compare(&self, left: &str, right: &str) -> Option<Ordering> {
        let left = DebianVersion::parse(left)?;
        let right = DebianVersion::parse(right)?;
        Some(left.cmp(&right))
    }
}

#[derive(Clone, Debug)]
pub struct DebianVersion {
    pub epoch: u64,
    pub upstream: String,
    pub revision: String,
}

impl DebianVersion {
    /// Parse a version string, returning `None` when it cannot be ordered.
    ///
    /// Examples:
    /// - "1.0" → epoch=0, upstream="1.0", revision=""
    /// - "4:1.0.2" → epoch=4, upstream="1.0.2", revision=""
    /// - "2.35-0ubuntu3.1" → epoch=0, upstream="2.35", revision="0ubuntu3.1"
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let (epoch, rest) = match raw.split_once(':') {
            Some((epoch, rest)) => {
                if epoch.is_empty() || !epoch.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                (epoch.parse::<u64>().ok()?, rest)
            }
            None => (0, raw),
        };

        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((upstream, revision)) => (upstream, revision),
            None => (rest, ""),
        };

        if !upstream.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            epoch,
            upstream: upstream.to_string(),
            revision: revision.to_string(),
        })
    }
}

impl fmt::Display for DebianVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        f.write_str(&self.upstream)?;
        if !self.revision.is_empty() {
            write!(f, "-{}", self.revision)?;
        }
        Ok(())
    }
}

// Equality follows dpkg ordering, so "1.0" == "1.00".
impl PartialEq for DebianVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DebianVersion {}

impl Ord for DebianVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_fragment(&self.upstream, &other.upstream))
            .then_with(|| compare_fragment(&self.revision, &other.revision))
    }
}

impl PartialOrd for DebianVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Weight of one non-digit byte; `None` is the end of the non-digit run.
fn char_weight(byte: Option<u8>) -> i32 {
    match byte {
        None => 0,
        Some(b'~') => -1,
        Some(b) if b.is_ascii_digit() => 0,
        Some(b) if b.is_ascii_alphabetic() => i32::from(b),
        Some(b) => i32::from(b) + 256,
    }
}

fn compare_fragment(left: &str, right: &str) -> Ordering {
    let mut left = left.as_bytes();
    let mut right = right.as_bytes();

    while !left.is_empty() || !right.is_empty() {
        let left_text = take_while(&mut left, |b| !b.is_ascii_digit());
        let right_text = take_while(&mut right, |b| !b.is_ascii_digit());

        let mut index = 0;
        while index < left_text.len() || index < right_text.len() {
            let left_weight = char_weight(left_text.get(index).copied());
            let right_weight = char_weight(right_text.get(index).copied());
            if left_weight != right_weight {
                return left_weight.cmp(&right_weight);
            }
            index += 1;
        }

        let left_digits = take_while(&mut left, |b| b.is_ascii_digit());
        let right_digits = take_while(&mut right, |b| b.is_ascii_digit());
        let ordering = compare_numeric(left_digits, right_digits);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

// Digit runs are compared without parsing so long runs cannot overflow.
fn compare_numeric(left: &[u8], right: &[u8]) -> Ordering {
    let left = strip_leading_zeros(left);
    let right = strip_leading_zeros(right);
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

fn strip_leading_zeros(digits: &[u8]) -> &[u8] {
    let start = digits
        .iter()
        .position(|b| *b != b'0')
        .unwrap_or(digits.len());
    &digits[start..]
}

fn take_while<'a>(input: &mut &'a [u8], predicate: impl Fn(u8) -> bool) -> &'a [u8] {
    let end = input
        .iter()
        .position(|b| !predicate(*b))
        .unwrap_or(input.len());
    let (head, tail) = input.split_at(end);
    *input = tail;
    head
}
