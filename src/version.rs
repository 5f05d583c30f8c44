use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use winnow::ascii::{digit0, digit1};
use winnow::combinator::{alt, opt, preceded, repeat, separated};
use winnow::prelude::*;
use winnow::token::one_of;

use crate::error::{Error, Result};

/// Kind of a version suffix such as `_alpha` or `_p`.
///
/// Variants are declared in precedence order. A version without any
/// further suffix sorts between [`SuffixKind::Rc`] and [`SuffixKind::P`].
///
/// See [PMS 3.2](https://projects.gentoo.org/pms/latest/pms.html#version-specifications).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SuffixKind {
    /// `_alpha`
    Alpha,
    /// `_beta`
    Beta,
    /// `_pre`
    Pre,
    /// `_rc`
    Rc,
    /// `_p`
    P,
}

impl SuffixKind {
    fn as_str(self) -> &'static str {
        match self {
            SuffixKind::Alpha => "alpha",
            SuffixKind::Beta => "beta",
            SuffixKind::Pre => "pre",
            SuffixKind::Rc => "rc",
            SuffixKind::P => "p",
        }
    }
}

/// A single `_kind[number]` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suffix {
    /// Suffix kind.
    pub kind: SuffixKind,
    /// Digits following the kind, as written. Empty counts as zero.
    pub number: String,
}

/// A parsed, totally ordered package version.
///
/// Numeric components are kept as digit strings so arbitrarily long
/// components compare correctly. Two keys are equal when the PMS
/// comparison algorithm says so, which means `1.0` and `1.0-r0` are equal
/// even though they are spelled differently.
///
/// See [PMS 3.3](https://projects.gentoo.org/pms/latest/pms.html#version-comparison).
///
/// # Examples
///
/// ```
/// use portage_history::VersionKey;
///
/// let a: VersionKey = "1.0_rc3".parse().unwrap();
/// let b: VersionKey = "1.0".parse().unwrap();
/// let c: VersionKey = "1.0_p1".parse().unwrap();
/// assert!(a < b && b < c);
/// assert_eq!(b, "1.0-r0".parse().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct VersionKey {
    raw: String,
    numbers: Vec<String>,
    letter: Option<char>,
    suffixes: Vec<Suffix>,
    revision: Option<String>,
}

impl VersionKey {
    /// Parse a version string such as `1.2.3b_beta4_p5-r6`.
    pub fn parse(input: &str) -> Result<VersionKey> {
        parse_version
            .parse(input)
            .map(|(numbers, letter, suffixes, revision)| VersionKey {
                raw: input.to_string(),
                numbers,
                letter,
                suffixes,
                revision,
            })
            .map_err(|_| Error::InvalidVersion(input.to_string()))
    }

    /// The version as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Dot-separated numeric components, as written.
    pub fn numbers(&self) -> &[String] {
        &self.numbers
    }

    /// Optional trailing letter of the numeric part.
    pub fn letter(&self) -> Option<char> {
        self.letter
    }

    /// Suffixes in order of appearance.
    pub fn suffixes(&self) -> &[Suffix] {
        &self.suffixes
    }

    /// Revision digits, `"0"` when no `-rN` is present.
    pub fn revision(&self) -> &str {
        self.revision.as_deref().unwrap_or("0")
    }

    /// The version text without its `-rN` part.
    ///
    /// ```
    /// use portage_history::VersionKey;
    ///
    /// let v = VersionKey::parse("2.4_p1-r3").unwrap();
    /// assert_eq!(v.without_revision(), "2.4_p1");
    /// ```
    pub fn without_revision(&self) -> &str {
        match &self.revision {
            Some(rev) => &self.raw[..self.raw.len() - rev.len() - 2],
            None => &self.raw,
        }
    }
}

impl FromStr for VersionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        VersionKey::parse(s)
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "_{}{}", self.kind.as_str(), self.number)
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_numbers(&self.numbers, &other.numbers)
            .then_with(|| self.letter.cmp(&other.letter))
            .then_with(|| compare_suffixes(&self.suffixes, &other.suffixes))
            .then_with(|| compare_integers(self.revision(), other.revision()))
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionKey {}

/// Compare two version strings using PMS ordering.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
///
/// assert_eq!(portage_history::compare("1.0-r1", "1.0").unwrap(), Ordering::Greater);
/// assert!(portage_history::compare("foo", "1.0").is_err());
/// ```
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(VersionKey::parse(a)?.cmp(&VersionKey::parse(b)?))
}

/// Compare digit strings as unbounded non-negative integers.
fn compare_integers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// The first component is always an integer. Later components with a
/// leading zero compare as decimal fractions: trailing zeros are dropped
/// and the rest compares stringwise.
fn compare_numbers(a: &[String], b: &[String]) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let ord = if i > 0 && (x.starts_with('0') || y.starts_with('0')) {
            x.trim_end_matches('0').cmp(y.trim_end_matches('0'))
        } else {
            compare_integers(x, y)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn compare_suffixes(a: &[Suffix], b: &[Suffix]) -> Ordering {
    let mut i = 0;
    loop {
        let ord = match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) => x
                .kind
                .cmp(&y.kind)
                .then_with(|| compare_integers(&x.number, &y.number)),
            (Some(x), None) if x.kind == SuffixKind::P => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, Some(y)) if y.kind == SuffixKind::P => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => return Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
        i += 1;
    }
}

// Winnow parsers

type Parts = (Vec<String>, Option<char>, Vec<Suffix>, Option<String>);

fn parse_numbers(input: &mut &str) -> ModalResult<Vec<String>> {
    separated(1.., digit1.map(|s: &str| s.to_string()), '.').parse_next(input)
}

fn parse_suffix(input: &mut &str) -> ModalResult<Suffix> {
    let kind = preceded(
        '_',
        alt((
            "alpha".value(SuffixKind::Alpha),
            "beta".value(SuffixKind::Beta),
            "pre".value(SuffixKind::Pre),
            "rc".value(SuffixKind::Rc),
            "p".value(SuffixKind::P),
        )),
    )
    .parse_next(input)?;
    let number: &str = digit0.parse_next(input)?;
    Ok(Suffix {
        kind,
        number: number.to_string(),
    })
}

fn parse_version(input: &mut &str) -> ModalResult<Parts> {
    let numbers = parse_numbers(input)?;
    let letter = opt(one_of('a'..='z')).parse_next(input)?;
    let suffixes: Vec<Suffix> = repeat(0.., parse_suffix).parse_next(input)?;
    let revision = opt(preceded("-r", digit1))
        .map(|r: Option<&str>| r.map(|s| s.to_string()))
        .parse_next(input)?;
    Ok((numbers, letter, suffixes, revision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("6.0", "5.0", Ordering::Greater)]
    #[case("5.0", "5", Ordering::Greater)]
    #[case("1.0-r1", "1.0-r0", Ordering::Greater)]
    #[case("1.0-r1", "1.0", Ordering::Greater)]
    #[case(
        "999999999999999999999999999999",
        "999999999999999999999999999998",
        Ordering::Greater
    )]
    #[case("1.0.0", "1.0", Ordering::Greater)]
    #[case("1.0.0", "1.0b", Ordering::Greater)]
    #[case("1b", "1", Ordering::Greater)]
    #[case("1b_p1", "1_p1", Ordering::Greater)]
    #[case("1.1b", "1.1", Ordering::Greater)]
    #[case("12.2.5", "12.2b", Ordering::Greater)]
    #[case("4.0", "4.0", Ordering::Equal)]
    #[case("1.0-r0", "1.0", Ordering::Equal)]
    #[case("1.0", "1.0-r0", Ordering::Equal)]
    #[case("1.0-r1", "1.0-r01", Ordering::Equal)]
    #[case("01", "1", Ordering::Equal)]
    #[case("1.0", "1.00", Ordering::Equal)]
    #[case("4.0", "5.0", Ordering::Less)]
    #[case("1.0_pre2", "1.0_p2", Ordering::Less)]
    #[case("1.0_alpha2", "1.0_p2", Ordering::Less)]
    #[case("1.0_alpha1", "1.0_beta1", Ordering::Less)]
    #[case("1.0_beta3", "1.0_rc3", Ordering::Less)]
    #[case("1.001000000000000000001", "1.001000000000000000002", Ordering::Less)]
    #[case("1.00100000000", "1.0010000000000000001", Ordering::Less)]
    #[case("1.01", "1.1", Ordering::Less)]
    #[case("1.0", "1.0-r1", Ordering::Less)]
    #[case("1.0", "1.0.0", Ordering::Less)]
    #[case("1.0b", "1.0.0", Ordering::Less)]
    #[case("1", "1b", Ordering::Less)]
    #[case("12.2b", "12.2.5", Ordering::Less)]
    fn ordering(#[case] left: &str, #[case] right: &str, #[case] expected: Ordering) {
        assert_eq!(compare(left, right).unwrap(), expected);
        assert_eq!(compare(right, left).unwrap(), expected.reverse());
    }

    #[rstest]
    #[case("1.0_rc1", "1.0")]
    #[case("1.0", "1.0_p1")]
    #[case("1.0_rc1", "1.0_rc1_p1")]
    #[case("1.0_alpha", "1.0_alpha1")]
    #[case("1.0_p1_alpha", "1.0_p1")]
    fn bare_version_sits_between_rc_and_p(#[case] lower: &str, #[case] higher: &str) {
        assert_eq!(compare(lower, higher).unwrap(), Ordering::Less);
    }

    #[test]
    fn missing_suffix_number_is_zero() {
        assert_eq!(compare("1.0_beta", "1.0_beta0").unwrap(), Ordering::Equal);
    }

    #[test]
    fn sort_is_total() {
        let mut versions: Vec<VersionKey> = [
            "1.0_p1", "1.0", "1.0_rc1", "0.9", "1.0-r2", "1.0a", "1.0_alpha", "1.0.1", "1.0_beta2",
        ]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
        versions.sort();
        let sorted: Vec<&str> = versions.iter().map(|v| v.as_str()).collect();
        assert_eq!(
            sorted,
            vec![
                "0.9", "1.0_alpha", "1.0_beta2", "1.0_rc1", "1.0", "1.0-r2", "1.0_p1", "1.0a",
                "1.0.1"
            ]
        );
    }

    #[test]
    fn parse_parts() {
        let v = VersionKey::parse("10.3.18a_beta4_p5-r6").unwrap();
        assert_eq!(v.numbers(), ["10", "3", "18"]);
        assert_eq!(v.letter(), Some('a'));
        assert_eq!(v.suffixes().len(), 2);
        assert_eq!(v.suffixes()[0].kind, SuffixKind::Beta);
        assert_eq!(v.suffixes()[1].to_string(), "_p5");
        assert_eq!(v.revision(), "6");
        assert_eq!(v.without_revision(), "10.3.18a_beta4_p5");
        assert_eq!(v.to_string(), "10.3.18a_beta4_p5-r6");
    }

    #[test]
    fn default_revision() {
        let v = VersionKey::parse("1.0").unwrap();
        assert_eq!(v.revision(), "0");
        assert_eq!(v.without_revision(), "1.0");
    }

    #[rstest]
    #[case("")]
    #[case("foo")]
    #[case("a1.0")]
    #[case("1.0-foo")]
    #[case("1.0_gamma1")]
    #[case("1..0")]
    #[case("1.0-r")]
    #[case("1.0AB")]
    fn invalid(#[case] input: &str) {
        assert_eq!(
            VersionKey::parse(input).unwrap_err(),
            Error::InvalidVersion(input.to_string())
        );
    }
}
