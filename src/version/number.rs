//! Dotted version numbers with the ordering used for range membership
//!
//! A version string is split on `.` into [`VersionLevel`]s. Levels compare
//! numerically when both are numeric, lexicographically when both are plain
//! strings, and a wildcard level (`x` or `*`) is greater than any concrete level.
//!
//! Two wildcard levels at the same position have no order. [`VersionNumber`]
//! therefore only implements [`PartialOrd`]: `partial_cmp` returns `None` for
//! such pairs, and both `<` and `>` are false. Sorting real release strings
//! goes through [`VersionNumber::total_cmp`] instead.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// How missing levels are filled when parsing a version string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Fill up to three levels with wildcards (`1.2` -> `1.2.x`)
    Reference,
    /// Fill up to three levels with zeros (`1.2` -> `1.2.0`)
    Concrete,
    /// Keep exactly the levels that were given
    Disabled,
}

/// One dot-separated token of a version string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionLevel {
    raw: String,
    numeric: bool,
    number: Option<u128>,
    postfix: Option<String>,
    separator: Option<char>,
    wildcard: bool,
}

impl VersionLevel {
    pub fn parse(raw: &str) -> Self {
        let split = raw
            .split_once('-')
            .map(|(qualifier, postfix)| (qualifier, postfix, '-'))
            .or_else(|| {
                raw.split_once('+')
                    .map(|(qualifier, postfix)| (qualifier, postfix, '+'))
            });

        let (qualifier, postfix, separator) = match split {
            Some((qualifier, postfix, separator)) => {
                (qualifier, Some(postfix.to_string()), Some(separator))
            }
            None => (raw, None, None),
        };

        let numeric = !qualifier.is_empty() && qualifier.bytes().all(|b| b.is_ascii_digit());

        Self {
            raw: raw.to_string(),
            numeric,
            number: if numeric { qualifier.parse().ok() } else { None },
            postfix,
            separator,
            wildcard: !numeric && (qualifier == "*" || qualifier == "x"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric value, `None` for string levels and for digit runs too long for `u128`
    pub fn number(&self) -> Option<u128> {
        self.number
    }

    /// Digits of a numeric level without leading zeros. Comparing these by
    /// length, then text, orders numbers of any size.
    fn significant_digits(&self) -> Option<&str> {
        if !self.numeric {
            return None;
        }
        let digits = self.raw.split(['-', '+']).next().unwrap_or_default();
        Some(digits.trim_start_matches('0'))
    }

    /// Text after the first `-` or `+` separator
    pub fn postfix(&self) -> Option<&str> {
        self.postfix.as_deref()
    }

    pub fn separator(&self) -> Option<char> {
        self.separator
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Order between two non-wildcard levels. Always decides.
    fn cmp_concrete(&self, other: &Self) -> Ordering {
        match (self.significant_digits(), other.significant_digits()) {
            (None, None) => self.raw.cmp(&other.raw),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a
                .len()
                .cmp(&b.len())
                .then_with(|| a.cmp(b))
                .then_with(|| self.cmp_same_number(other)),
        }
    }

    /// Tie-break for numerically equal levels with different text
    fn cmp_same_number(&self, other: &Self) -> Ordering {
        match (&self.postfix, &other.postfix) {
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            // NuGet legacy: "003" sorts below "3", the longer token is the smaller one.
            (None, None) => other.raw.len().cmp(&self.raw.len()),
            (Some(a), Some(b)) => a.cmp(b),
        }
        .then_with(|| self.raw.cmp(&other.raw))
    }

    /// Like `partial_cmp`, but all wildcards form one equivalence class.
    fn total_cmp(&self, other: &Self) -> Ordering {
        match (self.wildcard, other.wildcard) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.cmp_concrete(other),
        }
    }
}

impl PartialOrd for VersionLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }

        match (self.wildcard, other.wildcard) {
            (true, true) => None,
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (false, false) => Some(self.cmp_concrete(other)),
        }
    }
}

impl fmt::Display for VersionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A parsed version string as an ordered sequence of levels
///
/// Equality is structural over the levels: `1.0` parsed with
/// [`Padding::Concrete`] equals `1.0.0`.
#[derive(Debug, Clone)]
pub struct VersionNumber {
    original: String,
    levels: Vec<VersionLevel>,
}

impl VersionNumber {
    pub fn parse(version: &str, padding: Padding) -> Self {
        let mut levels: Vec<VersionLevel> = version.split('.').map(VersionLevel::parse).collect();

        let fill = match padding {
            Padding::Reference => Some("x"),
            Padding::Concrete => Some("0"),
            Padding::Disabled => None,
        };

        if let Some(fill) = fill {
            while levels.len() < 3 {
                levels.push(VersionLevel::parse(fill));
            }
        }

        Self {
            original: version.to_string(),
            levels,
        }
    }

    /// Parse a range bound, padding missing levels with wildcards
    pub fn reference(version: &str) -> Self {
        Self::parse(version, Padding::Reference)
    }

    /// Parse a concrete version, padding missing levels with zeros
    pub fn concrete(version: &str) -> Self {
        Self::parse(version, Padding::Concrete)
    }

    /// Parse a release string exactly as given, e.g. four-level versions
    pub fn unpadded(version: &str) -> Self {
        Self::parse(version, Padding::Disabled)
    }

    /// The string this version was parsed from
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn levels(&self) -> &[VersionLevel] {
        &self.levels
    }

    pub fn has_wildcard(&self) -> bool {
        self.levels.iter().any(VersionLevel::is_wildcard)
    }

    /// Descriptor one minor version above this one (`1.2.3` -> `1.3.0`)
    pub fn next_minor_version(&self) -> String {
        let major = self.levels.first().map(VersionLevel::as_str).unwrap_or("0");

        match self.levels.get(1).and_then(VersionLevel::number) {
            Some(minor) => format!("{}.{}.0", major, minor.saturating_add(1)),
            None => format!("{}.x.0", major),
        }
    }

    /// Descriptor one major version above this one (`1.2.3` -> `2.0.0`),
    /// or `*` when the major level is not a number
    pub fn next_major_version(&self) -> String {
        match self.levels.first().and_then(VersionLevel::number) {
            Some(major) => format!("{}.0.0", major.saturating_add(1)),
            None => "*".to_string(),
        }
    }

    /// Total order for sorting release strings
    ///
    /// Agrees with `partial_cmp` wherever that decides; wildcard pairs tie and
    /// any remaining tie falls back to the level text.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.levels
            .iter()
            .zip(&other.levels)
            .map(|(a, b)| a.total_cmp(b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or_else(|| self.levels.len().cmp(&other.levels.len()))
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }
}

impl PartialEq for VersionNumber {
    fn eq(&self, other: &Self) -> bool {
        self.levels == other.levels
    }
}

impl Eq for VersionNumber {}

impl Hash for VersionNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.levels.hash(state);
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let mut incomparable = false;

        for (a, b) in self.levels.iter().zip(&other.levels) {
            match a.partial_cmp(b) {
                Some(Ordering::Equal) => {}
                Some(ord) => return Some(ord),
                None => incomparable = true,
            }
        }

        let shared = self.levels.len().min(other.levels.len());
        match self.levels.len().cmp(&other.levels.len()) {
            Ordering::Equal if incomparable => None,
            Ordering::Equal => Some(Ordering::Equal),
            Ordering::Less if other.levels[shared].is_wildcard() => None,
            Ordering::Less => Some(Ordering::Less),
            Ordering::Greater if self.levels[shared].is_wildcard() => None,
            Ordering::Greater => Some(Ordering::Greater),
        }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels: Vec<&str> = self.levels.iter().map(VersionLevel::as_str).collect();
        f.write_str(&levels.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("3", Some(3), None, None, false)]
    #[case("003", Some(3), None, None, false)]
    #[case("0-beta", Some(0), Some("beta"), Some('-'), false)]
    #[case("4-rc-2", Some(4), Some("rc-2"), Some('-'), false)]
    #[case("7+build", Some(7), Some("build"), Some('+'), false)]
    #[case("x", None, None, None, true)]
    #[case("*", None, None, None, true)]
    #[case("X", None, None, None, false)]
    #[case("final", None, None, None, false)]
    #[case("", None, None, None, false)]
    #[case("1234567890123456789012345", Some(1234567890123456789012345), None, None, false)]
    fn version_level_parse_extracts_parts(
        #[case] raw: &str,
        #[case] number: Option<u128>,
        #[case] postfix: Option<&str>,
        #[case] separator: Option<char>,
        #[case] wildcard: bool,
    ) {
        let level = VersionLevel::parse(raw);

        assert_eq!(level.as_str(), raw);
        assert_eq!(level.number(), number);
        assert_eq!(level.postfix(), postfix);
        assert_eq!(level.separator(), separator);
        assert_eq!(level.is_wildcard(), wildcard);
    }

    #[rstest]
    #[case("1", Padding::Reference, "1.x.x")]
    #[case("1.2", Padding::Reference, "1.2.x")]
    #[case("1.2", Padding::Concrete, "1.2.0")]
    #[case("1.2", Padding::Disabled, "1.2")]
    #[case("1.2.3.4", Padding::Reference, "1.2.3.4")]
    #[case("1.2.3.4", Padding::Concrete, "1.2.3.4")]
    fn parse_pads_according_to_mode(
        #[case] version: &str,
        #[case] padding: Padding,
        #[case] expected: &str,
    ) {
        let parsed = VersionNumber::parse(version, padding);

        assert_eq!(parsed.to_string(), expected);
        assert_eq!(parsed.original(), version);
    }

    #[test]
    fn equality_is_structural_over_levels() {
        assert_eq!(VersionNumber::concrete("1.0"), VersionNumber::concrete("1.0.0"));
        assert_ne!(VersionNumber::concrete("1.0"), VersionNumber::unpadded("1.0"));
        assert_ne!(VersionNumber::concrete("1.3"), VersionNumber::concrete("1.003"));
    }

    #[rstest]
    // numeric levels
    #[case("1.2.3", "1.2.4", Some(Ordering::Less))]
    #[case("1.10.0", "1.9.0", Some(Ordering::Greater))]
    #[case("2.0.0", "2.0.0", Some(Ordering::Equal))]
    // wildcard level is greater than any concrete level
    #[case("1.0.3", "1.0.x", Some(Ordering::Less))]
    #[case("1.x", "1.999", Some(Ordering::Greater))]
    // string-only level is less than a numeric one
    #[case("1.final.0", "1.0.0", Some(Ordering::Less))]
    #[case("1.alpha.0", "1.beta.0", Some(Ordering::Less))]
    // prerelease postfix sorts below the plain number
    #[case("1.0.0-beta", "1.0.0", Some(Ordering::Less))]
    #[case("1.0.0-alpha", "1.0.0-beta", Some(Ordering::Less))]
    #[case("1.0.0+build", "1.0.0", Some(Ordering::Less))]
    // more leading zeros sorts lower
    #[case("1.003", "1.3", Some(Ordering::Less))]
    #[case("1.3", "1.003", Some(Ordering::Greater))]
    // digit runs beyond u64 still compare as numbers
    #[case("1.2.20240101000000000000000001", "1.2.20240101000000000000000000", Some(Ordering::Greater))]
    #[case("1.99999999999999999999999", "1.100000000000000000000000", Some(Ordering::Less))]
    #[case("1.beta", "1.100000000000000000000000000000000000000000", Some(Ordering::Less))]
    #[case("1.0000000000000000000000000000000000000000003", "1.3", Some(Ordering::Less))]
    // longer version is greater unless the extra level is a wildcard
    #[case("1.2.3", "1.2.3.4", Some(Ordering::Less))]
    #[case("1.2.3.1", "1.2.3", Some(Ordering::Greater))]
    fn partial_cmp_orders_unpadded_versions(
        #[case] a: &str,
        #[case] b: &str,
        #[case] expected: Option<Ordering>,
    ) {
        let a = VersionNumber::unpadded(a);
        let b = VersionNumber::unpadded(b);

        assert_eq!(a.partial_cmp(&b), expected);
    }

    #[rstest]
    #[case("1.x", "1.*")]
    #[case("1.x.x", "1.*.*")]
    #[case("1.2", "1.2.x")]
    fn partial_cmp_is_incomparable_for_wildcard_pairs(#[case] a: &str, #[case] b: &str) {
        let a = VersionNumber::unpadded(a);
        let b = VersionNumber::unpadded(b);

        assert_eq!(a.partial_cmp(&b), None);
        assert!(!a.lt(&b));
        assert!(!a.gt(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn partial_cmp_continues_past_shared_wildcard_level() {
        let a = VersionNumber::unpadded("1.x.3");
        let b = VersionNumber::unpadded("1.*.5");

        assert!(a < b);
    }

    #[test]
    fn identical_reference_versions_compare_equal() {
        let a = VersionNumber::reference("1.2");
        let b = VersionNumber::reference("1.2.x");

        assert_eq!(a.partial_cmp(&b), Some(Ordering::Equal));
    }

    #[rstest]
    #[case("1.2.3", "1.3.0")]
    #[case("1.x", "1.x.0")]
    #[case("1", "1.x.0")]
    #[case("0.9.1", "0.10.0")]
    fn next_minor_version_returns_descriptor(#[case] version: &str, #[case] expected: &str) {
        assert_eq!(VersionNumber::reference(version).next_minor_version(), expected);
    }

    #[rstest]
    #[case("1.2.3", "2.0.0")]
    #[case("0.1", "1.0.0")]
    #[case("x", "*")]
    #[case("*.1", "*")]
    #[case("latest", "*")]
    fn next_major_version_returns_descriptor(#[case] version: &str, #[case] expected: &str) {
        assert_eq!(VersionNumber::reference(version).next_major_version(), expected);
    }

    #[test]
    fn has_wildcard_detects_padding_and_explicit_wildcards() {
        assert!(VersionNumber::reference("1.2").has_wildcard());
        assert!(VersionNumber::concrete("1.*").has_wildcard());
        assert!(!VersionNumber::concrete("1.2").has_wildcard());
    }

    #[test]
    fn total_cmp_sorts_release_strings_of_any_length() {
        let mut versions: Vec<VersionNumber> = ["2.0", "1.0.0.1", "1.0", "1.0-rc1", "1.0.0", "10.0", "1.5"]
            .iter()
            .map(|v| VersionNumber::unpadded(v))
            .collect();

        versions.sort_by(VersionNumber::total_cmp);

        let sorted: Vec<&str> = versions.iter().map(VersionNumber::original).collect();
        assert_eq!(
            sorted,
            vec!["1.0-rc1", "1.0", "1.0.0", "1.0.0.1", "1.5", "2.0", "10.0"]
        );
    }

    #[test]
    fn total_cmp_breaks_wildcard_ties_by_text() {
        let a = VersionNumber::unpadded("1.*");
        let b = VersionNumber::unpadded("1.x");

        assert_eq!(a.total_cmp(&b), Ordering::Less);
        assert_eq!(b.total_cmp(&a), Ordering::Greater);
        assert_eq!(a.total_cmp(&a.clone()), Ordering::Equal);
    }
}
