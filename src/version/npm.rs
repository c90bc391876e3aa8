//! npm version range syntax
//!
//! [`ArtifactReference::npm`] reads the range forms that show up in package
//! manifests (`^1.2.3`, `~1.2.3`, `1.0.x`, `*`, exact pins).
//! [`ArtifactReference::snyk_npm`] reads comparator lists such as
//! `>= 1.0.0 < 2.0.0`, the form used by advisory databases.

use std::sync::LazyLock;

use regex::Regex;

use crate::ecosystem::Ecosystem;
use crate::version::error::RangeError;
use crate::version::number::{VersionLevel, VersionNumber};
use crate::version::reference::ArtifactReference;

/// Comparator followed by whitespace, e.g. `>= 1.0`
static SPACED_COMPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(<=|>=|<|>|=)\s+").expect("Invalid regex: SPACED_COMPARATOR")
});

/// Lower bound of a `^`/`~` operand together with the number of levels given
/// before the first wildcard. Wildcard levels become zero (`1.x` -> `1.0.0`);
/// `None` if the major level itself is a wildcard.
fn compatible_floor(version: &str) -> Option<(VersionNumber, usize)> {
    let given = VersionNumber::unpadded(version);
    let levels = given.levels();
    let fixed = levels
        .iter()
        .position(VersionLevel::is_wildcard)
        .unwrap_or(levels.len());

    if fixed == 0 {
        return None;
    }
    if fixed == levels.len() {
        return Some((VersionNumber::concrete(version), fixed));
    }

    let mut floor: Vec<&str> = levels[..fixed].iter().map(VersionLevel::as_str).collect();
    floor.resize(levels.len().max(3), "0");
    Some((VersionNumber::concrete(&floor.join(".")), fixed))
}

impl ArtifactReference {
    pub fn npm(library: &str, spec: &str) -> Result<Self, RangeError> {
        if spec.starts_with("git") || spec.starts_with("http") {
            return Err(RangeError::WebResource(spec.to_string()));
        }

        if let Some(version) = spec.strip_prefix('^') {
            let Some((lower, _)) = compatible_floor(version) else {
                return Ok(Self::unbounded(Ecosystem::Npm, library, spec));
            };
            let upper = VersionNumber::reference(&lower.next_major_version());
            return Ok(Self::compatible(library, spec, lower, upper));
        }

        if let Some(version) = spec.strip_prefix('~') {
            let Some((lower, fixed)) = compatible_floor(version) else {
                return Ok(Self::unbounded(Ecosystem::Npm, library, spec));
            };
            // `~1` and `~1.x` only pin the major version
            let upper = if fixed == 1 {
                lower.next_major_version()
            } else {
                lower.next_minor_version()
            };
            return Ok(Self::compatible(
                library,
                spec,
                lower,
                VersionNumber::reference(&upper),
            ));
        }

        let version = VersionNumber::reference(spec);

        if !version.has_wildcard() {
            return Ok(Self::pinned(Ecosystem::Npm, library, spec, version));
        }

        let levels = version.levels();
        let Some(wildcard_at) = levels.iter().position(|level| level.is_wildcard()) else {
            return Ok(Self::pinned(Ecosystem::Npm, library, spec, version));
        };

        if wildcard_at == 0 {
            return Ok(Self::unbounded(Ecosystem::Npm, library, spec));
        }

        let fixed: Vec<&str> = levels[..wildcard_at].iter().map(|l| l.as_str()).collect();
        let zeros = levels.len() - wildcard_at;

        let mut lower = fixed.clone();
        lower.extend(std::iter::repeat_n("0", zeros));

        let mut reference = Self::new(Ecosystem::Npm, library, spec);
        reference.lower = Some(VersionNumber::reference(&lower.join(".")));
        reference.floating = true;

        let before = &levels[wildcard_at - 1];
        match before.number() {
            Some(number) => {
                let bumped = number.saturating_add(1).to_string();
                let mut upper: Vec<&str> = fixed[..wildcard_at - 1].to_vec();
                upper.push(&bumped);
                upper.extend(std::iter::repeat_n("0", zeros));

                reference.upper = Some(VersionNumber::reference(&upper.join(".")));
                reference.upper_exclusive = true;
            }
            None => {
                // `1.beta.x` has no next version to bump to; keep the wildcard in the bound
                reference.upper = Some(VersionNumber::reference(&format!("{}.x", fixed.join("."))));
                reference.upper_exclusive = false;
            }
        }

        Ok(reference)
    }

    pub fn snyk_npm(library: &str, spec: &str) -> Result<Self, RangeError> {
        let mut reference = Self::new(Ecosystem::Npm, library, spec);
        reference.floating = true;

        if spec.trim() == "*" {
            reference.lower_exclusive = true;
            reference.upper_exclusive = true;
            return Ok(reference);
        }

        let collapsed = SPACED_COMPARATOR.replace_all(spec, "$1");

        for token in collapsed.split_whitespace() {
            let (operator, raw) = ["<=", ">=", "<", ">", "="]
                .into_iter()
                .find_map(|op| token.strip_prefix(op).map(|rest| (op, rest)))
                .unwrap_or(("", token));

            if raw.is_empty() {
                return Err(RangeError::MalformedBounds(spec.to_string()));
            }

            let version = VersionNumber::concrete(raw);
            match operator {
                "<=" | "<" => {
                    reference.upper = Some(version);
                    reference.upper_exclusive = operator == "<";
                }
                ">=" | ">" => {
                    reference.lower = Some(version);
                    reference.lower_exclusive = operator == ">";
                }
                _ => {
                    reference.lower = Some(version.clone());
                    reference.upper = Some(version);
                    reference.lower_exclusive = false;
                    reference.upper_exclusive = false;
                }
            }
        }

        Ok(reference)
    }

    fn compatible(library: &str, spec: &str, lower: VersionNumber, upper: VersionNumber) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
            upper_exclusive: true,
            floating: true,
            ..Self::new(Ecosystem::Npm, library, spec)
        }
    }
}
