//! Composite ranges and the per-ecosystem parser dispatch

use crate::ecosystem::Ecosystem;
use crate::version::error::RangeError;
use crate::version::number::VersionNumber;
use crate::version::reference::ArtifactReference;

/// Union of sub-ranges parsed from one composite range string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiRangeReference {
    library: String,
    descriptor: String,
    sub_ranges: Vec<ArtifactReference>,
}

impl MultiRangeReference {
    /// Parse a comma separated list of NuGet ranges, e.g. `(,1.0],[1.5],[2.0,)`
    pub fn nuget(library: &str, spec: &str) -> Result<Self, RangeError> {
        let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
        let odd = parts.len() % 2 != 0;

        let mut sub_ranges = Vec::new();
        let mut index = 0;
        while index < parts.len() {
            let part = parts[index];
            if is_exact_nuget(part) || (odd && part.is_empty()) {
                sub_ranges.push(ArtifactReference::nuget(library, part)?);
                index += 1;
                continue;
            }

            let Some(upper) = parts.get(index + 1) else {
                return Err(RangeError::UnpairedBound(spec.to_string()));
            };
            sub_ranges.push(ArtifactReference::nuget(
                library,
                &format!("{},{}", part, upper),
            )?);
            index += 2;
        }

        Ok(Self::from_parts(library, spec, sub_ranges))
    }

    /// Parse a comma separated list of comparator sets, e.g. `<1.2.3, >=2.0.0 <2.1.4`
    pub fn snyk_npm(library: &str, spec: &str) -> Result<Self, RangeError> {
        let sub_ranges = spec
            .split(',')
            .map(|part| ArtifactReference::snyk_npm(library, part.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_parts(library, spec, sub_ranges))
    }

    /// Parse an npm `||` union, e.g. `^1.0.0 || ^2.0.0`
    pub fn npm_union(library: &str, spec: &str) -> Result<Self, RangeError> {
        let sub_ranges = spec
            .split("||")
            .map(|part| parse_npm(library, part.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_parts(library, spec, sub_ranges))
    }

    fn from_parts(library: &str, spec: &str, sub_ranges: Vec<ArtifactReference>) -> Self {
        Self {
            library: library.to_string(),
            descriptor: spec.to_string(),
            sub_ranges,
        }
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn sub_ranges(&self) -> &[ArtifactReference] {
        &self.sub_ranges
    }

    pub fn is_floating(&self) -> bool {
        self.sub_ranges.iter().any(ArtifactReference::is_floating)
    }

    pub fn contains_version(&self, version: &VersionNumber) -> bool {
        self.sub_ranges.iter().any(|range| range.contains_version(version))
    }
}

fn is_exact_nuget(part: &str) -> bool {
    part.len() >= 2 && part.starts_with('[') && part.ends_with(']')
}

/// Any npm range form that is not a `||` union
fn parse_npm(library: &str, spec: &str) -> Result<ArtifactReference, RangeError> {
    if spec.is_empty() {
        return ArtifactReference::npm(library, "*").map(|reference| ArtifactReference {
            descriptor: spec.to_string(),
            ..reference
        });
    }

    if spec.starts_with(['<', '>', '=']) {
        ArtifactReference::snyk_npm(library, spec)
    } else {
        ArtifactReference::npm(library, spec)
    }
}

/// A dependency range in whichever shape its ecosystem declared it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    Single(ArtifactReference),
    Multi(MultiRangeReference),
}

impl VersionConstraint {
    /// Pick the parser that understands `spec` for `ecosystem`
    pub fn parse(ecosystem: Ecosystem, library: &str, spec: &str) -> Result<Self, RangeError> {
        match ecosystem {
            Ecosystem::Nuget => {
                let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
                if parts.len() > 2 || (parts.len() == 2 && parts.iter().any(|p| is_exact_nuget(p)))
                {
                    MultiRangeReference::nuget(library, spec).map(Self::Multi)
                } else {
                    ArtifactReference::nuget(library, spec).map(Self::Single)
                }
            }
            Ecosystem::Npm => {
                let trimmed = spec.trim();
                if trimmed.contains("||") {
                    MultiRangeReference::npm_union(library, spec).map(Self::Multi)
                } else {
                    parse_npm(library, trimmed).map(|reference| {
                        Self::Single(ArtifactReference {
                            descriptor: spec.to_string(),
                            ..reference
                        })
                    })
                }
            }
            Ecosystem::Unknown => Err(RangeError::UnsupportedEcosystem {
                ecosystem,
                spec: spec.to_string(),
            }),
        }
    }

    pub fn library(&self) -> &str {
        match self {
            Self::Single(reference) => reference.library(),
            Self::Multi(multi) => multi.library(),
        }
    }

    pub fn descriptor(&self) -> &str {
        match self {
            Self::Single(reference) => reference.descriptor(),
            Self::Multi(multi) => multi.descriptor(),
        }
    }

    /// Graph key of the constraint: `{library}:{descriptor}`
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.library(), self.descriptor())
    }

    pub fn is_floating(&self) -> bool {
        match self {
            Self::Single(reference) => reference.is_floating(),
            Self::Multi(multi) => multi.is_floating(),
        }
    }

    pub fn contains_version(&self, version: &VersionNumber) -> bool {
        match self {
            Self::Single(reference) => reference.contains_version(version),
            Self::Multi(multi) => multi.contains_version(version),
        }
    }
}

impl From<ArtifactReference> for VersionConstraint {
    fn from(reference: ArtifactReference) -> Self {
        Self::Single(reference)
    }
}

impl From<MultiRangeReference> for VersionConstraint {
    fn from(multi: MultiRangeReference) -> Self {
        Self::Multi(multi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn version(v: &str) -> VersionNumber {
        VersionNumber::concrete(v)
    }

    #[test]
    fn nuget_multi_range_pairs_open_bounds() {
        let multi = MultiRangeReference::nuget("Lib", "(,1.0],[2.0,)").unwrap();

        assert_eq!(multi.sub_ranges().len(), 2);
        assert!(multi.is_floating());
        assert!(multi.contains_version(&version("0.5")));
        assert!(multi.contains_version(&version("3.0")));
        assert!(!multi.contains_version(&version("1.5")));
    }

    #[test]
    fn nuget_multi_range_consumes_exact_refs_alone() {
        let multi = MultiRangeReference::nuget("Lib", "(,1.0],[1.5],[2.0,)").unwrap();

        assert_eq!(multi.sub_ranges().len(), 3);
        assert_eq!(multi.sub_ranges()[1].descriptor(), "[1.5]");
        assert!(multi.contains_version(&version("1.5")));
        assert!(!multi.contains_version(&version("1.6")));
    }

    #[test]
    fn nuget_multi_range_of_exact_refs_is_not_floating() {
        let multi = MultiRangeReference::nuget("Lib", "[1.0],[2.0]").unwrap();

        assert_eq!(multi.sub_ranges().len(), 2);
        assert!(!multi.is_floating());
        assert!(multi.contains_version(&version("2.0")));
    }

    #[test]
    fn nuget_multi_range_without_partner_is_rejected() {
        assert_eq!(
            MultiRangeReference::nuget("Lib", "[1.0,2.0),(3.0"),
            Err(RangeError::UnpairedBound("[1.0,2.0),(3.0".to_string()))
        );
    }

    #[test]
    fn nuget_multi_range_propagates_sub_range_errors() {
        assert_eq!(
            MultiRangeReference::nuget("Lib", "[1.0],(2.0,3.0"),
            Err(RangeError::SemiDelimited("(2.0,3.0".to_string()))
        );
    }

    #[test]
    fn snyk_multi_range_is_union_of_comparator_sets() {
        let multi = MultiRangeReference::snyk_npm("pkg", "<1.2.3, >=2.0.0 <2.1.4").unwrap();

        assert_eq!(multi.sub_ranges().len(), 2);
        assert!(multi.contains_version(&version("1.0.0")));
        assert!(multi.contains_version(&version("2.1.0")));
        assert!(!multi.contains_version(&version("1.5.0")));
        assert!(!multi.contains_version(&version("2.1.4")));
    }

    #[test]
    fn npm_union_matches_either_side() {
        let multi = MultiRangeReference::npm_union("pkg", "^1.0.0 || ^3.0.0").unwrap();

        assert!(multi.contains_version(&version("1.4.0")));
        assert!(multi.contains_version(&version("3.2.1")));
        assert!(!multi.contains_version(&version("2.0.0")));
    }

    #[rstest]
    #[case(Ecosystem::Nuget, "1.0", false)]
    #[case(Ecosystem::Nuget, "[1.0,2.0)", false)]
    #[case(Ecosystem::Nuget, "(,1.0],[2.0,)", true)]
    #[case(Ecosystem::Nuget, "[1.0],[2.0]", true)]
    #[case(Ecosystem::Npm, "^1.0.0", false)]
    #[case(Ecosystem::Npm, ">=1.0.0 <2.0.0", false)]
    #[case(Ecosystem::Npm, "1.x || >=2.5.0", true)]
    fn parse_dispatches_by_shape(
        #[case] ecosystem: Ecosystem,
        #[case] spec: &str,
        #[case] multi: bool,
    ) {
        let constraint = VersionConstraint::parse(ecosystem, "Lib", spec).unwrap();

        assert_eq!(matches!(constraint, VersionConstraint::Multi(_)), multi);
        assert_eq!(constraint.descriptor(), spec);
        assert_eq!(constraint.coordinate(), format!("Lib:{}", spec));
    }

    #[test]
    fn parse_empty_npm_spec_is_unconstrained() {
        let constraint = VersionConstraint::parse(Ecosystem::Npm, "pkg", "").unwrap();

        assert!(constraint.is_floating());
        assert!(constraint.contains_version(&version("0.0.1")));
        assert_eq!(constraint.coordinate(), "pkg:");
    }

    #[test]
    fn parse_npm_comparator_list_uses_comparator_parser() {
        let constraint = VersionConstraint::parse(Ecosystem::Npm, "pkg", ">=1.0.0 <2.0.0").unwrap();

        assert!(constraint.contains_version(&version("1.9.9")));
        assert!(!constraint.contains_version(&version("2.0.0")));
    }

    #[test]
    fn parse_unknown_ecosystem_is_rejected() {
        assert_eq!(
            VersionConstraint::parse(Ecosystem::Unknown, "pkg", "1.0"),
            Err(RangeError::UnsupportedEcosystem {
                ecosystem: Ecosystem::Unknown,
                spec: "1.0".to_string(),
            })
        );
    }

    #[test]
    fn parse_keeps_web_resource_error() {
        assert!(matches!(
            VersionConstraint::parse(Ecosystem::Npm, "pkg", "git://github.com/a/b.git"),
            Err(RangeError::WebResource(_))
        ));
    }
}
