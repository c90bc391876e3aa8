use rstest::rstest;

use dependency_miner::ecosystem::Ecosystem;
use dependency_miner::version::{
    ArtifactReference, MultiRangeReference, RangeError, VersionConstraint, VersionNumber,
};

fn concrete(version: &str) -> VersionNumber {
    VersionNumber::concrete(version)
}

#[test]
fn leading_zeros_sort_below_plain_level() {
    assert!(concrete("1.003") < concrete("1.3"));
    assert!(concrete("1.3") > concrete("1.003"));
    assert_ne!(concrete("1.003"), concrete("1.3"));
}

#[test]
fn wildcard_bounds_are_incomparable_with_each_other() {
    let a = VersionNumber::reference("1.*");
    let b = VersionNumber::reference("1.x");

    assert_eq!(a.partial_cmp(&b), None);
    assert_eq!(a.total_cmp(&b), b.total_cmp(&a).reverse());
}

#[rstest]
#[case("1.5", true)]
#[case("2.0", false)]
#[case("1.0", true)]
#[case("0.9", false)]
fn nuget_half_open_interval_contains(#[case] version: &str, #[case] expected: bool) {
    let reference = ArtifactReference::nuget("Serilog", "[1.0,2.0)").unwrap();

    assert_eq!(reference.contains_version(&concrete(version)), expected);
}

#[rstest]
#[case("^1.2.3", "1.2.3", "2.0.0")]
#[case("~1.2.3", "1.2.3", "1.3.0")]
#[case("1.0.x", "1.0.0", "1.1.0")]
fn npm_ranges_expand_to_half_open_intervals(
    #[case] spec: &str,
    #[case] lower: &str,
    #[case] upper: &str,
) {
    let reference = ArtifactReference::npm("lodash", spec).unwrap();

    assert_eq!(reference.lower_bound(), Some(&concrete(lower)));
    assert!(!reference.is_lower_exclusive());
    assert_eq!(reference.upper_bound().map(ToString::to_string), Some(upper.to_string()));
    assert!(reference.is_upper_exclusive());
    assert!(reference.is_floating());
}

#[test]
fn nuget_multi_range_is_a_union() {
    let multi = MultiRangeReference::nuget("Foo", "(,1.0],[2.0,)").unwrap();

    assert_eq!(multi.sub_ranges().len(), 2);
    assert!(multi.contains_version(&concrete("0.5")));
    assert!(multi.contains_version(&concrete("3.0")));
    assert!(!multi.contains_version(&concrete("1.5")));
}

#[rstest]
#[case(Ecosystem::Npm, "react", "^18.2.0")]
#[case(Ecosystem::Npm, "chalk", ">=4.0.0 <5.0.0")]
#[case(Ecosystem::Npm, "left-pad", "1.x || 2.x")]
#[case(Ecosystem::Npm, "ms", "")]
#[case(Ecosystem::Nuget, "Newtonsoft.Json", "[13.0.1, )")]
#[case(Ecosystem::Nuget, "Foo", "[1.0],[2.0,3.0)")]
fn constraint_coordinate_is_library_and_raw_range(
    #[case] ecosystem: Ecosystem,
    #[case] library: &str,
    #[case] spec: &str,
) {
    let first = VersionConstraint::parse(ecosystem, library, spec).unwrap();
    let second = VersionConstraint::parse(ecosystem, library, spec).unwrap();

    assert_eq!(first.coordinate(), format!("{}:{}", library, spec));
    assert_eq!(first, second);
}

#[test]
fn npm_union_matches_either_major() {
    let constraint = VersionConstraint::parse(Ecosystem::Npm, "left-pad", "1.x || 3.x").unwrap();

    assert!(constraint.contains_version(&concrete("1.3.0")));
    assert!(constraint.contains_version(&concrete("3.0.1")));
    assert!(!constraint.contains_version(&concrete("2.0.0")));
}

#[rstest]
#[case(Ecosystem::Nuget, "[1.0,2.0", RangeError::SemiDelimited("[1.0,2.0".to_string()))]
#[case(Ecosystem::Nuget, "(1.0)", RangeError::ExactRequiresInclusive("(1.0)".to_string()))]
#[case(Ecosystem::Npm, "https://example.com/pkg.tgz", RangeError::WebResource("https://example.com/pkg.tgz".to_string()))]
fn malformed_ranges_are_rejected(
    #[case] ecosystem: Ecosystem,
    #[case] spec: &str,
    #[case] expected: RangeError,
) {
    assert_eq!(
        VersionConstraint::parse(ecosystem, "pkg", spec).unwrap_err(),
        expected
    );
}

#[test]
fn unknown_ecosystem_has_no_parser() {
    assert!(matches!(
        VersionConstraint::parse(Ecosystem::Unknown, "pkg", "1.0"),
        Err(RangeError::UnsupportedEcosystem { .. })
    ));
}
