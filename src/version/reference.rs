//! Single version range over [`VersionNumber`]
//!
//! Construction lives next to the ecosystem syntax it understands:
//! [`ArtifactReference::nuget`] in `nuget.rs`, [`ArtifactReference::npm`] and
//! [`ArtifactReference::snyk_npm`] in `npm.rs`.

use std::fmt;

use crate::ecosystem::Ecosystem;
use crate::version::number::VersionNumber;

/// A parsed dependency range declaration
///
/// Both bounds absent means every version matches. The value is never
/// mutated once a parser has returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    pub(super) ecosystem: Ecosystem,
    pub(super) library: String,
    pub(super) lower: Option<VersionNumber>,
    pub(super) lower_exclusive: bool,
    pub(super) upper: Option<VersionNumber>,
    pub(super) upper_exclusive: bool,
    pub(super) floating: bool,
    pub(super) descriptor: String,
}

impl ArtifactReference {
    pub(super) fn new(ecosystem: Ecosystem, library: &str, descriptor: &str) -> Self {
        Self {
            ecosystem,
            library: library.to_string(),
            lower: None,
            lower_exclusive: false,
            upper: None,
            upper_exclusive: false,
            floating: false,
            descriptor: descriptor.to_string(),
        }
    }

    /// A floating reference without bounds, matching every version
    pub(super) fn unbounded(ecosystem: Ecosystem, library: &str, descriptor: &str) -> Self {
        Self {
            lower_exclusive: true,
            upper_exclusive: true,
            floating: true,
            ..Self::new(ecosystem, library, descriptor)
        }
    }

    /// A pinned reference matching exactly `version`
    pub(super) fn pinned(
        ecosystem: Ecosystem,
        library: &str,
        descriptor: &str,
        version: VersionNumber,
    ) -> Self {
        Self {
            lower: Some(version.clone()),
            upper: Some(version),
            ..Self::new(ecosystem, library, descriptor)
        }
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn lower_bound(&self) -> Option<&VersionNumber> {
        self.lower.as_ref()
    }

    pub fn is_lower_exclusive(&self) -> bool {
        self.lower_exclusive
    }

    pub fn upper_bound(&self) -> Option<&VersionNumber> {
        self.upper.as_ref()
    }

    pub fn is_upper_exclusive(&self) -> bool {
        self.upper_exclusive
    }

    /// True if the range can match more than one version
    pub fn is_floating(&self) -> bool {
        self.floating
    }

    /// The range string exactly as declared
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Graph key of the constraint: `{library}:{descriptor}`
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.library, self.descriptor)
    }

    pub fn contains_version(&self, version: &VersionNumber) -> bool {
        match (&self.lower, &self.upper) {
            (None, None) => true,
            (None, Some(upper)) => {
                if version == upper {
                    !self.upper_exclusive
                } else {
                    version < upper
                }
            }
            (Some(lower), None) => {
                if version == lower {
                    !self.lower_exclusive
                } else {
                    version > lower
                }
            }
            (Some(lower), Some(upper)) => {
                if version == lower {
                    !self.lower_exclusive
                } else if version > lower && version < upper {
                    true
                } else if version == upper {
                    !self.upper_exclusive
                } else {
                    false
                }
            }
        }
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |version: &Option<VersionNumber>| {
            version
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "none".to_string())
        };

        write!(
            f,
            "{} {}{}, {}{} ({})",
            self.library,
            if self.lower_exclusive { '(' } else { '[' },
            bound(&self.lower),
            bound(&self.upper),
            if self.upper_exclusive { ')' } else { ']' },
            self.descriptor
        )
    }
}
