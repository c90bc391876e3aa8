//! NuGet version range syntax
//!
//! - `1.0` - minimum version, inclusive (`1.0 <= x`)
//! - `[1.0]` - exact version
//! - `(1.0,)`, `[1.0,2.0)`, `(,1.0]` - interval notation
//! - empty string - any version (allowed by old nuspec files)

use crate::ecosystem::Ecosystem;
use crate::version::error::RangeError;
use crate::version::number::VersionNumber;
use crate::version::reference::ArtifactReference;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    None,
    Inclusive,
    Exclusive,
}

impl ArtifactReference {
    pub fn nuget(library: &str, spec: &str) -> Result<Self, RangeError> {
        if spec.is_empty() {
            return Ok(Self::unbounded(Ecosystem::Nuget, library, spec));
        }

        let (left, rest) = if let Some(rest) = spec.strip_prefix('(') {
            (Delimiter::Exclusive, rest)
        } else if let Some(rest) = spec.strip_prefix('[') {
            (Delimiter::Inclusive, rest)
        } else {
            (Delimiter::None, spec)
        };

        let (right, raw) = if let Some(raw) = rest.strip_suffix(')') {
            (Delimiter::Exclusive, raw)
        } else if let Some(raw) = rest.strip_suffix(']') {
            (Delimiter::Inclusive, raw)
        } else {
            (Delimiter::None, rest)
        };

        let mut reference = Self::new(Ecosystem::Nuget, library, spec);

        match (left, right) {
            (Delimiter::None, Delimiter::None) => {
                reference.lower = Some(VersionNumber::concrete(raw.trim()));
                reference.upper_exclusive = true;
                reference.floating = true;
            }
            (Delimiter::None, _) | (_, Delimiter::None) => {
                return Err(RangeError::SemiDelimited(spec.to_string()));
            }
            _ if !raw.contains(',') => {
                if left != Delimiter::Inclusive || right != Delimiter::Inclusive {
                    return Err(RangeError::ExactRequiresInclusive(spec.to_string()));
                }
                if raw.trim().is_empty() {
                    return Err(RangeError::MalformedBounds(spec.to_string()));
                }
                return Ok(Self::pinned(
                    Ecosystem::Nuget,
                    library,
                    spec,
                    VersionNumber::concrete(raw.trim()),
                ));
            }
            _ => {
                let bounds: Vec<&str> = raw.split(',').map(str::trim).collect();
                let [lower, upper] = bounds.as_slice() else {
                    return Err(RangeError::MalformedBounds(spec.to_string()));
                };

                reference.floating = true;

                if lower.is_empty() {
                    // `[,1.0)` shows up in advisory feeds; read it as starting at 0
                    if left == Delimiter::Inclusive {
                        reference.lower = Some(VersionNumber::concrete("0"));
                    } else {
                        reference.lower_exclusive = true;
                    }
                } else {
                    reference.lower = Some(VersionNumber::concrete(lower));
                    reference.lower_exclusive = left == Delimiter::Exclusive;
                }

                if upper.is_empty() {
                    reference.upper_exclusive = true;
                } else {
                    reference.upper = Some(VersionNumber::concrete(upper));
                    reference.upper_exclusive = right == Delimiter::Exclusive;
                }
            }
        }

        Ok(reference)
    }
}
