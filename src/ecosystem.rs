//! Package ecosystems understood by the miner

use thiserror::Error;

/// Ecosystem a package or version constraint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ecosystem {
    /// Constraint created without an ecosystem-specific parser
    #[default]
    Unknown,
    /// npm registry (package.json dependency mappings)
    Npm,
    /// NuGet gallery (nuspec dependency groups)
    Nuget,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown ecosystem label: {0}")]
pub struct UnknownEcosystem(pub String);

impl Ecosystem {
    /// Returns the string representation of the ecosystem
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Unknown => "unknown",
            Ecosystem::Npm => "npm",
            Ecosystem::Nuget => "nuget",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Ecosystem {
    type Err = UnknownEcosystem;

    /// Only the crawlable ecosystems parse; `unknown` is never a valid selector.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" => Ok(Ecosystem::Npm),
            "nuget" => Ok(Ecosystem::Nuget),
            _ => Err(UnknownEcosystem(s.to_string())),
        }
    }
}
