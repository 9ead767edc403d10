use std::fmt;
use std::str::FromStr;

use crate::error::IndexerError;

/// Compatibility level for version-aware analyzers
///
/// Index data analyzed under one version is only guaranteed to match queries
/// analyzed under the same version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineVersion {
    /// Lowercasing word tokenization
    V1,
    /// Adds ASCII folding and drops overlong tokens
    V2,
    /// Whatever the newest version is
    #[default]
    Latest,
}

impl EngineVersion {
    /// Resolve `Latest` to the concrete version it currently means
    pub fn effective(self) -> EngineVersion {
        match self {
            EngineVersion::Latest => EngineVersion::V2,
            other => other,
        }
    }

    /// Whether this version includes everything `other` does
    pub fn on_or_after(self, other: EngineVersion) -> bool {
        self.effective() >= other.effective()
    }
}

impl FromStr for EngineVersion {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "V1" | "1" => Ok(EngineVersion::V1),
            "V2" | "2" => Ok(EngineVersion::V2),
            "LATEST" => Ok(EngineVersion::Latest),
            _ => Err(IndexerError::Config(format!(
                "unknown engine version '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineVersion::V1 => "V1",
            EngineVersion::V2 => "V2",
            EngineVersion::Latest => "LATEST",
        };
        f.write_str(name)
    }
}
