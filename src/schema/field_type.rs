//! Field type and indexing-mode definitions
//!
//! Every enumeration here parses case-insensitively from its
//! SCREAMING_SNAKE_CASE name, the form used in settings files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a settings value names no known variant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! settings_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Settings-file spelling of this value
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Value type of a field
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    /// Raw text, handed to the field's analyzer
    #[default]
    Text,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

settings_enum!(FieldType, "field type", {
    Text => "TEXT",
    Int => "INT",
    Long => "LONG",
    Float => "FLOAT",
    Double => "DOUBLE",
});

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldType::Text)
    }

    /// Integral types land in an i64 engine column, the rest in f64
    pub fn is_integral(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Long)
    }
}

/// Whether the raw value is kept retrievable
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreMode {
    #[default]
    Yes,
    No,
}

settings_enum!(StoreMode, "store mode", {
    Yes => "YES",
    No => "NO",
});

impl StoreMode {
    pub fn is_stored(&self) -> bool {
        matches!(self, StoreMode::Yes)
    }
}

/// Whether and how a field is made searchable
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexMode {
    /// Not searchable
    No,
    /// Run through the field's analyzer
    Analyzed,
    /// Indexed as a single term
    NotAnalyzed,
    /// Single term, no length normalization
    #[default]
    NotAnalyzedNoNorms,
    /// Analyzed, no length normalization
    AnalyzedNoNorms,
}

settings_enum!(IndexMode, "index mode", {
    No => "NO",
    Analyzed => "ANALYZED",
    NotAnalyzed => "NOT_ANALYZED",
    NotAnalyzedNoNorms => "NOT_ANALYZED_NO_NORMS",
    AnalyzedNoNorms => "ANALYZED_NO_NORMS",
});

impl IndexMode {
    pub fn is_indexed(&self) -> bool {
        !matches!(self, IndexMode::No)
    }

    pub fn is_analyzed(&self) -> bool {
        matches!(self, IndexMode::Analyzed | IndexMode::AnalyzedNoNorms)
    }

    pub fn has_norms(&self) -> bool {
        matches!(self, IndexMode::Analyzed | IndexMode::NotAnalyzed)
    }
}

/// Per-document term statistics to record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TermVectorMode {
    #[default]
    No,
    Yes,
    WithPositions,
    WithOffsets,
    WithPositionsOffsets,
}

settings_enum!(TermVectorMode, "term vector mode", {
    No => "NO",
    Yes => "YES",
    WithPositions => "WITH_POSITIONS",
    WithOffsets => "WITH_OFFSETS",
    WithPositionsOffsets => "WITH_POSITIONS_OFFSETS",
});

impl TermVectorMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, TermVectorMode::No)
    }

    pub fn with_positions(&self) -> bool {
        matches!(
            self,
            TermVectorMode::WithPositions | TermVectorMode::WithPositionsOffsets
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("int".parse::<FieldType>().unwrap(), FieldType::Int);
        assert_eq!(" Double ".parse::<FieldType>().unwrap(), FieldType::Double);
        assert_eq!("no".parse::<StoreMode>().unwrap(), StoreMode::No);
        assert_eq!(
            "not_analyzed_no_norms".parse::<IndexMode>().unwrap(),
            IndexMode::NotAnalyzedNoNorms
        );
        assert_eq!(
            "WITH_POSITIONS_OFFSETS".parse::<TermVectorMode>().unwrap(),
            TermVectorMode::WithPositionsOffsets
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = "MAYBE".parse::<StoreMode>().unwrap_err();
        assert_eq!(err.kind, "store mode");
        assert_eq!(err.to_string(), "unknown store mode 'MAYBE'");
        assert!("BIGINT".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_display_round_trips_settings_spelling() {
        for mode in IndexMode::ALL {
            assert_eq!(mode.to_string().parse::<IndexMode>().unwrap(), *mode);
        }
    }

    #[test]
    fn test_index_mode_properties() {
        assert!(!IndexMode::No.is_indexed());
        assert!(IndexMode::Analyzed.is_analyzed());
        assert!(IndexMode::Analyzed.has_norms());
        assert!(!IndexMode::AnalyzedNoNorms.has_norms());
        assert!(!IndexMode::NotAnalyzed.is_analyzed());
        assert!(!IndexMode::NotAnalyzedNoNorms.has_norms());
    }

    #[test]
    fn test_field_type_properties() {
        assert!(!FieldType::Text.is_numeric());
        assert!(FieldType::Int.is_integral());
        assert!(FieldType::Float.is_numeric());
        assert!(!FieldType::Double.is_integral());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&IndexMode::NotAnalyzedNoNorms).unwrap();
        assert_eq!(json, "\"NOT_ANALYZED_NO_NORMS\"");
        let back: TermVectorMode = serde_json::from_str("\"WITH_OFFSETS\"").unwrap();
        assert_eq!(back, TermVectorMode::WithOffsets);
    }
}
