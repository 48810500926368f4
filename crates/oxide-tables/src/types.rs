//! Column type registry.
//!
//! Single source of truth for the canonical column types: which ones belong to
//! the integer family, which length parameters they accept, and how they map to
//! and from the physical names reported by schema introspection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Widest `string` column accepted.
pub const MAX_STRING_LENGTH: u32 = 65_535;

/// Length assigned to a `string` column declared without one.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Highest precision accepted for `decimal` and `double`.
pub const MAX_PRECISION: u8 = 65;

/// Highest scale accepted for `decimal` and `double`.
pub const MAX_SCALE: u8 = 30;

/// Canonical column types, independent of any database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    /// 32-bit integer.
    Integer,
    /// 16-bit integer.
    SmallInteger,
    /// 64-bit integer.
    BigInteger,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    DateTime,
    /// Timestamp.
    Timestamp,
    /// Variable-length string with a maximum length.
    String,
    /// Unbounded text.
    Text,
    /// Binary large object.
    Binary,
    /// Boolean flag.
    Boolean,
    /// Fixed-point number with precision and scale.
    Decimal,
    /// Double precision floating point.
    Double,
}

/// Every canonical type, in declaration order.
pub const ALL_TYPES: [ColumnType; 13] = [
    ColumnType::Integer,
    ColumnType::SmallInteger,
    ColumnType::BigInteger,
    ColumnType::Date,
    ColumnType::Time,
    ColumnType::DateTime,
    ColumnType::Timestamp,
    ColumnType::String,
    ColumnType::Text,
    ColumnType::Binary,
    ColumnType::Boolean,
    ColumnType::Decimal,
    ColumnType::Double,
];

/// The set of length parameters a type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthDomain {
    /// No length parameter may be given.
    None,
    /// A character count within `min..=max`.
    Chars {
        /// Smallest accepted length.
        min: u32,
        /// Largest accepted length.
        max: u32,
        /// Length used when none is declared.
        default: u32,
    },
    /// A `precision[,scale]` pair.
    Precision {
        /// Whether the parameter must be present.
        required: bool,
    },
}

/// A parsed length parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnLength {
    /// Maximum character count.
    Chars(u32),
    /// Total digits and digits after the decimal point.
    Precision {
        /// Total number of digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
}

impl fmt::Display for ColumnLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chars(n) => write!(f, "{n}"),
            Self::Precision { precision, scale } => write!(f, "{precision},{scale}"),
        }
    }
}

/// A length parameter outside the legal domain of its type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeConstraintError {
    /// The type name is not a canonical type.
    #[error("unknown column type '{0}'")]
    UnknownType(String),

    /// A length was given for a type that takes none.
    #[error("type '{column_type}' does not accept a length")]
    LengthNotAllowed {
        /// The offending type.
        column_type: ColumnType,
    },

    /// No length was given for a type that requires one.
    #[error("type '{column_type}' requires a length")]
    LengthRequired {
        /// The offending type.
        column_type: ColumnType,
    },

    /// The length is not a number.
    #[error("length '{value}' is not numeric")]
    NotNumeric {
        /// The raw length text.
        value: String,
    },

    /// The length is outside the accepted range.
    #[error("length {value} for type '{column_type}' must be between {min} and {max}")]
    OutOfRange {
        /// The offending type.
        column_type: ColumnType,
        /// The parsed length.
        value: u64,
        /// Smallest accepted length.
        min: u32,
        /// Largest accepted length.
        max: u32,
    },

    /// The precision or scale is outside the accepted range.
    #[error(
        "precision {precision} and scale {scale} for type '{column_type}' are invalid \
         (precision 1-65, scale 0-30, scale not above precision)"
    )]
    InvalidPrecision {
        /// The offending type.
        column_type: ColumnType,
        /// The parsed precision.
        precision: u64,
        /// The parsed scale.
        scale: u64,
    },
}

impl ColumnType {
    /// Returns the canonical type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::SmallInteger => "smallInteger",
            Self::BigInteger => "bigInteger",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "dateTime",
            Self::Timestamp => "timestamp",
            Self::String => "string",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Double => "double",
        }
    }

    /// Returns the Rust variant name, used by generated migration code.
    #[must_use]
    pub const fn variant_name(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::SmallInteger => "SmallInteger",
            Self::BigInteger => "BigInteger",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::DateTime => "DateTime",
            Self::Timestamp => "Timestamp",
            Self::String => "String",
            Self::Text => "Text",
            Self::Binary => "Binary",
            Self::Boolean => "Boolean",
            Self::Decimal => "Decimal",
            Self::Double => "Double",
        }
    }

    /// Returns true for the integer family, the only types that may be
    /// unsigned or auto-incrementing.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Integer | Self::SmallInteger | Self::BigInteger)
    }

    /// Returns the length parameters this type accepts.
    #[must_use]
    pub const fn length_domain(self) -> LengthDomain {
        match self {
            Self::String => LengthDomain::Chars {
                min: 1,
                max: MAX_STRING_LENGTH,
                default: DEFAULT_STRING_LENGTH,
            },
            Self::Decimal => LengthDomain::Precision { required: true },
            Self::Double => LengthDomain::Precision { required: false },
            _ => LengthDomain::None,
        }
    }

    /// Returns the length a column of this type gets when none is declared.
    #[must_use]
    pub const fn default_length(self) -> Option<ColumnLength> {
        match self.length_domain() {
            LengthDomain::Chars { default, .. } => Some(ColumnLength::Chars(default)),
            _ => None,
        }
    }

    /// Returns the physical type name reported by introspection.
    #[must_use]
    pub const fn physical_name(self) -> &'static str {
        match self {
            Self::Integer => "int",
            Self::SmallInteger => "smallint",
            Self::BigInteger => "bigint",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::String => "varchar",
            Self::Text => "text",
            Self::Binary => "blob",
            Self::Boolean => "tinyint",
            Self::Decimal => "decimal",
            Self::Double => "double",
        }
    }

    /// Maps a physical type name back to its canonical type.
    ///
    /// Matching is case-insensitive and accepts common engine aliases.
    #[must_use]
    pub fn from_physical(name: &str) -> Option<Self> {
        let ty = match name.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "mediumint" => Self::Integer,
            "smallint" => Self::SmallInteger,
            "bigint" => Self::BigInteger,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" => Self::DateTime,
            "timestamp" => Self::Timestamp,
            "varchar" | "char" => Self::String,
            "text" | "tinytext" | "mediumtext" | "longtext" => Self::Text,
            "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
                Self::Binary
            }
            "tinyint" | "bool" | "boolean" => Self::Boolean,
            "decimal" | "numeric" => Self::Decimal,
            "double" | "float" | "real" => Self::Double,
            _ => return None,
        };
        Some(ty)
    }

    /// Parses and checks a raw length parameter against this type's domain.
    ///
    /// Blank input counts as absent. `Ok(None)` means the column carries no
    /// length (the caller may still apply [`ColumnType::default_length`]).
    pub fn validate_length(
        self,
        length: Option<&str>,
    ) -> Result<Option<ColumnLength>, TypeConstraintError> {
        let raw = length.map(str::trim).filter(|s| !s.is_empty());

        match (self.length_domain(), raw) {
            (LengthDomain::None, None) => Ok(None),
            (LengthDomain::None, Some(_)) => {
                Err(TypeConstraintError::LengthNotAllowed { column_type: self })
            }
            (LengthDomain::Chars { .. }, None) => Ok(None),
            (LengthDomain::Chars { min, max, .. }, Some(raw)) => {
                let value = parse_number(raw)?;
                if value < u64::from(min) || value > u64::from(max) {
                    return Err(TypeConstraintError::OutOfRange {
                        column_type: self,
                        value,
                        min,
                        max,
                    });
                }
                // In range, so it fits a u32.
                Ok(Some(ColumnLength::Chars(value as u32)))
            }
            (LengthDomain::Precision { required: true }, None) => {
                Err(TypeConstraintError::LengthRequired { column_type: self })
            }
            (LengthDomain::Precision { required: false }, None) => Ok(None),
            (LengthDomain::Precision { .. }, Some(raw)) => {
                let (precision, scale) = match raw.split_once(',') {
                    Some((p, s)) => (parse_number(p.trim())?, parse_number(s.trim())?),
                    None => (parse_number(raw)?, 0),
                };
                if precision == 0
                    || precision > u64::from(MAX_PRECISION)
                    || scale > u64::from(MAX_SCALE)
                    || scale > precision
                {
                    return Err(TypeConstraintError::InvalidPrecision {
                        column_type: self,
                        precision,
                        scale,
                    });
                }
                Ok(Some(ColumnLength::Precision {
                    precision: precision as u8,
                    scale: scale as u8,
                }))
            }
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_TYPES
            .iter()
            .copied()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| TypeConstraintError::UnknownType(s.to_string()))
    }
}

fn parse_number(raw: &str) -> Result<u64, TypeConstraintError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TypeConstraintError::NotNumeric {
            value: raw.to_string(),
        });
    }
    raw.parse().map_err(|_| TypeConstraintError::NotNumeric {
        value: raw.to_string(),
    })
}
