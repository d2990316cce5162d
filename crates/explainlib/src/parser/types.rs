use std::fmt::{Display, Formatter, Result as FmtResult};

/// Symbol/choice types.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Type {
    #[default]
    Unknown,
    Bool,
    Tristate,
    String,
    Int,
    Hex,
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Type::Unknown => write!(f, "unknown"),
            Type::Bool => write!(f, "bool"),
            Type::Tristate => write!(f, "tristate"),
            Type::String => write!(f, "string"),
            Type::Int => write!(f, "int"),
            Type::Hex => write!(f, "hex"),
        }
    }
}

impl Type {
    /// Indicates whether values of this type are `n`/`m`/`y`.
    #[inline(always)]
    pub fn is_bool_or_tristate(&self) -> bool {
        matches!(self, Type::Bool | Type::Tristate)
    }
}

/// A tristate value.
///
/// This takes on `false`, `maybe` or `true`, corresponding with `n`, `m` and `y`, respectively.
/// Values are ordered so that `min`/`max` implement `&&`/`||`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Tristate {
    /// `n`
    #[default]
    False = 0,

    /// `m`
    Maybe = 1,

    /// `y`
    True = 2,
}

impl Tristate {
    /// Parse `n`, `m` or `y`.
    pub fn from_config_value(s: &str) -> Option<Self> {
        match s {
            "n" => Some(Self::False),
            "m" => Some(Self::Maybe),
            "y" => Some(Self::True),
            _ => None,
        }
    }

    /// Kconfig negation: `!y == n`, `!m == m`.
    #[inline(always)]
    pub fn not(self) -> Self {
        match self {
            Self::False => Self::True,
            Self::Maybe => Self::Maybe,
            Self::True => Self::False,
        }
    }

    /// Indicates whether the value is `m` or `y`.
    #[inline(always)]
    pub fn is_positive(self) -> bool {
        self != Self::False
    }
}

impl From<bool> for Tristate {
    #[inline(always)]
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl Display for Tristate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::False => "n",
            Self::Maybe => "m",
            Self::True => "y",
        })
    }
}
