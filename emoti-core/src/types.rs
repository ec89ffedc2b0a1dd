//! Static types of EmotiLang.
//!
//! Users can only write the three value types. `Any` exists for the
//! binding introduced by a catch clause, whose value type is not tracked
//! across a throw.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Number,
    String,
    Boolean,
    /// Type of a caught exception value; compatible with everything.
    Any,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::Number => "number",
            Type::String => "string",
            Type::Boolean => "boolean",
            Type::Any => "any",
        }
    }

    /// Whether a value of type `self` may be used where `expected` is required.
    ///
    /// There are no implicit conversions: only identical types match,
    /// with `Any` matching in either direction.
    pub fn fits(self, expected: Type) -> bool {
        self == expected || self == Type::Any || expected == Type::Any
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared shape of a function: positional parameter types and result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Type>,
    pub result: Type,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_identical_types_fit() {
        assert!(Type::Number.fits(Type::Number));
        assert!(!Type::Number.fits(Type::String));
        assert!(!Type::Boolean.fits(Type::Number));
    }

    #[test]
    fn any_fits_both_ways() {
        assert!(Type::Any.fits(Type::String));
        assert!(Type::Boolean.fits(Type::Any));
    }

    #[test]
    fn signature_display() {
        let sig = Signature {
            params: vec![Type::Number, Type::String],
            result: Type::Boolean,
        };
        assert_eq!(sig.to_string(), "(number, string) -> boolean");
    }
}
