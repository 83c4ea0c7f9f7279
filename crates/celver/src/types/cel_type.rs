//! Static types used by declarations and the checker.

use std::fmt;
use std::sync::Arc;

/// A static type in the expression language.
///
/// `Dyn` plays the role of "Any": a parameter declared `Dyn` accepts every
/// value and defers correctness to evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CelType {
    Null,
    Bool,
    Int,
    Double,
    String,
    Bytes,
    /// Homogeneous list with the given element type.
    List(Arc<CelType>),
    /// Map with the given key and value types.
    Map(Arc<CelType>, Arc<CelType>),
    /// Dynamic type, compatible with everything.
    Dyn,
    /// Type parameter of a generic overload (e.g. `T` in `_==_(T, T)`).
    TypeParam(Arc<str>),
    /// Placeholder produced by the checker after reporting an error.
    Error,
}

impl CelType {
    /// Create a list type with the given element type.
    ///
    /// ```
    /// use celver::CelType;
    /// assert_eq!(CelType::list(CelType::Int).display_name(), "list(int)");
    /// ```
    pub fn list(elem: CelType) -> Self {
        CelType::List(Arc::new(elem))
    }

    /// Create a map type with the given key and value types.
    pub fn map(key: CelType, value: CelType) -> Self {
        CelType::Map(Arc::new(key), Arc::new(value))
    }

    /// Create a type parameter.
    pub fn type_param(name: &str) -> Self {
        CelType::TypeParam(Arc::from(name))
    }

    /// Returns true for `Dyn`, type parameters, and `Error`, i.e. types that
    /// do not pin down a concrete runtime shape.
    pub fn is_dynamic(&self) -> bool {
        match self {
            CelType::Dyn | CelType::TypeParam(_) | CelType::Error => true,
            CelType::List(elem) => elem.is_dynamic(),
            CelType::Map(key, value) => key.is_dynamic() || value.is_dynamic(),
            _ => false,
        }
    }

    /// Returns true if a value of type `other` can be used where `self` is expected.
    ///
    /// `Dyn` and `Error` are compatible in both directions; lists and maps
    /// are compared structurally. Type parameters accept anything here; the
    /// checker binds them separately during overload resolution.
    pub fn is_assignable_from(&self, other: &CelType) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (CelType::Dyn | CelType::Error | CelType::TypeParam(_), _) => true,
            (_, CelType::Dyn | CelType::Error | CelType::TypeParam(_)) => true,
            (CelType::List(a), CelType::List(b)) => a.is_assignable_from(b),
            (CelType::Map(ak, av), CelType::Map(bk, bv)) => {
                ak.is_assignable_from(bk) && av.is_assignable_from(bv)
            }
            _ => false,
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            CelType::Null => "null_type".to_string(),
            CelType::Bool => "bool".to_string(),
            CelType::Int => "int".to_string(),
            CelType::Double => "double".to_string(),
            CelType::String => "string".to_string(),
            CelType::Bytes => "bytes".to_string(),
            CelType::List(elem) => format!("list({})", elem.display_name()),
            CelType::Map(key, value) => {
                format!("map({}, {})", key.display_name(), value.display_name())
            }
            CelType::Dyn => "dyn".to_string(),
            CelType::TypeParam(name) => name.to_string(),
            CelType::Error => "*error*".to_string(),
        }
    }
}

impl fmt::Display for CelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(CelType::Int.display_name(), "int");
        assert_eq!(
            CelType::map(CelType::String, CelType::list(CelType::Dyn)).display_name(),
            "map(string, list(dyn))"
        );
    }

    #[test]
    fn dyn_is_assignable_both_ways() {
        assert!(CelType::Dyn.is_assignable_from(&CelType::Int));
        assert!(CelType::String.is_assignable_from(&CelType::Dyn));
        assert!(!CelType::String.is_assignable_from(&CelType::Int));
    }

    #[test]
    fn structural_assignability() {
        let list_dyn = CelType::list(CelType::Dyn);
        assert!(list_dyn.is_assignable_from(&CelType::list(CelType::Int)));
        assert!(!CelType::list(CelType::Int).is_assignable_from(&CelType::list(CelType::String)));
        assert!(CelType::map(CelType::Dyn, CelType::Dyn)
            .is_assignable_from(&CelType::map(CelType::String, CelType::Int)));
    }

    #[test]
    fn dynamic_detection() {
        assert!(CelType::Dyn.is_dynamic());
        assert!(CelType::list(CelType::type_param("T")).is_dynamic());
        assert!(!CelType::map(CelType::String, CelType::Int).is_dynamic());
    }
}
