// Object model for inspectable object spaces
//
// The traversal engine never touches a runtime collector directly. It sees
// objects through three narrow contracts:
// - `Inspect`: what a single object looks like (type, summary, structure)
// - `ObjectSpace`: the bounded universe of tracked objects and their links
// - `EdgeSource`: which neighbors a traversal follows from an object

pub mod heap;

pub use heap::{Heap, HeapObject, MapKey, Snapshot};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an object for the lifetime of the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// Node identifier used in diagram output
    pub fn node_id(self) -> String {
        format!("o{}", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        ObjectId(id)
    }
}

/// Structural shape of an object, as far as labeling cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StructuralKind {
    #[default]
    Plain,
    /// List, tuple, set and friends
    Container,
    /// Key/value container
    Mapping,
    /// A call frame with local and global variable containers
    Frame,
    /// A loaded module; rendered but never expanded
    Module,
    /// A function bound to a receiver
    Method,
    /// A plain function with named attributes
    Function,
    /// Weak-reference wrapper; all of them fold into one node per build
    WeakRef,
}

/// Raised by an object whose text rendering hook fails
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("summary unavailable: {0}")]
pub struct SummaryError(pub String);

/// Key of a mapping entry, borrowed from the mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKeyRef<'a> {
    Str(&'a str),
    Other { type_name: &'a str, summary: &'a str },
}

/// Introspection contract every inspectable object implements
pub trait Inspect {
    /// Short type name, e.g. `dict`
    fn type_name(&self) -> &str;

    /// Defining module of the type, if any
    fn module_name(&self) -> Option<&str> {
        None
    }

    /// Module-qualified type name, falling back to the short name
    fn qualified_type_name(&self) -> String {
        match self.module_name() {
            Some(module) if !module.is_empty() => format!("{}.{}", module, self.type_name()),
            _ => self.type_name().to_string(),
        }
    }

    /// Short human readable summary of the value
    fn short_summary(&self) -> Result<String, SummaryError>;

    /// Whether a finalizer hook is attached
    fn has_finalizer(&self) -> bool {
        false
    }

    /// Item count, for containers and mappings
    fn len(&self) -> Option<usize> {
        None
    }

    fn structural_kind(&self) -> StructuralKind {
        StructuralKind::Plain
    }

    /// Object holding this object's attributes
    fn attribute_container(&self) -> Option<ObjectId> {
        None
    }

    fn frame_locals(&self) -> Option<ObjectId> {
        None
    }

    fn frame_globals(&self) -> Option<ObjectId> {
        None
    }

    fn bound_receiver(&self) -> Option<ObjectId> {
        None
    }

    fn bound_function(&self) -> Option<ObjectId> {
        None
    }

    /// Named attributes of a function, sorted by name
    fn function_attributes(&self) -> Vec<(&str, ObjectId)> {
        Vec::new()
    }

    /// Entries of a mapping, in iteration order
    fn mapping_entries(&self) -> Vec<(MapKeyRef<'_>, ObjectId)> {
        Vec::new()
    }

    /// Display name of the type under the requested naming scheme
    fn display_type_name(&self, shortnames: bool) -> String {
        if shortnames {
            self.type_name().to_string()
        } else {
            self.qualified_type_name()
        }
    }
}

/// A bounded universe of inspectable objects
///
/// This is the collector capability: it enumerates tracked objects and
/// answers "who points to X" and "what does X point to". Implementations
/// must return neighbors in a stable order.
pub trait ObjectSpace {
    /// Look up an object by identity
    fn get(&self, id: ObjectId) -> Option<&dyn Inspect>;

    /// All currently tracked objects
    fn tracked(&self) -> Vec<ObjectId>;

    /// Objects referencing `id`
    fn referrers(&self, id: ObjectId) -> Vec<ObjectId>;

    /// Objects referenced by `id`
    fn referents(&self, id: ObjectId) -> Vec<ObjectId>;

    fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }
}

/// Neighbor enumeration followed by a traversal
pub trait EdgeSource {
    fn neighbors(&self, id: ObjectId) -> Vec<ObjectId>;
}

impl<F> EdgeSource for F
where
    F: Fn(ObjectId) -> Vec<ObjectId>,
{
    fn neighbors(&self, id: ObjectId) -> Vec<ObjectId> {
        self(id)
    }
}

/// Follows "what points to this"
pub struct Referrers<'a, S: ObjectSpace + ?Sized>(pub &'a S);

impl<S: ObjectSpace + ?Sized> EdgeSource for Referrers<'_, S> {
    fn neighbors(&self, id: ObjectId) -> Vec<ObjectId> {
        self.0.referrers(id)
    }
}

/// Follows "what this points to"
pub struct Referents<'a, S: ObjectSpace + ?Sized>(pub &'a S);

impl<S: ObjectSpace + ?Sized> EdgeSource for Referents<'_, S> {
    fn neighbors(&self, id: ObjectId) -> Vec<ObjectId> {
        self.0.referents(id)
    }
}

/// Check a type name against an object, honoring module qualification
///
/// Names containing a `.` are compared with the qualified name.
pub fn type_matches(obj: &dyn Inspect, typename: &str) -> bool {
    if typename.contains('.') {
        obj.qualified_type_name() == typename
    } else {
        obj.type_name() == typename
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        module: Option<&'static str>,
    }

    impl Inspect for Dummy {
        fn type_name(&self) -> &str {
            "MyClass"
        }

        fn module_name(&self) -> Option<&str> {
            self.module
        }

        fn short_summary(&self) -> Result<String, SummaryError> {
            Ok("<MyClass>".to_string())
        }
    }

    #[test]
    fn test_node_id() {
        assert_eq!(ObjectId(42).node_id(), "o42");
    }

    #[test]
    fn test_qualified_type_name() {
        let obj = Dummy { module: Some("mymodule") };
        assert_eq!(obj.qualified_type_name(), "mymodule.MyClass");
        assert_eq!(obj.display_type_name(true), "MyClass");
        assert_eq!(obj.display_type_name(false), "mymodule.MyClass");
    }

    #[test]
    fn test_qualified_type_name_without_module() {
        let obj = Dummy { module: None };
        assert_eq!(obj.qualified_type_name(), "MyClass");
    }

    #[test]
    fn test_type_matches() {
        let obj = Dummy { module: Some("mymodule") };
        assert!(type_matches(&obj, "MyClass"));
        assert!(type_matches(&obj, "mymodule.MyClass"));
        assert!(!type_matches(&obj, "other.MyClass"));
        assert!(!type_matches(&obj, "dict"));
    }

    #[test]
    fn test_closure_edge_source() {
        let edges = |id: ObjectId| vec![ObjectId(id.0 + 1)];
        assert_eq!(edges.neighbors(ObjectId(1)), vec![ObjectId(2)]);
    }
}
