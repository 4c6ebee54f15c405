// Node labels and edge classification
//
// Everything here only makes diagrams legible; none of it affects which
// objects a traversal visits.

use crate::object::{Inspect, MapKeyRef, ObjectId, StructuralKind};
use std::collections::BTreeMap;

/// Placeholder for objects whose summary cannot be produced
pub const UNREPRESENTABLE: &str = "(unrepresentable)";

const KEY_REPR_LIMIT: usize = 40;

/// Escape a string for use inside a double-quoted DOT attribute
pub fn quote(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\0', "\\\\0")
}

/// Summary of an object that never fails
pub fn safe_summary(obj: &dyn Inspect) -> String {
    obj.short_summary().unwrap_or_else(|_| UNREPRESENTABLE.to_string())
}

/// Quoted node label: type name, summary and an optional annotation
///
/// A `refcount` is appended to the type line as ` [n]`.
pub fn object_label(
    obj: &dyn Inspect,
    extra_info: Option<&str>,
    refcount: Option<usize>,
    shortnames: bool,
) -> String {
    let mut type_line = obj.display_type_name(shortnames);
    if let Some(n) = refcount {
        type_line.push_str(&format!(" [{}]", n));
    }
    let mut lines = vec![type_line, safe_summary(obj)];
    if let Some(extra) = extra_info {
        lines.push(extra.to_string());
    }
    quote(&lines.join("\n"))
}

/// Extra `key="value"` pairs appended to a label statement
///
/// Keys come out sorted; `None` values are dropped.
pub fn extra_attrs(attrs: &BTreeMap<String, Option<String>>) -> String {
    attrs
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| format!(", {}=\"{}\"", k, quote(v))))
        .collect()
}

/// Describe the edge from `source` to `target`
///
/// Returns a bracketed attribute list including the leading space, or an
/// empty string when the relationship is not recognized.
pub fn edge_label(source: &dyn Inspect, target: ObjectId, shortnames: bool) -> String {
    if source.attribute_container() == Some(target) {
        return strong_label("__dict__");
    }

    match source.structural_kind() {
        StructuralKind::Frame => {
            if source.frame_locals() == Some(target) {
                return strong_label("f_locals");
            }
            if source.frame_globals() == Some(target) {
                return strong_label("f_globals");
            }
        }
        StructuralKind::Method => {
            if source.bound_receiver() == Some(target) {
                return strong_label("__self__");
            }
            if source.bound_function() == Some(target) {
                return strong_label("__func__");
            }
        }
        StructuralKind::Function => {
            let attrs = source.function_attributes();
            if let Some((name, _)) = attrs.iter().find(|(_, value)| *value == target) {
                return strong_label(name);
            }
        }
        StructuralKind::Mapping => {
            let entries = source.mapping_entries();
            if let Some((key, _)) = entries.iter().find(|(_, value)| *value == target) {
                return mapping_label(*key, shortnames);
            }
        }
        _ => {}
    }

    String::new()
}

fn strong_label(name: &str) -> String {
    format!(" [label=\"{}\",weight=10]", quote(name))
}

fn mapping_label(key: MapKeyRef<'_>, shortnames: bool) -> String {
    match key {
        MapKeyRef::Str(k) if is_identifier(k) => format!(" [label=\"{}\",weight=2]", quote(k)),
        MapKeyRef::Str(k) => {
            let type_name = if shortnames { "str" } else { "builtins.str" };
            format!(" [label=\"{}\"]", quote(&format!("{}\n{}", type_name, str_repr(k))))
        }
        MapKeyRef::Other { type_name, summary } => {
            format!(" [label=\"{}\"]", quote(&format!("{}\n{}", type_name, summary)))
        }
    }
}

/// Quoted, escaped form of a string key, cut to the summary limit
///
/// Single quotes unless the key contains one and no double quote.
fn str_repr(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(delim);
    out.chars().take(KEY_REPR_LIMIT).collect()
}

/// `[a-zA-Z_][a-zA-Z_0-9]*`
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{HeapObject, MapKey};

    #[test]
    fn test_quote() {
        assert_eq!(quote("a\"b"), "a\\\"b");
        assert_eq!(quote("a\nb"), "a\\nb");
        assert_eq!(quote("a\\b"), "a\\\\b");
        assert_eq!(quote("a\0b"), "a\\\\0b");
    }

    #[test]
    fn test_object_label() {
        let obj = HeapObject::new("TestObject").summary("TestObject(A)");
        assert_eq!(object_label(&obj, None, None, true), "TestObject\\nTestObject(A)");
    }

    #[test]
    fn test_object_label_long_type_name() {
        let obj = HeapObject::new("MyClass").module("mymodule");
        assert_eq!(
            object_label(&obj, None, None, false),
            "mymodule.MyClass\\n<mymodule.MyClass object>"
        );
    }

    #[test]
    fn test_object_label_with_extra_info() {
        let obj = HeapObject::new("list").kind(StructuralKind::Container);
        assert_eq!(
            object_label(&obj, Some("owner: cache"), None, true),
            "list\\n0 items\\nowner: cache"
        );
    }

    #[test]
    fn test_object_label_with_refcount() {
        let obj = HeapObject::new("TestObject").summary("TestObject(A)");
        assert_eq!(
            object_label(&obj, Some("note"), Some(3), true),
            "TestObject [3]\\nTestObject(A)\\nnote"
        );
    }

    #[test]
    fn test_unrepresentable_summary() {
        let obj = HeapObject::new("Broken").unrepresentable();
        assert_eq!(safe_summary(&obj), UNREPRESENTABLE);
        assert_eq!(object_label(&obj, None, None, true), "Broken\\n(unrepresentable)");
    }

    #[test]
    fn test_extra_attrs() {
        let mut attrs = BTreeMap::new();
        attrs.insert("url".to_string(), Some("http://e.com/object".to_string()));
        attrs.insert("shape".to_string(), Some("diamond".to_string()));
        attrs.insert("ignored".to_string(), None);
        assert_eq!(
            extra_attrs(&attrs),
            ", shape=\"diamond\", url=\"http://e.com/object\""
        );
    }

    #[test]
    fn test_edge_label_attribute_container() {
        let obj = HeapObject::new("Widget").attributes(ObjectId(5));
        assert_eq!(edge_label(&obj, ObjectId(5), true), " [label=\"__dict__\",weight=10]");
    }

    #[test]
    fn test_edge_label_frame() {
        let frame = HeapObject::new("frame").frame(ObjectId(1), ObjectId(2));
        assert_eq!(edge_label(&frame, ObjectId(1), true), " [label=\"f_locals\",weight=10]");
        assert_eq!(edge_label(&frame, ObjectId(2), true), " [label=\"f_globals\",weight=10]");
    }

    #[test]
    fn test_edge_label_bound_method() {
        let method = HeapObject::new("method").bound(ObjectId(3), ObjectId(4));
        assert_eq!(edge_label(&method, ObjectId(3), true), " [label=\"__self__\",weight=10]");
        assert_eq!(edge_label(&method, ObjectId(4), true), " [label=\"__func__\",weight=10]");
    }

    #[test]
    fn test_edge_label_mapping_keys() {
        let dict = HeapObject::new("dict")
            .entry("name", ObjectId(1))
            .entry("not an identifier", ObjectId(2))
            .entry(MapKey::other("MyClass", "<MyClass object>"), ObjectId(3))
            .entry("", ObjectId(4));

        assert_eq!(edge_label(&dict, ObjectId(1), true), " [label=\"name\",weight=2]");
        assert_eq!(
            edge_label(&dict, ObjectId(2), true),
            " [label=\"str\\n'not an identifier'\"]"
        );
        assert_eq!(
            edge_label(&dict, ObjectId(3), true),
            " [label=\"MyClass\\n<MyClass object>\"]"
        );
        assert_eq!(edge_label(&dict, ObjectId(4), true), " [label=\"str\\n''\"]");
    }

    #[test]
    fn test_edge_label_function_attribute() {
        let func = HeapObject::new("function")
            .function_attr("__globals__", ObjectId(1))
            .function_attr("__closure__", ObjectId(2));
        assert_eq!(edge_label(&func, ObjectId(1), true), " [label=\"__globals__\",weight=10]");
        assert_eq!(edge_label(&func, ObjectId(2), true), " [label=\"__closure__\",weight=10]");
        assert_eq!(edge_label(&func, ObjectId(3), true), "");
    }

    #[test]
    fn test_str_repr() {
        assert_eq!(str_repr("a b"), "'a b'");
        assert_eq!(str_repr("it's"), "\"it's\"");
        assert_eq!(str_repr("'\""), "'\\'\"'");
        assert_eq!(str_repr("tab\there"), "'tab\\there'");
        assert_eq!(str_repr(&"x".repeat(60)).len(), 40);
    }

    #[test]
    fn test_edge_label_unrecognized() {
        let list = HeapObject::new("list").refs([ObjectId(1)]);
        assert_eq!(edge_label(&list, ObjectId(1), true), "");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("_private"));
        assert!(is_identifier("a1"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
