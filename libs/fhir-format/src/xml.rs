//! FHIR XML → JSON mapping.
//!
//! Schema-agnostic, following the HL7 JSON/XML mapping rules:
//! - The root element name becomes `resourceType`.
//! - Primitive values are read from the `value` attribute.
//! - Primitive metadata (`id`, `extension`) is carried through `_field` entries.
//! - Repeated elements become arrays with aligned metadata arrays.
//!
//! Without a full schema, primitives are strings unless the element is a known
//! boolean, integer or decimal, and only known repeating elements become
//! arrays when they occur once.

use crate::FormatError;
use roxmltree::{Document, Node};
use serde_json::{Map, Value};

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Elements that repeat wherever they occur in conformance resources.
const REPEATING: &[&str] = &[
    "alias",
    "coding",
    "concept",
    "condition",
    "constraint",
    "contact",
    "contained",
    "designation",
    "discriminator",
    "element",
    "entry",
    "exclude",
    "extension",
    "filter",
    "given",
    "include",
    "jurisdiction",
    "mapping",
    "modifierExtension",
    "profile",
    "targetProfile",
    "telecom",
    "useContext",
];

/// Elements that repeat only in their complex form (`ElementDefinition.type`
/// versus `StructureDefinition.type`, `ElementDefinition.code` versus `Coding.code`).
const REPEATING_COMPLEX: &[&str] = &["code", "type"];

const BOOLEAN_ELEMENTS: &[&str] = &[
    "abstract",
    "active",
    "caseSensitive",
    "compositional",
    "experimental",
    "immutable",
    "inactive",
    "isModifier",
    "isSummary",
    "lockedDate",
    "mustSupport",
    "ordered",
    "sliceIsConstraining",
    "versionNeeded",
];

const INTEGER_ELEMENTS: &[&str] = &["count", "maxLength", "min", "offset", "rank", "total"];

/// Convert a FHIR XML document into its JSON value.
pub fn xml_to_value(input: &str) -> Result<Value, FormatError> {
    let doc = Document::parse(input)?;
    let root = doc.root_element();

    let mut map = Map::new();
    map.insert(
        "resourceType".to_string(),
        Value::String(root.tag_name().name().to_string()),
    );
    if let Some(id) = root.attribute("id") {
        map.insert("id".to_string(), Value::String(id.to_string()));
    }

    insert_children(input, root, &mut map);
    Ok(Value::Object(map))
}

fn element_to_value(source: &str, node: Node) -> (Value, Option<Value>) {
    if node.tag_name().namespace() == Some(XHTML_NS) {
        return (Value::String(source[node.range()].to_string()), None);
    }

    if let Some(raw) = node.attribute("value") {
        let mut meta = Map::new();
        if let Some(id) = node.attribute("id") {
            meta.insert("id".to_string(), Value::String(id.to_string()));
        }
        let extensions: Vec<Value> = node
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == "extension")
            .map(|c| element_to_value(source, c).0)
            .collect();
        if !extensions.is_empty() {
            meta.insert("extension".to_string(), Value::Array(extensions));
        }
        let meta = (!meta.is_empty()).then_some(Value::Object(meta));
        return (parse_primitive(node.tag_name().name(), raw), meta);
    }

    let mut obj = Map::new();
    if let Some(id) = node.attribute("id") {
        obj.insert("id".to_string(), Value::String(id.to_string()));
    }
    if let Some(url) = node.attribute("url") {
        // extension/@url
        obj.insert("url".to_string(), Value::String(url.to_string()));
    }

    // Nested resources (contained, Bundle.entry.resource) wrap a single typed element.
    if is_resource_wrapper(node) {
        let children: Vec<Node> = node.children().filter(Node::is_element).collect();
        if let [inner] = children.as_slice() {
            let mut nested = Map::new();
            nested.insert(
                "resourceType".to_string(),
                Value::String(inner.tag_name().name().to_string()),
            );
            if let Some(id) = inner.attribute("id") {
                nested.insert("id".to_string(), Value::String(id.to_string()));
            }
            insert_children(source, *inner, &mut nested);
            return (Value::Object(nested), None);
        }
    }

    insert_children(source, node, &mut obj);
    (Value::Object(obj), None)
}

fn insert_children(source: &str, parent: Node, map: &mut Map<String, Value>) {
    for child in parent.children().filter(Node::is_element) {
        let name = child.tag_name().name();
        let repeats = REPEATING.contains(&name)
            || (REPEATING_COMPLEX.contains(&name) && child.attribute("value").is_none());
        let (value, meta) = element_to_value(source, child);
        insert_property(map, name, value, meta, repeats);
    }
}

fn is_resource_wrapper(node: Node) -> bool {
    matches!(node.tag_name().name(), "contained" | "resource" | "outcome")
        && node
            .children()
            .filter(Node::is_element)
            .all(|c| c.tag_name().name().starts_with(|ch: char| ch.is_ascii_uppercase()))
}

/// Insert `value` under `name`, promoting to an array on repetition and keeping
/// the `_name` metadata entry aligned with the value positions.
fn insert_property(
    map: &mut Map<String, Value>,
    name: &str,
    value: Value,
    meta: Option<Value>,
    repeats: bool,
) {
    let position = match map.get_mut(name) {
        None if repeats => {
            map.insert(name.to_string(), Value::Array(vec![value]));
            0
        }
        None => {
            map.insert(name.to_string(), value);
            0
        }
        Some(Value::Array(items)) => {
            items.push(value);
            items.len() - 1
        }
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
            1
        }
    };

    let meta_key = format!("_{name}");
    if meta.is_none() && !map.contains_key(&meta_key) {
        return;
    }
    let meta = meta.unwrap_or(Value::Null);

    match map.get_mut(&meta_key) {
        None if position == 0 => {
            let meta = if repeats { Value::Array(vec![meta]) } else { meta };
            map.insert(meta_key, meta);
        }
        None => {
            let mut aligned = vec![Value::Null; position];
            aligned.push(meta);
            map.insert(meta_key, Value::Array(aligned));
        }
        Some(Value::Array(items)) if position > 0 => {
            items.resize(position, Value::Null);
            items.push(meta);
        }
        Some(existing) if position > 0 => {
            let first = existing.take();
            let mut aligned = vec![first];
            aligned.resize(position, Value::Null);
            aligned.push(meta);
            *existing = Value::Array(aligned);
        }
        Some(existing) => *existing = meta,
    }
}

/// Type a primitive by the element carrying it; anything not known to be a
/// boolean or number stays a string (`version`, `max`, codes, ids).
fn parse_primitive(name: &str, input: &str) -> Value {
    let typed = if BOOLEAN_ELEMENTS.contains(&name) || name.ends_with("Boolean") {
        input.parse::<bool>().ok().map(Value::Bool)
    } else if INTEGER_ELEMENTS.contains(&name)
        || name.ends_with("Integer")
        || name.ends_with("UnsignedInt")
        || name.ends_with("PositiveInt")
    {
        input.parse::<i64>().ok().map(Value::from)
    } else if name.ends_with("Decimal") {
        input.parse::<serde_json::Number>().ok().map(Value::Number)
    } else {
        None
    };
    typed.unwrap_or_else(|| Value::String(input.to_string()))
}
