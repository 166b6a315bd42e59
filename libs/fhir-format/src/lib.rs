//! Permissive parsing of FHIR documents into schema-agnostic JSON values.
//!
//! Both serializations end up as the FHIR JSON shape (`serde_json::Value`):
//! - JSON is read as-is after stripping a UTF-8 BOM and stray control characters.
//! - XML is mapped with the official JSON/XML rules (see [`xml`]).
//!
//! Parsing never looks at a schema, so unknown members and unrecognized code
//! values always pass. A document only fails when its bytes are malformed or
//! its top level is not an object.

pub mod xml;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("expected a JSON object for the resource")]
    ExpectedObject,
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Serialization of a FHIR document, derived from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceFormat {
    Json,
    Xml,
}

impl ResourceFormat {
    /// Detect the format from the extension of an archive entry or file path.
    ///
    /// Matching is case-insensitive; anything other than `.json` and `.xml`
    /// yields `None`.
    pub fn from_path(path: &str) -> Option<Self> {
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let (_, extension) = file_name.rsplit_once('.')?;
        if extension.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if extension.eq_ignore_ascii_case("xml") {
            Some(Self::Xml)
        } else {
            None
        }
    }
}

/// Byte-level parser for FHIR resources.
///
/// Implementations must report malformed input as an error rather than
/// returning a partially built value.
pub trait ResourceParser: Send + Sync {
    fn parse(&self, format: ResourceFormat, bytes: &[u8]) -> Result<Value, FormatError>;
}

/// Default [`ResourceParser`] accepting any well-formed FHIR JSON or XML resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct FhirParser;

impl ResourceParser for FhirParser {
    fn parse(&self, format: ResourceFormat, bytes: &[u8]) -> Result<Value, FormatError> {
        let value = match format {
            ResourceFormat::Json => parse_json(bytes)?,
            ResourceFormat::Xml => parse_xml(bytes)?,
        };

        if value.is_object() {
            Ok(value)
        } else {
            Err(FormatError::ExpectedObject)
        }
    }
}

/// Parse FHIR JSON bytes into a value.
pub fn parse_json(bytes: &[u8]) -> Result<Value, FormatError> {
    let text = clean_text(bytes)?;
    Ok(serde_json::from_str(&text)?)
}

/// Parse FHIR XML bytes into the equivalent FHIR JSON value.
pub fn parse_xml(bytes: &[u8]) -> Result<Value, FormatError> {
    let text = std::str::from_utf8(strip_bom(bytes))?;
    xml::xml_to_value(text)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// Decode UTF-8 and drop control characters that third-party packages
/// occasionally leave inside string literals.
fn clean_text(bytes: &[u8]) -> Result<String, FormatError> {
    let content = std::str::from_utf8(strip_bom(bytes))?;
    Ok(content
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\x7F'))
        .collect::<String>()
        .trim()
        .to_string())
}
