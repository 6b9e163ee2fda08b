//! LSX document writing
//!
//! The output is byte-significant: UTF-8 BOM, CRLF line endings, tab
//! indentation, ` />` self-closing tags, and escaping that covers
//! `& < > "` but deliberately not the apostrophe. The text is assembled by
//! hand because XML writer libraries make different choices on exactly
//! these points.
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

use super::float::{format_double, format_float};
use crate::error::{Error, Result};
use crate::tree::{
    Attribute, AttributeType, AttributeValue, Node, TranslatedFsString, Version,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::Path;

/// Options for [`serialize_lsx`].
#[derive(Debug, Clone, Default)]
pub struct LsxWriteOptions {
    /// Emit numeric type ids instead of type names; defaults to true for
    /// DOS2 engine versions (`major < 4`).
    pub numeric_types: Option<bool>,
    /// `lslib_meta` marker on the version element; defaults to
    /// `v1,bswap_guids`.
    pub lslib_meta: Option<String>,
}

/// Write a tree to disk as an LSX document.
///
/// # Errors
/// Returns an error if serialization or file writing fails.
pub fn write_lsx<P: AsRef<Path>>(
    path: P,
    root: &Node,
    version: Version,
    options: &LsxWriteOptions,
) -> Result<()> {
    let xml = serialize_lsx(root, version, options)?;
    std::fs::write(path, xml)?;
    Ok(())
}

/// Serialize a tree to LSX text (including the BOM).
///
/// # Errors
/// Returns an error if an attribute value does not match its type tag.
pub fn serialize_lsx(root: &Node, version: Version, options: &LsxWriteOptions) -> Result<String> {
    let numeric_types = options.numeric_types.unwrap_or(version.major < 4);
    let lslib_meta = options.lslib_meta.as_deref().unwrap_or("v1,bswap_guids");

    let mut out = String::new();
    out.push('\u{FEFF}');
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n");
    out.push_str("<save>\r\n");
    out.push_str(&format!(
        "\t<version major=\"{}\" minor=\"{}\" revision=\"{}\" build=\"{}\" lslib_meta=\"{}\" />\r\n",
        version.major,
        version.minor,
        version.revision,
        version.build,
        escape_attr(lslib_meta),
    ));

    let regions: Vec<&Node> = if root.name == "save" && root.attributes.is_empty() {
        root.children.iter().collect()
    } else {
        vec![root]
    };

    for region in regions {
        out.push_str(&format!("\t<region id=\"{}\">\r\n", escape_attr(&region.name)));
        write_node(&mut out, region, 2, numeric_types)?;
        out.push_str("\t</region>\r\n");
    }

    out.push_str("</save>");
    Ok(out)
}

fn write_node(out: &mut String, node: &Node, indent: usize, numeric_types: bool) -> Result<()> {
    let pad = "\t".repeat(indent);

    let mut open = format!("{pad}<node id=\"{}\"", escape_attr(&node.name));
    if let Some(key) = &node.key {
        open.push_str(&format!(" key=\"{}\"", escape_attr(key)));
    }

    // Empty nodes self-close.
    if node.attributes.is_empty() && node.children.is_empty() {
        out.push_str(&open);
        out.push_str(" />\r\n");
        return Ok(());
    }

    out.push_str(&open);
    out.push_str(">\r\n");

    for (name, attribute) in &node.attributes {
        write_attribute(out, name, attribute, indent + 1, numeric_types)?;
    }

    if !node.children.is_empty() {
        out.push_str(&format!("{pad}\t<children>\r\n"));
        for child in &node.children {
            write_node(out, child, indent + 2, numeric_types)?;
        }
        out.push_str(&format!("{pad}\t</children>\r\n"));
    }

    out.push_str(&format!("{pad}</node>\r\n"));
    Ok(())
}

fn write_attribute(
    out: &mut String,
    name: &str,
    attribute: &Attribute,
    indent: usize,
    numeric_types: bool,
) -> Result<()> {
    let pad = "\t".repeat(indent);
    let type_token = if numeric_types {
        attribute.ty.id().to_string()
    } else {
        attribute.ty.name().to_string()
    };

    match (&attribute.ty, &attribute.value) {
        (AttributeType::TranslatedString, AttributeValue::TranslatedString(ts)) => {
            out.push_str(&format!(
                "{pad}<attribute id=\"{}\" type=\"{type_token}\" handle=\"{}\" value=\"{}\" />\r\n",
                escape_attr(name),
                escape_attr(&ts.handle),
                escape_attr(&ts.value),
            ));
        }
        (AttributeType::TranslatedFsString, AttributeValue::TranslatedFsString(fs)) => {
            let open = format!(
                "{pad}<attribute id=\"{}\" type=\"{type_token}\" value=\"{}\" handle=\"{}\" arguments=\"{}\"",
                escape_attr(name),
                escape_attr(&fs.value),
                escape_attr(&fs.handle),
                fs.arguments.len(),
            );
            if fs.arguments.is_empty() {
                out.push_str(&open);
                out.push_str(" />\r\n");
            } else {
                out.push_str(&open);
                out.push_str(">\r\n");
                write_arguments(out, fs, indent + 1);
                out.push_str(&format!("{pad}</attribute>\r\n"));
            }
        }
        _ => {
            out.push_str(&format!(
                "{pad}<attribute id=\"{}\" type=\"{type_token}\" value=\"{}\" />\r\n",
                escape_attr(name),
                escape_attr(&value_text(attribute.ty, &attribute.value)?),
            ));
        }
    }
    Ok(())
}

fn write_arguments(out: &mut String, fs: &TranslatedFsString, indent: usize) {
    let pad = "\t".repeat(indent);
    out.push_str(&format!("{pad}<arguments>\r\n"));
    for argument in &fs.arguments {
        out.push_str(&format!(
            "{pad}\t<argument key=\"{}\" value=\"{}\">\r\n",
            escape_attr(&argument.key),
            escape_attr(&argument.value),
        ));
        let string = &argument.string;
        let open = format!(
            "{pad}\t\t<string value=\"{}\" handle=\"{}\" arguments=\"{}\"",
            escape_attr(&string.value),
            escape_attr(&string.handle),
            string.arguments.len(),
        );
        if string.arguments.is_empty() {
            out.push_str(&open);
            out.push_str(" />\r\n");
        } else {
            out.push_str(&open);
            out.push_str(">\r\n");
            write_arguments(out, string, indent + 3);
            out.push_str(&format!("{pad}\t\t</string>\r\n"));
        }
        out.push_str(&format!("{pad}\t</argument>\r\n"));
    }
    out.push_str(&format!("{pad}</arguments>\r\n"));
}

/// Text form of a plain (non-translated) attribute value.
fn value_text(ty: AttributeType, value: &AttributeValue) -> Result<String> {
    Ok(match value {
        // Covers the string family and the reader's raw-hex fallback.
        AttributeValue::String(s) => s.clone(),
        AttributeValue::None => String::new(),
        AttributeValue::Byte(v) => v.to_string(),
        AttributeValue::Int8(v) => v.to_string(),
        AttributeValue::Short(v) => v.to_string(),
        AttributeValue::UShort(v) => v.to_string(),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::UInt(v) => v.to_string(),
        AttributeValue::ULongLong(v) => v.to_string(),
        AttributeValue::Long(v) => v.to_string(),
        AttributeValue::Float(v) => format_float(*v),
        AttributeValue::Double(v) => format_double(*v),
        AttributeValue::Bool(v) => if *v { "True" } else { "False" }.to_string(),
        AttributeValue::IVec(elements) => elements
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" "),
        AttributeValue::Vec(elements) => elements
            .iter()
            .map(|&v| format_float(v))
            .collect::<Vec<_>>()
            .join(" "),
        AttributeValue::Uuid(uuid) => uuid.to_string(),
        AttributeValue::Buffer(bytes) => BASE64.encode(bytes),
        AttributeValue::TranslatedString(_) | AttributeValue::TranslatedFsString(_) => {
            return Err(Error::Format(format!(
                "translated value under plain attribute type {}",
                ty.name()
            )));
        }
    })
}

/// Escape `& < > "`; the apostrophe stays verbatim to match LSLib's
/// output.
fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apostrophe_is_not_escaped() {
        assert_eq!(escape_attr("it's \"x\" <y>"), "it's &quot;x&quot; &lt;y&gt;");
    }

    #[test]
    fn empty_node_self_closes() {
        let mut region = Node::new("Config");
        region.add_child(Node::new("Empty"));
        let xml = serialize_lsx(&region, Version::new(4, 0, 9, 331), &LsxWriteOptions::default())
            .unwrap();
        assert!(xml.contains("<node id=\"Empty\" />\r\n"));
        assert!(!xml.contains("<node id=\"Empty\"></node>"));
    }

    #[test]
    fn output_uses_bom_crlf_and_tabs() {
        let region = Node::new("Config");
        let xml = serialize_lsx(&region, Version::new(4, 0, 9, 331), &LsxWriteOptions::default())
            .unwrap();
        assert!(xml.starts_with("\u{FEFF}<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n"));
        assert!(xml.contains("\t<version major=\"4\" minor=\"0\" revision=\"9\" build=\"331\" lslib_meta=\"v1,bswap_guids\" />\r\n"));
        assert!(xml.ends_with("</save>"));
    }

    #[test]
    fn dos2_defaults_to_numeric_types() {
        let mut region = Node::new("Config");
        region.set_attribute("Name", AttributeType::FixedString, AttributeValue::String("x".into()));
        let xml = serialize_lsx(&region, Version::new(3, 6, 9, 36), &LsxWriteOptions::default())
            .unwrap();
        assert!(xml.contains("type=\"22\""));
    }
}
