//! LSX document reading
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

use super::LsxDocument;
use crate::error::{Error, Result};
use crate::tree::{
    AttributeType, AttributeValue, Node, TranslatedFsArgument, TranslatedFsString,
    TranslatedString, Version,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;

/// Read an LSX document from disk.
///
/// # Errors
/// Returns an error if the file cannot be read or has invalid XML.
pub fn read_lsx<P: AsRef<Path>>(path: P) -> Result<LsxDocument> {
    let content = std::fs::read_to_string(path)?;
    parse_lsx(&content)
}

/// Parse an LSX document from text. A leading BOM is tolerated.
///
/// # Errors
/// Returns an error if the XML is malformed or the `save`/`region`
/// structure is missing.
pub fn parse_lsx(content: &str) -> Result<LsxDocument> {
    let content = content.strip_prefix('\u{FEFF}').unwrap_or(content);
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut parser = LsxParser::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.on_start(&e)?,
            Ok(Event::Empty(e)) => parser.on_empty(&e)?,
            Ok(Event::End(e)) => parser.on_end(e.name().as_ref())?,
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    parser.finish()
}

#[derive(Default)]
struct LsxParser {
    version: Option<Version>,
    saw_save: bool,
    regions: Vec<(String, Vec<Node>)>,
    node_stack: Vec<Node>,
    /// Attribute id/type while a TranslatedFSString attribute is open.
    open_translated: Option<(String, AttributeType)>,
    translated_stack: Vec<TranslatedFsString>,
    argument_stack: Vec<TranslatedFsArgument>,
}

impl LsxParser {
    fn on_start(&mut self, e: &BytesStart) -> Result<()> {
        match e.name().as_ref() {
            b"save" => self.saw_save = true,
            b"version" => self.read_version(e)?,
            b"region" => {
                let id = find_attr(e, b"id")?.unwrap_or_default();
                self.regions.push((id, Vec::new()));
            }
            b"node" => {
                let mut node = Node::new(find_attr(e, b"id")?.unwrap_or_default());
                node.key = find_attr(e, b"key")?;
                self.node_stack.push(node);
            }
            b"attribute" => self.read_attribute(e, true)?,
            b"argument" => {
                self.argument_stack.push(TranslatedFsArgument {
                    key: find_attr(e, b"key")?.unwrap_or_default(),
                    string: TranslatedFsString::default(),
                    value: find_attr(e, b"value")?.unwrap_or_default(),
                });
            }
            b"string" => {
                self.translated_stack.push(TranslatedFsString {
                    value: find_attr(e, b"value")?.unwrap_or_default(),
                    handle: find_attr(e, b"handle")?.unwrap_or_default(),
                    version: 0,
                    arguments: Vec::new(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn on_empty(&mut self, e: &BytesStart) -> Result<()> {
        match e.name().as_ref() {
            b"version" => self.read_version(e)?,
            b"node" => {
                let mut node = Node::new(find_attr(e, b"id")?.unwrap_or_default());
                node.key = find_attr(e, b"key")?;
                self.attach_node(node);
            }
            b"attribute" => self.read_attribute(e, false)?,
            b"argument" => {
                let argument = TranslatedFsArgument {
                    key: find_attr(e, b"key")?.unwrap_or_default(),
                    string: TranslatedFsString::default(),
                    value: find_attr(e, b"value")?.unwrap_or_default(),
                };
                self.push_argument(argument)?;
            }
            b"string" => {
                let string = TranslatedFsString {
                    value: find_attr(e, b"value")?.unwrap_or_default(),
                    handle: find_attr(e, b"handle")?.unwrap_or_default(),
                    version: 0,
                    arguments: Vec::new(),
                };
                let argument = self
                    .argument_stack
                    .last_mut()
                    .ok_or_else(|| Error::Format("<string> outside <argument>".into()))?;
                argument.string = string;
            }
            _ => {}
        }
        Ok(())
    }

    fn on_end(&mut self, name: &[u8]) -> Result<()> {
        match name {
            b"node" => {
                let node = self
                    .node_stack
                    .pop()
                    .ok_or_else(|| Error::Format("unbalanced <node>".into()))?;
                self.attach_node(node);
            }
            b"attribute" => {
                if let Some((id, ty)) = self.open_translated.take() {
                    let fs = self
                        .translated_stack
                        .pop()
                        .ok_or_else(|| Error::Format("unbalanced <attribute>".into()))?;
                    let node = self
                        .node_stack
                        .last_mut()
                        .ok_or_else(|| Error::Format("<attribute> outside <node>".into()))?;
                    node.set_attribute(id, ty, AttributeValue::TranslatedFsString(fs));
                }
            }
            b"argument" => {
                let argument = self
                    .argument_stack
                    .pop()
                    .ok_or_else(|| Error::Format("unbalanced <argument>".into()))?;
                self.push_argument(argument)?;
            }
            b"string" => {
                let string = self
                    .translated_stack
                    .pop()
                    .ok_or_else(|| Error::Format("unbalanced <string>".into()))?;
                let argument = self
                    .argument_stack
                    .last_mut()
                    .ok_or_else(|| Error::Format("</string> outside <argument>".into()))?;
                argument.string = string;
            }
            _ => {}
        }
        Ok(())
    }

    fn push_argument(&mut self, argument: TranslatedFsArgument) -> Result<()> {
        let parent = self
            .translated_stack
            .last_mut()
            .ok_or_else(|| Error::Format("<argument> outside a translated string".into()))?;
        parent.arguments.push(argument);
        Ok(())
    }

    fn read_version(&mut self, e: &BytesStart) -> Result<()> {
        let mut version = Version::new(4, 0, 0, 0);
        for attr in e.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?;
            match attr.key.as_ref() {
                b"major" => version.major = value.parse().unwrap_or(4),
                b"minor" => version.minor = value.parse().unwrap_or(0),
                b"revision" => version.revision = value.parse().unwrap_or(0),
                b"build" => version.build = value.parse().unwrap_or(0),
                // lslib_meta is informational
                _ => {}
            }
        }
        self.version = Some(version);
        Ok(())
    }

    fn read_attribute(&mut self, e: &BytesStart, has_body: bool) -> Result<()> {
        let id = find_attr(e, b"id")?.unwrap_or_default();
        let type_token = find_attr(e, b"type")?.unwrap_or_default();
        let ty = parse_type_token(&type_token);
        let value = find_attr(e, b"value")?.unwrap_or_default();
        let handle = find_attr(e, b"handle")?;

        match ty {
            AttributeType::TranslatedString => {
                let node = self
                    .node_stack
                    .last_mut()
                    .ok_or_else(|| Error::Format("<attribute> outside <node>".into()))?;
                node.set_attribute(
                    id,
                    ty,
                    AttributeValue::TranslatedString(TranslatedString {
                        value,
                        handle: handle.unwrap_or_default(),
                    }),
                );
            }
            AttributeType::TranslatedFsString => {
                let fs = TranslatedFsString {
                    value,
                    handle: handle.unwrap_or_default(),
                    version: 0,
                    arguments: Vec::new(),
                };
                if has_body {
                    self.open_translated = Some((id, ty));
                    self.translated_stack.push(fs);
                } else {
                    let node = self
                        .node_stack
                        .last_mut()
                        .ok_or_else(|| Error::Format("<attribute> outside <node>".into()))?;
                    node.set_attribute(id, ty, AttributeValue::TranslatedFsString(fs));
                }
            }
            _ => {
                let node = self
                    .node_stack
                    .last_mut()
                    .ok_or_else(|| Error::Format("<attribute> outside <node>".into()))?;
                node.set_attribute(id, ty, parse_plain_value(ty, &value));
            }
        }
        Ok(())
    }

    fn attach_node(&mut self, node: Node) {
        if let Some(parent) = self.node_stack.last_mut() {
            parent.children.push(node);
        } else if let Some((_, nodes)) = self.regions.last_mut() {
            nodes.push(node);
        }
    }

    fn finish(self) -> Result<LsxDocument> {
        if !self.saw_save {
            return Err(Error::Format("missing <save> element".into()));
        }

        let mut roots = Vec::new();
        for (id, mut nodes) in self.regions {
            if nodes.is_empty() {
                return Err(Error::Format(format!("region '{id}' has no root node")));
            }
            let mut node = nodes.remove(0);
            // A bare wrapper around a single equally-named child is
            // collapsed to avoid duplicated levels.
            if node.attributes.is_empty()
                && node.children.len() == 1
                && node.children[0].name == id
            {
                node = node.children.remove(0);
            }
            roots.push(node);
        }

        let root = match roots.len() {
            0 => return Err(Error::Format("document has no regions".into())),
            1 => roots.remove(0),
            _ => {
                let mut save = Node::new("save");
                save.children = roots;
                save
            }
        };

        Ok(LsxDocument {
            root,
            version: self.version.unwrap_or(Version::new(4, 0, 0, 0)),
        })
    }
}

fn find_attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Resolve a `type` token: numeric 0..33 or a type name. Anything unknown
/// maps to String.
fn parse_type_token(token: &str) -> AttributeType {
    if let Ok(id) = token.parse::<u32>() {
        return AttributeType::from_id(id).unwrap_or(AttributeType::String);
    }
    AttributeType::from_name(token).unwrap_or(AttributeType::String)
}

fn parse_plain_value(ty: AttributeType, text: &str) -> AttributeValue {
    use AttributeType as T;
    match ty {
        T::None => AttributeValue::None,
        T::Byte => AttributeValue::Byte(text.parse().unwrap_or(0)),
        T::Int8 => AttributeValue::Int8(text.parse().unwrap_or(0)),
        T::Short => AttributeValue::Short(text.parse().unwrap_or(0)),
        T::UShort => AttributeValue::UShort(text.parse().unwrap_or(0)),
        T::Int => AttributeValue::Int(text.parse().unwrap_or(0)),
        T::UInt => AttributeValue::UInt(text.parse().unwrap_or(0)),
        T::ULongLong => AttributeValue::ULongLong(text.parse().unwrap_or(0)),
        T::Long | T::Int64 => AttributeValue::Long(text.parse().unwrap_or(0)),
        T::Float => AttributeValue::Float(text.parse().unwrap_or(0.0)),
        T::Double => AttributeValue::Double(text.parse().unwrap_or(0.0)),
        T::Bool => AttributeValue::Bool(matches!(text, "True" | "true" | "1")),
        T::IVec2 | T::IVec3 | T::IVec4 => AttributeValue::IVec(
            text.split_whitespace()
                .map(|t| t.parse().unwrap_or(0))
                .collect(),
        ),
        T::Vec2 | T::Vec3 | T::Vec4 | T::Mat2 | T::Mat3 | T::Mat3x4 | T::Mat4x3 | T::Mat4 => {
            AttributeValue::Vec(
                text.split_whitespace()
                    .map(|t| t.parse().unwrap_or(0.0))
                    .collect(),
            )
        }
        T::String | T::Path | T::FixedString | T::LsString | T::WString | T::LsWString => {
            AttributeValue::String(text.to_string())
        }
        T::Uuid => AttributeValue::Uuid(uuid::Uuid::parse_str(text).unwrap_or_default()),
        T::ScratchBuffer => AttributeValue::Buffer(BASE64.decode(text).unwrap_or_default()),
        // Handled by the caller.
        T::TranslatedString | T::TranslatedFsString => AttributeValue::None,
    }
}
