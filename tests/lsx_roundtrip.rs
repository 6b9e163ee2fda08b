//! LSX round-trip laws and byte-level boundary scenarios

use lsforge::formats::lsf::{self, LsfWriteOptions};
use lsforge::formats::lsx::{self, LsxWriteOptions};
use lsforge::tree::{
    AttributeType, AttributeValue, Node, TranslatedFsArgument, TranslatedFsString,
    TranslatedString, Version,
};

fn bg3_version() -> Version {
    Version::new(4, 1, 206, 885)
}

fn sample_region() -> Node {
    let mut region = Node::new("Config");
    region.set_attribute(
        "Name",
        AttributeType::FixedString,
        AttributeValue::String("it's a \"test\"".into()),
    );
    region.set_attribute("Level", AttributeType::Int, AttributeValue::Int(-7));
    region.set_attribute("Scale", AttributeType::Float, AttributeValue::Float(0.1));
    region.set_attribute(
        "Position",
        AttributeType::Vec3,
        AttributeValue::Vec(vec![1.0, -2.5, 0.125]),
    );
    region.set_attribute(
        "Id",
        AttributeType::Uuid,
        AttributeValue::Uuid(uuid::Uuid::parse_str("427baeec-054d-4354-8bbe-f5a8f42a75b0").unwrap()),
    );
    region.set_attribute(
        "Blob",
        AttributeType::ScratchBuffer,
        AttributeValue::Buffer(vec![1, 2, 3, 250]),
    );
    region.set_attribute(
        "Title",
        AttributeType::TranslatedString,
        AttributeValue::TranslatedString(TranslatedString {
            value: "Hello".into(),
            handle: "h12345678gabcdgefghg0000g111111111111".into(),
        }),
    );

    let mut keyed = Node::new("Entry");
    keyed.key = Some("MapKey".into());
    keyed.set_attribute("On", AttributeType::Bool, AttributeValue::Bool(false));
    keyed.add_child(Node::new("Empty"));
    region.add_child(keyed);
    region
}

#[test]
fn lsx_roundtrip_preserves_tree() {
    let region = sample_region();
    let xml = lsx::serialize_lsx(&region, bg3_version(), &LsxWriteOptions::default()).unwrap();
    let document = lsx::parse_lsx(&xml).unwrap();
    assert_eq!(document.version, bg3_version());
    assert_eq!(document.root, region);
}

#[test]
fn lsx_roundtrip_with_numeric_types() {
    let region = sample_region();
    let version = Version::new(3, 6, 9, 36);
    let xml = lsx::serialize_lsx(&region, version, &LsxWriteOptions::default()).unwrap();
    assert!(xml.contains("type=\"22\""), "DOS2 output uses numeric ids");
    let document = lsx::parse_lsx(&xml).unwrap();
    assert_eq!(document.root, region);
}

#[test]
fn multiple_regions_roundtrip() {
    let mut save = Node::new("save");
    save.add_child(sample_region());
    let mut second = Node::new("Timeline");
    second.set_attribute("Time", AttributeType::Double, AttributeValue::Double(12.5));
    save.add_child(second);

    let xml = lsx::serialize_lsx(&save, bg3_version(), &LsxWriteOptions::default()).unwrap();
    let document = lsx::parse_lsx(&xml).unwrap();
    assert_eq!(document.root, save);
}

#[test]
fn float_boundary_tokens() {
    let mut region = Node::new("Floats");
    let tiny: f32 = "-3.61999E-06".parse().unwrap();
    region.set_attribute("Tiny", AttributeType::Float, AttributeValue::Float(tiny));
    region.set_attribute("Tenth", AttributeType::Float, AttributeValue::Float(0.1));

    let xml = lsx::serialize_lsx(&region, bg3_version(), &LsxWriteOptions::default()).unwrap();
    assert!(xml.contains("value=\"-3.61999E-06\""), "{xml}");
    assert!(xml.contains("value=\"0.1\""), "{xml}");
}

#[test]
fn uuid_is_reemitted_canonically() {
    let region = sample_region();
    let xml = lsx::serialize_lsx(&region, bg3_version(), &LsxWriteOptions::default()).unwrap();
    assert!(xml.contains("value=\"427baeec-054d-4354-8bbe-f5a8f42a75b0\""));
    assert!(xml.contains("lslib_meta=\"v1,bswap_guids\""));
}

#[test]
fn apostrophe_stays_verbatim_quote_is_escaped() {
    let region = sample_region();
    let xml = lsx::serialize_lsx(&region, bg3_version(), &LsxWriteOptions::default()).unwrap();
    assert!(xml.contains("value=\"it's a &quot;test&quot;\""));
    assert!(!xml.contains("&apos;"));
}

#[test]
fn empty_node_is_self_closing() {
    let region = sample_region();
    let xml = lsx::serialize_lsx(&region, bg3_version(), &LsxWriteOptions::default()).unwrap();
    assert!(xml.contains("<node id=\"Empty\" />"));
    assert!(!xml.contains("<node id=\"Empty\"></node>"));
}

#[test]
fn keyed_node_roundtrips() {
    let region = sample_region();
    let xml = lsx::serialize_lsx(&region, bg3_version(), &LsxWriteOptions::default()).unwrap();
    assert!(xml.contains("<node id=\"Entry\" key=\"MapKey\">"));
    let document = lsx::parse_lsx(&xml).unwrap();
    assert_eq!(document.root.children[0].key.as_deref(), Some("MapKey"));
}

fn nested_fs_string() -> TranslatedFsString {
    TranslatedFsString {
        value: "outer".into(),
        handle: "houter".into(),
        version: 0,
        arguments: vec![TranslatedFsArgument {
            key: "Player".into(),
            string: TranslatedFsString {
                value: "middle".into(),
                handle: "hmiddle".into(),
                version: 0,
                arguments: vec![TranslatedFsArgument {
                    key: "Pronoun".into(),
                    string: TranslatedFsString {
                        value: "they".into(),
                        handle: "hinner".into(),
                        version: 0,
                        arguments: Vec::new(),
                    },
                    value: "them".into(),
                }],
            },
            value: "Tav".into(),
        }],
    }
}

#[test]
fn translated_fs_string_arguments_count_is_emitted() {
    let mut region = Node::new("Loca");
    region.set_attribute(
        "Text",
        AttributeType::TranslatedFsString,
        AttributeValue::TranslatedFsString(nested_fs_string()),
    );
    region.set_attribute(
        "Plain",
        AttributeType::TranslatedFsString,
        AttributeValue::TranslatedFsString(TranslatedFsString::default()),
    );

    let xml = lsx::serialize_lsx(&region, bg3_version(), &LsxWriteOptions::default()).unwrap();
    // Outer level advertises one argument, the nested <string> advertises
    // its own; an argument-less attribute self-closes.
    assert!(xml.contains("arguments=\"1\">"));
    assert!(xml.contains("<string value=\"middle\" handle=\"hmiddle\" arguments=\"1\">"));
    assert!(xml.contains("arguments=\"0\" />"));

    let document = lsx::parse_lsx(&xml).unwrap();
    assert_eq!(document.root, region);
}

#[test]
fn two_level_fs_string_survives_lsf_lsx_lsf_with_byte_identity() {
    let mut region = Node::new("Loca");
    region.set_attribute(
        "Text",
        AttributeType::TranslatedFsString,
        AttributeValue::TranslatedFsString(nested_fs_string()),
    );

    let first = lsf::serialize_lsf(&region, bg3_version(), &LsfWriteOptions::default()).unwrap();
    let from_lsf = lsf::parse_lsf_bytes(&first).unwrap();
    let xml =
        lsx::serialize_lsx(&from_lsf.root, from_lsf.version, &LsxWriteOptions::default()).unwrap();
    let from_lsx = lsx::parse_lsx(&xml).unwrap();
    let second =
        lsf::serialize_lsf(&from_lsx.root, from_lsx.version, &LsfWriteOptions::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn region_wrapper_collapse() {
    // A bare region wrapper around a single equally-named node collapses.
    let xml = "\u{FEFF}<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n<save>\r\n\
        \t<version major=\"4\" minor=\"1\" revision=\"206\" build=\"885\" />\r\n\
        \t<region id=\"Config\">\r\n\
        \t\t<node id=\"Config\">\r\n\
        \t\t\t<children>\r\n\
        \t\t\t\t<node id=\"Config\">\r\n\
        \t\t\t\t\t<attribute id=\"X\" type=\"Int\" value=\"3\" />\r\n\
        \t\t\t\t</node>\r\n\
        \t\t\t</children>\r\n\
        \t\t</node>\r\n\
        \t</region>\r\n</save>";
    let document = lsx::parse_lsx(xml).unwrap();
    assert_eq!(document.root.name, "Config");
    assert_eq!(
        document.root.attribute("X").unwrap().value,
        AttributeValue::Int(3)
    );
    assert!(document.root.children.is_empty());
}

#[test]
fn lenient_scalar_parsing() {
    let xml = "<save><version major=\"4\" /><region id=\"R\"><node id=\"R\">\
        <attribute id=\"A\" type=\"Int\" value=\"notanumber\" />\
        <attribute id=\"B\" type=\"Bool\" value=\"1\" />\
        <attribute id=\"C\" type=\"Bool\" value=\"yes\" />\
        <attribute id=\"D\" type=\"SomethingNew\" value=\"kept\" />\
        </node></region></save>";
    let document = lsx::parse_lsx(xml).unwrap();
    let root = &document.root;
    assert_eq!(root.attribute("A").unwrap().value, AttributeValue::Int(0));
    assert_eq!(root.attribute("B").unwrap().value, AttributeValue::Bool(true));
    assert_eq!(root.attribute("C").unwrap().value, AttributeValue::Bool(false));
    // Unknown type names map to String.
    assert_eq!(root.attribute("D").unwrap().ty, AttributeType::String);
    assert_eq!(document.version, Version::new(4, 0, 0, 0));
}

#[test]
fn missing_save_is_an_error() {
    let err = lsx::parse_lsx("<region id=\"R\"><node id=\"R\" /></region>").unwrap_err();
    assert!(matches!(err, lsforge::Error::Format(_)));
}

#[test]
fn output_shape_matches_lslib() {
    let mut region = Node::new("Config");
    region.set_attribute("X", AttributeType::Int, AttributeValue::Int(1));
    let xml = lsx::serialize_lsx(&region, bg3_version(), &LsxWriteOptions::default()).unwrap();
    let expected = "\u{FEFF}<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n\
        <save>\r\n\
        \t<version major=\"4\" minor=\"1\" revision=\"206\" build=\"885\" lslib_meta=\"v1,bswap_guids\" />\r\n\
        \t<region id=\"Config\">\r\n\
        \t\t<node id=\"Config\">\r\n\
        \t\t\t<attribute id=\"X\" type=\"Int\" value=\"1\" />\r\n\
        \t\t</node>\r\n\
        \t</region>\r\n\
        </save>";
    assert_eq!(xml, expected);
}
