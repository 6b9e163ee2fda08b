//! LSF round-trip laws and invariants

use lsforge::formats::lsf::{self, LsfWriteOptions};
use lsforge::tree::{
    AttributeType, AttributeValue, Node, TranslatedFsArgument, TranslatedFsString,
    TranslatedString, Version,
};
use proptest::prelude::*;

fn bg3_version() -> Version {
    Version::new(4, 1, 206, 885)
}

fn dos2_version() -> Version {
    Version::new(3, 6, 9, 36)
}

/// One node exercising every attribute type with boundary values.
fn node_with_all_types(name: &str) -> Node {
    let mut node = Node::new(name);
    node.set_attribute("NoValue", AttributeType::None, AttributeValue::None);
    node.set_attribute("AByte", AttributeType::Byte, AttributeValue::Byte(255));
    node.set_attribute("AShort", AttributeType::Short, AttributeValue::Short(i16::MIN));
    node.set_attribute("AUShort", AttributeType::UShort, AttributeValue::UShort(u16::MAX));
    node.set_attribute("AnInt", AttributeType::Int, AttributeValue::Int(i32::MIN));
    node.set_attribute("AUInt", AttributeType::UInt, AttributeValue::UInt(u32::MAX));
    node.set_attribute("AFloat", AttributeType::Float, AttributeValue::Float(-3.619_99e-6));
    node.set_attribute("ADouble", AttributeType::Double, AttributeValue::Double(0.1));
    node.set_attribute(
        "AnIVec",
        AttributeType::IVec3,
        AttributeValue::IVec(vec![i32::MIN, 0, i32::MAX]),
    );
    node.set_attribute(
        "AVec",
        AttributeType::Vec2,
        AttributeValue::Vec(vec![0.5, -0.25]),
    );
    node.set_attribute(
        "AMat",
        AttributeType::Mat2,
        AttributeValue::Vec(vec![1.0, 0.0, 0.0, 1.0]),
    );
    node.set_attribute("ABool", AttributeType::Bool, AttributeValue::Bool(true));
    node.set_attribute(
        "AString",
        AttributeType::String,
        AttributeValue::String("it's \"quoted\" <&>".into()),
    );
    node.set_attribute(
        "APath",
        AttributeType::Path,
        AttributeValue::String("Public/Game/GUI/icons.lsx".into()),
    );
    node.set_attribute(
        "AFixed",
        AttributeType::FixedString,
        AttributeValue::String(String::new()),
    );
    node.set_attribute(
        "ALs",
        AttributeType::LsString,
        AttributeValue::String("line1\nline2".into()),
    );
    node.set_attribute(
        "AULongLong",
        AttributeType::ULongLong,
        AttributeValue::ULongLong(u64::MAX),
    );
    node.set_attribute(
        "AScratch",
        AttributeType::ScratchBuffer,
        AttributeValue::Buffer(vec![0, 1, 2, 0xFF, 0xAD]),
    );
    node.set_attribute("ALong", AttributeType::Long, AttributeValue::Long(i64::MIN));
    node.set_attribute("AnInt8", AttributeType::Int8, AttributeValue::Int8(-128));
    node.set_attribute(
        "ATranslated",
        AttributeType::TranslatedString,
        AttributeValue::TranslatedString(TranslatedString {
            value: "Hello".into(),
            handle: "h11111111g2222g3333g4444g555555555555".into(),
        }),
    );
    node.set_attribute(
        "AWString",
        AttributeType::WString,
        AttributeValue::String("wide".into()),
    );
    node.set_attribute(
        "ALsWString",
        AttributeType::LsWString,
        AttributeValue::String("wider".into()),
    );
    node.set_attribute(
        "AUuid",
        AttributeType::Uuid,
        AttributeValue::Uuid(uuid::Uuid::parse_str("427baeec-054d-4354-8bbe-f5a8f42a75b0").unwrap()),
    );
    node.set_attribute("AnInt64", AttributeType::Int64, AttributeValue::Long(i64::MAX));
    node.set_attribute(
        "AFsString",
        AttributeType::TranslatedFsString,
        AttributeValue::TranslatedFsString(TranslatedFsString {
            value: "outer".into(),
            handle: "houter".into(),
            version: 0,
            arguments: vec![TranslatedFsArgument {
                key: "Player".into(),
                string: TranslatedFsString {
                    value: "inner".into(),
                    handle: "hinner".into(),
                    version: 0,
                    arguments: Vec::new(),
                },
                value: "Tav".into(),
            }],
        }),
    );
    node
}

fn sample_region() -> Node {
    let mut region = node_with_all_types("Config");
    let mut child = node_with_all_types("Entry");
    child.key = Some("MapKey".into());
    child.add_child(Node::new("Empty"));
    region.add_child(child);
    region.add_child(Node::new("Tail"));
    region
}

#[test]
fn bg3_v6_roundtrip_preserves_tree() {
    let region = sample_region();
    let bytes = lsf::serialize_lsf(&region, bg3_version(), &LsfWriteOptions::default()).unwrap();
    let document = lsf::parse_lsf_bytes(&bytes).unwrap();
    assert_eq!(document.version, bg3_version());
    assert_eq!(document.lsf_version, 6);
    assert_eq!(document.metadata_format, 1);
    assert_eq!(document.root, region);
}

#[test]
fn dos2_v3_roundtrip_preserves_tree() {
    // DOS2 resources have no keys section; drop the key before comparing.
    let mut region = sample_region();
    region.children[0].key = None;

    let bytes = lsf::serialize_lsf(&region, dos2_version(), &LsfWriteOptions::default()).unwrap();
    let document = lsf::parse_lsf_bytes(&bytes).unwrap();
    assert_eq!(document.version, dos2_version());
    assert_eq!(document.lsf_version, 3);
    assert_eq!(document.metadata_format, 0);
    assert_eq!(document.root, region);
}

#[test]
fn v5_and_explicit_formats_roundtrip() {
    let mut region = sample_region();
    region.children[0].key = None;

    for (lsf_version, metadata_format) in [(5u32, 0u32), (5, 1), (6, 0), (3, 1)] {
        let options = LsfWriteOptions {
            lsf_version: Some(lsf_version),
            metadata_format: Some(metadata_format),
        };
        let version = if lsf_version >= 5 { bg3_version() } else { dos2_version() };
        let bytes = lsf::serialize_lsf(&region, version, &options).unwrap();
        let document = lsf::parse_lsf_bytes(&bytes).unwrap();
        assert_eq!(
            document.root, region,
            "lsf v{lsf_version} metadata {metadata_format}"
        );
    }
}

#[test]
fn write_is_a_fixpoint_of_read() {
    // Byte-identical re-serialization is the testable half of the corpus
    // byte-identity law.
    for version in [bg3_version(), dos2_version()] {
        let region = sample_region();
        let first = lsf::serialize_lsf(&region, version, &LsfWriteOptions::default()).unwrap();
        let document = lsf::parse_lsf_bytes(&first).unwrap();
        let second =
            lsf::serialize_lsf(&document.root, document.version, &LsfWriteOptions::default())
                .unwrap();
        assert_eq!(first, second, "engine {}", version.major);
    }
}

#[test]
fn multiple_regions_gain_a_virtual_save_root() {
    let mut save = Node::new("save");
    save.add_child(node_with_all_types("RegionOne"));
    save.add_child(node_with_all_types("RegionTwo"));

    let bytes = lsf::serialize_lsf(&save, bg3_version(), &LsfWriteOptions::default()).unwrap();
    let document = lsf::parse_lsf_bytes(&bytes).unwrap();
    assert_eq!(document.root, save);
}

#[test]
fn magic_and_version_are_validated() {
    let err = lsf::parse_lsf_bytes(b"NOPE\x06\x00\x00\x00rest").unwrap_err();
    assert!(matches!(err, lsforge::Error::Format(_)));

    let region = Node::new("Config");
    let mut bytes =
        lsf::serialize_lsf(&region, bg3_version(), &LsfWriteOptions::default()).unwrap();
    bytes[4] = 9; // unhandled container version
    let err = lsf::parse_lsf_bytes(&bytes).unwrap_err();
    assert!(matches!(
        err,
        lsforge::Error::UnsupportedVersion { version: 9 }
    ));
}

#[test]
fn unknown_metadata_format_is_rejected() {
    let region = Node::new("Config");
    let options = LsfWriteOptions {
        lsf_version: None,
        metadata_format: Some(2),
    };
    let err = lsf::serialize_lsf(&region, bg3_version(), &options).unwrap_err();
    assert!(matches!(err, lsforge::Error::Format(_)));
}

// Property tests over arbitrary trees.

fn arb_scalar() -> impl Strategy<Value = (AttributeType, AttributeValue)> {
    prop_oneof![
        any::<u8>().prop_map(|v| (AttributeType::Byte, AttributeValue::Byte(v))),
        any::<i32>().prop_map(|v| (AttributeType::Int, AttributeValue::Int(v))),
        any::<i64>().prop_map(|v| (AttributeType::Long, AttributeValue::Long(v))),
        any::<u64>().prop_map(|v| (AttributeType::ULongLong, AttributeValue::ULongLong(v))),
        arb_float().prop_map(|v| (AttributeType::Float, AttributeValue::Float(v))),
        any::<bool>().prop_map(|v| (AttributeType::Bool, AttributeValue::Bool(v))),
        "[ -~]{0,16}".prop_map(|s| (AttributeType::FixedString, AttributeValue::String(s))),
        proptest::collection::vec(any::<i32>(), 3)
            .prop_map(|v| (AttributeType::IVec3, AttributeValue::IVec(v))),
        any::<[u8; 16]>().prop_map(|b| {
            (AttributeType::Uuid, AttributeValue::Uuid(uuid::Uuid::from_bytes(b)))
        }),
        proptest::collection::vec(any::<u8>(), 0..24)
            .prop_map(|b| (AttributeType::ScratchBuffer, AttributeValue::Buffer(b))),
    ]
}

/// Exact small-mantissa floats: normal (or zero), and guaranteed to
/// round-trip through their decimal rendering.
fn arb_float() -> impl Strategy<Value = f32> {
    (any::<i16>(), -30..30i32).prop_map(|(m, e)| f32::from(m) * 2f32.powi(e))
}

fn arb_tree() -> impl Strategy<Value = Node> {
    let leaf = ("R[a-z]{1,7}", proptest::collection::vec(arb_scalar(), 0..5)).prop_map(
        |(name, attrs)| {
            let mut node = Node::new(name);
            for (index, (ty, value)) in attrs.into_iter().enumerate() {
                node.set_attribute(format!("attr{index}"), ty, value);
            }
            node
        },
    );
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            "R[a-z]{1,7}",
            proptest::collection::vec(arb_scalar(), 0..5),
            proptest::collection::vec(inner, 0..4),
        )
            .prop_map(|(name, attrs, children)| {
                let mut node = Node::new(name);
                for (index, (ty, value)) in attrs.into_iter().enumerate() {
                    node.set_attribute(format!("attr{index}"), ty, value);
                }
                node.children = children;
                node
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lsf_roundtrip_holds_for_arbitrary_trees(tree in arb_tree()) {
        for version in [bg3_version(), dos2_version()] {
            let bytes = lsf::serialize_lsf(&tree, version, &LsfWriteOptions::default()).unwrap();
            let document = lsf::parse_lsf_bytes(&bytes).unwrap();
            prop_assert_eq!(&document.root, &tree);
            prop_assert_eq!(document.version, version);
        }
    }

    #[test]
    fn lsf_write_read_write_is_byte_stable(tree in arb_tree()) {
        let first = lsf::serialize_lsf(&tree, bg3_version(), &LsfWriteOptions::default()).unwrap();
        let document = lsf::parse_lsf_bytes(&first).unwrap();
        let second = lsf::serialize_lsf(&document.root, document.version, &LsfWriteOptions::default()).unwrap();
        prop_assert_eq!(first, second);
    }
}
