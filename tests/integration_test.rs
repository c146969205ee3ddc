use cxb::archive::{self, ArchiveError, ConvertOptions};
use cxb::block::BlockHeader;
use cxb::codec::{get_codec, CodecId, MAX_CHUNK_SIZE};
use cxb::container::XML_EXTENSION;
use cxb::index::{locate_segments, write_file_info, IndexEntry};
use cxb::manifest::REQUIRED_DOCUMENTS;
use cxb::segment::decode_segment;
use cxb::{decode, decode_with, encode, CxbError, DecodeOptions, Document, FormatError, SegmentHeader, Warning};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Size of the file-info table for `n` documents.
fn table_len(n: usize) -> usize {
    n * 40 + 40
}

#[test]
fn test_two_document_roundtrip() {
    let bytes = encode(&[Document::new("a", "<x/>"), Document::new("b", "<y/>")]).unwrap();
    let out = decode(&bytes).unwrap();
    assert!(out.is_clean(), "{:?}", out.warnings);

    let entries = out.value.into_entries();
    assert_eq!(
        entries,
        vec![
            ("a.xml".to_string(), b"<x/>".to_vec()),
            ("b.xml".to_string(), b"<y/>".to_vec()),
        ]
    );
}

#[test]
fn test_header_bytes_follow_the_table() {
    let bytes = encode(&[Document::new("a", "<x/>")]).unwrap();
    let seg = &bytes[table_len(1)..];
    assert_eq!(&seg[0..4], &5u32.to_le_bytes());
    assert_eq!(&seg[4..12], &[0x33, 0xAA, 0xFB, 0x57, 0x99, 0xFA, 0x04, 0x10]);
    assert_eq!(&seg[12..19], &[0x01, 0x00, 0x02, 0x00, 0x80, 0x00, 0x00]);
    // First block is compressed.
    assert_eq!(seg[19], 1);
}

#[test]
fn test_empty_document() {
    let bytes = encode(&[Document::new("empty", "")]).unwrap();
    let located = locate_segments(&bytes).unwrap().value;
    let seg = decode_segment(&bytes, &located[0]).value;
    assert_eq!(seg.header.map(|h| h.xml_size), Some(1));
    assert_eq!(seg.blocks.len(), 1);
    assert_eq!(seg.blocks[0].header.decoded_size, 1);
    assert!(seg.payload.is_empty());

    let out = decode(&bytes).unwrap();
    assert_eq!(out.value.text("empty.xml").as_deref(), Some(""));
}

#[test]
fn test_block_count_and_sizes() {
    for len in [0usize, 32_767, 32_768, 100_000] {
        let doc: Vec<u8> = (0..len).map(|i| b"<abcdefgh/>"[i % 11]).collect();
        let bytes = encode(&[Document::new("d", doc.clone())]).unwrap();
        let located = locate_segments(&bytes).unwrap().value;
        let seg = decode_segment(&bytes, &located[0]).value;

        let total = len + 1;
        assert_eq!(seg.blocks.len(), total.div_ceil(MAX_CHUNK_SIZE), "len {len}");
        let sum: usize = seg.blocks.iter().map(|b| b.header.decoded_size as usize).sum();
        assert_eq!(sum, total);
        assert_eq!(seg.payload, doc);
    }
}

#[test]
fn test_payload_mutation_is_reported() {
    let doc = "<root>".to_owned() + &"<entry key=\"value\"/>".repeat(20) + "</root>";
    let mut bytes = encode(&[Document::new("m", doc)]).unwrap();
    // table | segment header | block header (13 bytes) | payload
    let payload = table_len(1) + 19 + 13;
    bytes[payload + 2] ^= 0x40;

    let out = decode(&bytes).unwrap();
    assert!(out
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::ChecksumMismatch { segment, block: 0, .. } if segment == "m")));
}

#[test]
fn test_preamble_must_match_magic_count() {
    let docs = [Document::new("a", "<x/>"), Document::new("b", "<y/>")];
    let mut bytes = encode(&docs).unwrap();
    assert_eq!(locate_segments(&bytes).unwrap().value.len(), 2);

    // Blank out the second table entry.
    bytes[40..80].fill(0);
    assert!(matches!(
        decode(&bytes),
        Err(CxbError::Format(FormatError::SegmentCountMismatch { magics: 2, entries: 1 }))
    ));
}

#[test]
fn test_no_magic() {
    assert!(matches!(decode(b"not an archive"), Err(CxbError::Format(FormatError::NoMagic))));
    assert!(matches!(decode(&[]), Err(CxbError::Format(FormatError::NoMagic))));
}

#[test]
fn test_duplicate_names_last_writer_wins() {
    let docs = [
        Document::new("a", "<one/>"),
        Document::new("b", "<two/>"),
        Document::new("a", "<three/>"),
    ];
    let out = decode(&encode(&docs).unwrap()).unwrap().value;
    assert_eq!(out.names().collect::<Vec<_>>(), ["a.xml", "b.xml"]);
    assert_eq!(out.text("a.xml").as_deref(), Some("<three/>"));
}

#[test]
fn test_raw_blocks_from_other_writers() {
    let mut segment = Vec::new();
    SegmentHeader::new(5).write(&mut segment).unwrap();
    BlockHeader::raw(2).write(&mut segment).unwrap();
    segment.extend(b"<r");
    let lzo = get_codec(CodecId::Lzo2a).compress(b"/>\0").unwrap();
    BlockHeader {
        compressed:   true,
        encoded_size: lzo.len() as u32,
        decoded_size: 3,
        checksum:     Some(cxb::block::checksum(&lzo)),
    }
    .write(&mut segment)
    .unwrap();
    segment.extend(&lzo);

    let mut bytes = write_file_info(&[IndexEntry { name: "r".into(), declared_size: segment.len() }]).unwrap();
    bytes.extend(&segment);

    let out = decode(&bytes).unwrap();
    assert!(out.is_clean(), "{:?}", out.warnings);
    assert_eq!(out.value.text("r.xml").as_deref(), Some("<r/>"));
}

#[test]
fn test_strict_decode() {
    let mut bytes = encode(&[Document::new("s", "<s/>")]).unwrap();
    // algo byte of the segment header
    bytes[table_len(1) + 14] = 9;
    assert!(decode(&bytes).unwrap().warnings.iter().any(|w| matches!(w, Warning::HeaderMismatch { .. })));
    assert!(matches!(
        decode_with(&bytes, &DecodeOptions { strict: true }),
        Err(CxbError::Strict { .. })
    ));
}

// ── Filesystem ───────────────────────────────────────────────────────────────

fn write_required_set(dir: &std::path::Path) {
    for name in REQUIRED_DOCUMENTS {
        let body = format!("<{name} id=\"1\">\n  <Value>{}</Value>\n</{name}>", name.len());
        fs::write(dir.join(format!("{name}{XML_EXTENSION}")), body).unwrap();
    }
}

#[test]
fn test_convert_then_export() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_required_set(src.path());
    fs::write(src.path().join("globalparams.xml"), b"\xEF\xBB\xBF<globalparams/>").unwrap();
    fs::write(src.path().join("notes.txt"), "ignored").unwrap();

    let archive_path = out.path().join("gamemodes.cxb");
    let size = archive::convert(src.path(), &archive_path, &ConvertOptions::default()).unwrap();
    assert_eq!(fs::metadata(&archive_path).unwrap().len() as usize, size);

    let listed = archive::inspect(&archive_path).unwrap();
    let names: Vec<_> = listed.value.iter().map(|s| s.name.as_str()).collect();
    let mut expected = REQUIRED_DOCUMENTS.to_vec();
    expected.sort();
    assert_eq!(names, expected);
    assert!(listed.value.iter().all(|s| s.codec == Some("lzo2a")));

    let export_dir = out.path().join("export");
    let written = archive::export(&archive_path, &export_dir, &DecodeOptions::default()).unwrap();
    assert!(written.is_clean());
    assert_eq!(written.value.len(), REQUIRED_DOCUMENTS.len());
    for name in REQUIRED_DOCUMENTS {
        let file = format!("{name}{XML_EXTENSION}");
        assert_eq!(
            fs::read(export_dir.join(&file)).unwrap(),
            fs::read(src.path().join(&file)).unwrap()
        );
    }
}

#[test]
fn test_convert_rejects_incomplete_set() {
    let src = TempDir::new().unwrap();
    write_required_set(src.path());
    fs::remove_file(src.path().join("globalparams.xml")).unwrap();

    let target = src.path().join("out.cxb");
    match archive::convert(src.path(), &target, &ConvertOptions::default()) {
        Err(ArchiveError::Manifest(err)) => assert_eq!(err.missing, ["globalparams"]),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!target.exists());

    let relaxed = ConvertOptions { validate_set: false, ..ConvertOptions::default() };
    archive::convert(src.path(), &target, &relaxed).unwrap();
    assert_eq!(archive::inspect(&target).unwrap().value.len(), REQUIRED_DOCUMENTS.len() - 1);
}

#[test]
fn test_convert_rejects_malformed_xml() {
    let src = TempDir::new().unwrap();
    fs::write(src.path().join("good.xml"), "<a/>").unwrap();
    fs::write(src.path().join("bad.xml"), "<a><b></a>").unwrap();

    let relaxed = ConvertOptions { validate_set: false, ..ConvertOptions::default() };
    let target = src.path().join("out.cxb");
    match archive::convert(src.path(), &target, &relaxed) {
        Err(ArchiveError::Xml { name, .. }) => assert_eq!(name, "bad"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!target.exists());
}

#[test]
fn test_convert_empty_directory() {
    let src = TempDir::new().unwrap();
    let relaxed = ConvertOptions { validate_set: false, ..ConvertOptions::default() };
    assert!(matches!(
        archive::convert(src.path(), src.path().join("out.cxb"), &relaxed),
        Err(ArchiveError::NoDocuments(_))
    ));
}

// ── Properties ───────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_container_roundtrip(
        docs in proptest::collection::btree_map("[a-z_]{1,31}", "[ -~\n\t]{0,3000}", 1..6)
    ) {
        let input: Vec<Document> = docs.iter().map(|(n, d)| Document::new(n.clone(), d.clone())).collect();
        let out = decode(&encode(&input).unwrap()).unwrap();
        prop_assert!(out.is_clean());
        prop_assert_eq!(out.value.len(), docs.len());
        for (name, data) in &docs {
            let key = format!("{name}{XML_EXTENSION}");
            prop_assert_eq!(out.value.get(&key), Some(data.as_bytes()));
        }
    }

    #[test]
    fn prop_lzo2a_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..6000)) {
        let codec = get_codec(CodecId::Lzo2a);
        let packed = codec.compress(&data).unwrap();
        prop_assert_eq!(codec.decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn prop_lzo2a_repetitive_roundtrip(
        unit in proptest::collection::vec(any::<u8>(), 1..40),
        reps in 1usize..600,
    ) {
        let data: Vec<u8> = unit.iter().copied().cycle().take(unit.len() * reps).take(MAX_CHUNK_SIZE).collect();
        let codec = get_codec(CodecId::Lzo2a);
        let packed = codec.compress(&data).unwrap();
        prop_assert_eq!(codec.decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn prop_decoder_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = get_codec(CodecId::Lzo2a).decompress(&data, MAX_CHUNK_SIZE);
        let _ = decode(&data);
    }
}
