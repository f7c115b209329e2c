use plist_core::{
    convert_file, detect_format, from_bytes, from_file, save_as_ascii, save_as_binary,
    save_as_xml, to_bytes, Dialect, Dictionary, Format, OutputFormat, PlistError, Value,
};

fn sample() -> Value {
    let mut dict = Dictionary::new();
    dict.insert("name".to_string(), Value::from("Widget"));
    dict.insert("count".to_string(), Value::from(3));
    dict.insert(
        "sizes".to_string(),
        Value::Array(vec![Value::from(1.5), Value::from(2.5)]),
    );
    Value::Dictionary(dict)
}

// ============================================================================
// Detection
// ============================================================================

#[test]
fn detect_binary() {
    assert_eq!(detect_format(b"bplist00rest").unwrap(), Format::Binary);
}

#[test]
fn detect_xml() {
    assert_eq!(detect_format(b"<?xml version=\"1.0\"?>").unwrap(), Format::Xml);
    assert_eq!(detect_format(b"  <!DOCTYPE plist>").unwrap(), Format::Xml);
    assert_eq!(detect_format(b"<plist>").unwrap(), Format::Xml);
}

#[test]
fn detect_ascii() {
    assert_eq!(detect_format(b"{ a = b; }").unwrap(), Format::Ascii);
    assert_eq!(detect_format(b"\n(1, 2)").unwrap(), Format::Ascii);
    assert_eq!(detect_format(b"// comment\n{}").unwrap(), Format::Ascii);
    assert_eq!(detect_format(b"<0fbd>").unwrap(), Format::Ascii);
    assert_eq!(detect_format(b"<*I1>").unwrap(), Format::Ascii);
}

#[test]
fn detect_skips_utf8_bom() {
    assert_eq!(
        detect_format(b"\xEF\xBB\xBF<?xml version=\"1.0\"?>").unwrap(),
        Format::Xml
    );
}

#[test]
fn detect_rejects_unknown_and_empty_input() {
    assert!(matches!(
        detect_format(b"hello"),
        Err(PlistError::InvalidSignature(_))
    ));
    assert!(matches!(
        detect_format(b"   "),
        Err(PlistError::InvalidSignature(_))
    ));
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn every_output_format_reads_back() {
    let value = sample();
    for format in [
        OutputFormat::Binary,
        OutputFormat::Xml,
        OutputFormat::Ascii(Dialect::GnuStep),
    ] {
        let bytes = to_bytes(&value, format).unwrap();
        assert_eq!(detect_format(&bytes).unwrap(), format.format());
        assert_eq!(from_bytes(&bytes).unwrap(), value, "{format:?}");
    }
}

#[test]
fn ascii_document_requires_container_root() {
    let err = to_bytes(&Value::from("bare"), OutputFormat::Ascii(Dialect::Apple)).unwrap_err();
    assert!(matches!(err, PlistError::InvalidSignature(_)));
    assert!(to_bytes(&Value::from("bare"), OutputFormat::Binary).is_ok());
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn save_and_load_each_format() {
    let dir = tempfile::tempdir().unwrap();
    let value = sample();

    let binary = dir.path().join("a.plist");
    save_as_binary(&value, &binary).unwrap();
    assert!(std::fs::read(&binary).unwrap().starts_with(b"bplist00"));
    assert_eq!(from_file(&binary).unwrap(), value);

    let xml = dir.path().join("b.plist");
    save_as_xml(&value, &xml).unwrap();
    assert_eq!(from_file(&xml).unwrap(), value);

    let ascii = dir.path().join("c.plist");
    save_as_ascii(&value, &ascii, Dialect::GnuStep).unwrap();
    assert_eq!(from_file(&ascii).unwrap(), value);
}

#[test]
fn save_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("out.plist");
    save_as_xml(&sample(), &path).unwrap();
    assert!(path.exists());
}

#[test]
fn failed_encode_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("set.plist");
    let value = Value::Array(vec![Value::Set(Vec::new())]);
    assert!(matches!(
        save_as_binary(&value, &path),
        Err(PlistError::UnsupportedVersion { .. })
    ));
    assert!(!path.exists());
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.plist");
    match from_file(&path) {
        Err(PlistError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn convert_binary_to_apple_ascii() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.plist");
    let output = dir.path().join("out.plist");
    save_as_binary(&sample(), &input).unwrap();

    convert_file(&input, &output, OutputFormat::Ascii(Dialect::Apple)).unwrap();
    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        text,
        "{\n\tname = Widget;\n\tcount = 3;\n\tsizes = (\n\t\t1.5,\n\t\t2.5\n\t);\n}\n"
    );
}
