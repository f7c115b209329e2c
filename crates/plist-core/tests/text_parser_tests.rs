use plist_core::text::parser::{from_bytes, from_str};
use plist_core::{Date, Integer, PlistError, Value, MAX_DEPTH};

/// Run `f` on a thread with room for `MAX_DEPTH` levels of recursion in
/// unoptimized builds.
fn with_deep_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(64 << 20)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

fn nested(levels: usize, open: &str, close: &str) -> String {
    format!("{}{}", open.repeat(levels), close.repeat(levels))
}

fn keys(value: &Value) -> Vec<&str> {
    value
        .as_dictionary()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect()
}

// ============================================================================
// Strings and bare tokens
// ============================================================================

#[test]
fn parse_bare_string() {
    assert_eq!(from_str("hello").unwrap(), Value::from("hello"));
}

#[test]
fn parse_bare_tokens_stay_strings() {
    assert_eq!(from_str("42").unwrap(), Value::from("42"));
    assert_eq!(from_str("YES").unwrap(), Value::from("YES"));
    assert_eq!(from_str("1.5").unwrap(), Value::from("1.5"));
}

#[test]
fn parse_bare_path_characters() {
    assert_eq!(
        from_str("/usr/local/bin:$PATH").unwrap(),
        Value::from("/usr/local/bin:$PATH")
    );
}

#[test]
fn parse_quoted_string_with_spaces() {
    assert_eq!(from_str(r#""hello world""#).unwrap(), Value::from("hello world"));
}

#[test]
fn parse_empty_quoted_string() {
    assert_eq!(from_str(r#""""#).unwrap(), Value::from(""));
}

#[test]
fn parse_common_escapes() {
    assert_eq!(
        from_str(r#""a\nb\tc\"d\\e""#).unwrap(),
        Value::from("a\nb\tc\"d\\e")
    );
}

#[test]
fn parse_octal_and_hex_escapes() {
    assert_eq!(from_str(r#""\101\x42""#).unwrap(), Value::from("AB"));
}

#[test]
fn parse_unicode_escapes() {
    assert_eq!(from_str(r#""caf\u00e9""#).unwrap(), Value::from("café"));
    assert_eq!(from_str(r#""\U00E9""#).unwrap(), Value::from("é"));
}

#[test]
fn parse_surrogate_pair_escape() {
    assert_eq!(from_str(r#""\ud83d\ude00""#).unwrap(), Value::from("😀"));
}

#[test]
fn parse_raw_non_ascii_in_quotes() {
    assert_eq!(from_str("\"naïve\"").unwrap(), Value::from("naïve"));
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn parse_dictionary_keeps_key_order() {
    let value = from_str("{ zebra = 1; apple = 2; mango = 3; }").unwrap();
    assert_eq!(keys(&value), ["zebra", "apple", "mango"]);
    assert_eq!(
        value.as_dictionary().unwrap()["apple"],
        Value::from("2")
    );
}

#[test]
fn parse_dictionary_with_quoted_key() {
    let value = from_str(r#"{ "my key" = value; }"#).unwrap();
    assert_eq!(keys(&value), ["my key"]);
}

#[test]
fn parse_duplicate_key_keeps_last_value() {
    let value = from_str("{ a = 1; a = 2; }").unwrap();
    let dict = value.as_dictionary().unwrap();
    assert_eq!(dict.len(), 1);
    assert_eq!(dict["a"], Value::from("2"));
}

#[test]
fn parse_empty_containers() {
    assert_eq!(from_str("{}").unwrap(), Value::Dictionary(Default::default()));
    assert_eq!(from_str("()").unwrap(), Value::Array(Vec::new()));
    assert_eq!(from_str("[]").unwrap(), Value::Set(Vec::new()));
}

#[test]
fn parse_array_with_trailing_comma() {
    assert_eq!(
        from_str("(a, b, c,)").unwrap(),
        Value::Array(vec![Value::from("a"), Value::from("b"), Value::from("c")])
    );
}

#[test]
fn parse_nested_containers() {
    let value = from_str("{ list = (1, (2, 3)); inner = { k = v; }; }").unwrap();
    let dict = value.as_dictionary().unwrap();
    assert_eq!(
        dict["list"],
        Value::Array(vec![
            Value::from("1"),
            Value::Array(vec![Value::from("2"), Value::from("3")]),
        ])
    );
    assert_eq!(keys(&dict["inner"]), ["k"]);
}

#[test]
fn parse_gnustep_set() {
    assert_eq!(
        from_str("[<*I1>, two]").unwrap(),
        Value::Set(vec![Value::from(1), Value::from("two")])
    );
}

// ============================================================================
// Data and typed literals
// ============================================================================

#[test]
fn parse_data_block_with_whitespace() {
    assert_eq!(
        from_str("<0fbd7778 e2\n 00>").unwrap(),
        Value::Data(vec![0x0F, 0xBD, 0x77, 0x78, 0xE2, 0x00])
    );
}

#[test]
fn parse_empty_data_block() {
    assert_eq!(from_str("<>").unwrap(), Value::Data(Vec::new()));
}

#[test]
fn parse_typed_booleans() {
    assert_eq!(from_str("<*BY>").unwrap(), Value::Boolean(true));
    assert_eq!(from_str("<*BN>").unwrap(), Value::Boolean(false));
}

#[test]
fn parse_typed_integers() {
    assert_eq!(from_str("<*I42>").unwrap(), Value::from(42));
    assert_eq!(from_str("<*I-7>").unwrap(), Value::from(-7));
    assert_eq!(
        from_str("<*I18446744073709551615>").unwrap(),
        Value::from(u64::MAX)
    );
}

#[test]
fn parse_typed_real() {
    assert_eq!(from_str("<*R1.5>").unwrap(), Value::from(1.5));
}

#[test]
fn parse_typed_date() {
    let value = from_str("<*D2001-01-01 00:00:10 +0000>").unwrap();
    assert_eq!(value, Value::Date(Date::from_secs_since_2001(10.0)));
}

#[test]
fn parse_typed_boolean_inside_apple_document() {
    let value = from_str("{ enabled = <*BY>; name = YES; }").unwrap();
    let dict = value.as_dictionary().unwrap();
    assert_eq!(dict["enabled"], Value::Boolean(true));
    assert_eq!(dict["name"], Value::from("YES"));
}

// ============================================================================
// Comments and whitespace
// ============================================================================

#[test]
fn parse_with_comments() {
    let text = "// leading\n{\n\t/* block */ a = b; // trailing\n}\n";
    let value = from_str(text).unwrap();
    assert_eq!(keys(&value), ["a"]);
}

#[test]
fn parse_from_bytes_with_bom() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"{ a = b; }");
    assert_eq!(keys(&from_bytes(&bytes).unwrap()), ["a"]);
}

#[test]
fn parse_from_utf16_bytes() {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in "(\"é\")".encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    assert_eq!(
        from_bytes(&bytes).unwrap(),
        Value::Array(vec![Value::from("é")])
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn error_unterminated_string() {
    let err = from_str(r#"{a = "unterminated"#).unwrap_err();
    assert!(matches!(
        err,
        PlistError::Lexical {
            line: 1,
            column: 6,
            ..
        }
    ));
}

#[test]
fn error_unterminated_comment() {
    assert!(matches!(
        from_str("{ /* never closed"),
        Err(PlistError::Lexical { .. })
    ));
}

#[test]
fn error_invalid_escape() {
    assert!(matches!(
        from_str(r#""bad \q escape""#),
        Err(PlistError::Lexical { .. })
    ));
}

#[test]
fn error_malformed_hex_pair() {
    assert!(matches!(
        from_str("<0fb>"),
        Err(PlistError::Lexical { .. })
    ));
    assert!(matches!(from_str("<zz>"), Err(PlistError::Lexical { .. })));
}

#[test]
fn error_missing_semicolon_reports_position() {
    let err = from_str("{\n  a = b\n}").unwrap_err();
    assert!(matches!(
        err,
        PlistError::Syntax {
            line: 3,
            column: 1,
            ..
        }
    ));
}

#[test]
fn error_missing_equals() {
    assert!(matches!(
        from_str("{ a b; }"),
        Err(PlistError::Syntax { .. })
    ));
}

#[test]
fn error_unbalanced_brackets() {
    assert!(matches!(from_str("(a, b"), Err(PlistError::Syntax { .. })));
    assert!(matches!(from_str("{ a = b;"), Err(PlistError::Syntax { .. })));
}

#[test]
fn error_trailing_content() {
    assert!(matches!(
        from_str("{ a = b; } extra"),
        Err(PlistError::Syntax { .. })
    ));
}

#[test]
fn error_integer_literal_out_of_range() {
    assert!(matches!(
        from_str("<*I18446744073709551616>"),
        Err(PlistError::IntegerOverflow { .. })
    ));
    assert!(matches!(
        from_str("<*I-9223372036854775809>"),
        Err(PlistError::IntegerOverflow { .. })
    ));
}

#[test]
fn error_unknown_typed_literal() {
    assert!(matches!(from_str("<*X1>"), Err(PlistError::Lexical { .. })));
}

#[test]
fn overflow_range_integer_is_marked() {
    let value = from_str("<*I9223372036854775808>").unwrap();
    match value {
        Value::Integer(i) => {
            assert!(i.is_overflow());
            assert_eq!(i, Integer::new(i64::MAX as i128 + 1).unwrap());
        }
        other => panic!("expected integer, got {other:?}"),
    }
}

#[test]
fn error_odd_length_utf16() {
    let bytes = [0xFE, 0xFF, 0x00, b'(', 0x00, b')', 0x00];
    assert!(matches!(
        from_bytes(&bytes),
        Err(PlistError::Lexical { .. })
    ));
}

// ============================================================================
// Nesting depth
// ============================================================================

#[test]
fn parse_nesting_at_max_depth() {
    let parsed = with_deep_stack(|| from_str(&nested(MAX_DEPTH, "(", ")")).is_ok());
    assert!(parsed);
}

#[test]
fn error_nesting_past_max_depth_reports_the_opening_bracket() {
    let result = with_deep_stack(|| from_str(&nested(MAX_DEPTH + 1, "(", ")")).map(|_| ()));
    let column = MAX_DEPTH + 1;
    assert!(matches!(
        result,
        Err(PlistError::Syntax { line: 1, column: c, .. }) if c == column
    ));
}

#[test]
fn error_deeply_nested_dictionaries() {
    let text = format!("{}x{}", "{ a = ".repeat(1_000), "; }".repeat(1_000));
    let result = with_deep_stack(move || from_str(&text).map(|_| ()));
    assert!(matches!(result, Err(PlistError::Syntax { .. })));
}

#[test]
fn error_extreme_nesting_terminates() {
    let result = with_deep_stack(|| from_str(&nested(200_000, "(", ")")).map(|_| ()));
    assert!(matches!(result, Err(PlistError::Syntax { .. })));
}
