/// Property-based round-trip tests.
///
/// Random value trees are pushed through each codec and must come back equal.
/// Strategies are shaped to what each encoding can carry:
///
/// - binary: everything except sets (format v0.0 has none)
/// - GnuStep text: everything except uids
/// - XML: no sets or uids, and printable ASCII strings only
///
/// Reals are finite (NaN never compares equal) and dates are whole seconds,
/// since the textual date forms carry no fractional part.
use plist_core::text::{self, Dialect};
use plist_core::{binary, xml, Date, Dictionary, Uid, Value};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_key() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_ .]{0,12}"
}

fn arb_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_./:-]{0,20}",
        "[ -~]{0,20}",
        any::<String>(),
        Just(String::new()),
        Just("http://example.com".to_string()),
        Just("YES".to_string()),
        Just("42".to_string()),
    ]
}

fn arb_scalar(strings: BoxedStrategy<String>) -> BoxedStrategy<Value> {
    prop_oneof![
        strings.prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<f64>()
            .prop_filter("finite reals only", |f| f.is_finite())
            .prop_map(Value::from),
        any::<bool>().prop_map(Value::Boolean),
        (-3_000_000_000i64..3_000_000_000)
            .prop_map(|secs| Value::Date(Date::from_secs_since_2001(secs as f64))),
        prop::collection::vec(any::<u8>(), 0..24).prop_map(Value::Data),
    ]
    .boxed()
}

fn arb_array(inner: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
    prop::collection::vec(inner, 0..6).prop_map(Value::Array)
}

fn arb_dictionary(inner: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
    prop::collection::vec((arb_key(), inner), 0..6)
        .prop_map(|entries| Value::Dictionary(entries.into_iter().collect::<Dictionary>()))
}

fn arb_binary_tree() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        4 => arb_scalar(arb_string().boxed()),
        1 => any::<u64>().prop_map(|id| Value::Uid(Uid::new(id))),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![arb_array(inner.clone()), arb_dictionary(inner)]
    })
}

fn arb_gnustep_tree() -> impl Strategy<Value = Value> {
    arb_scalar(arb_string().boxed()).prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            arb_array(inner.clone()),
            arb_dictionary(inner.clone()),
            prop::collection::vec(inner, 0..6).prop_map(Value::Set),
        ]
    })
}

fn arb_xml_tree() -> impl Strategy<Value = Value> {
    arb_scalar("[ -~]{0,20}".boxed()).prop_recursive(3, 32, 6, |inner| {
        prop_oneof![arb_array(inner.clone()), arb_dictionary(inner)]
    })
}

fn arb_any_tree() -> impl Strategy<Value = Value> {
    prop_oneof![arb_binary_tree(), arb_gnustep_tree()]
}

fn key_order(value: &Value) -> Vec<String> {
    match value {
        Value::Dictionary(dict) => dict
            .iter()
            .flat_map(|(k, v)| std::iter::once(k.clone()).chain(key_order(v)))
            .collect(),
        Value::Array(items) | Value::Set(items) => items.iter().flat_map(key_order).collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn binary_roundtrip(value in arb_binary_tree()) {
        let bytes = binary::to_bytes(&value).unwrap();
        let back = binary::from_bytes(&bytes).unwrap();
        prop_assert_eq!(key_order(&back), key_order(&value));
        prop_assert_eq!(back, value);
    }

    #[test]
    fn gnustep_text_roundtrip(value in arb_gnustep_tree()) {
        let out = text::to_string(&value, Dialect::GnuStep);
        let back = text::from_str(&out).unwrap();
        prop_assert_eq!(key_order(&back), key_order(&value));
        prop_assert_eq!(back, value);
    }

    #[test]
    fn xml_roundtrip(value in arb_xml_tree()) {
        let out = xml::to_string(&value).unwrap();
        let back = xml::from_str(&out).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn text_writes_are_idempotent(value in arb_any_tree()) {
        for dialect in [Dialect::Apple, Dialect::GnuStep] {
            let first = text::to_string(&value, dialect);
            let second = text::to_string(&text::from_str(&first).unwrap(), dialect);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn binary_encoding_is_deterministic(value in arb_binary_tree()) {
        prop_assert_eq!(binary::to_bytes(&value).unwrap(), binary::to_bytes(&value).unwrap());
    }
}
