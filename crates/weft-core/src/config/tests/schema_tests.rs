use crate::config::schema::{
    coerce_json, coerce_value, parse_config, ConfigKind, ConfigSpec, ConfigValue,
};
use serde_json::json;

#[test]
fn string_specs_pass_raw_input_through() {
    let spec = ConfigSpec::string();
    assert_eq!(
        parse_config(&spec, "raining"),
        ConfigValue::String("raining".into())
    );
    assert_eq!(parse_config(&spec, ""), ConfigValue::String(String::new()));
}

#[test]
fn number_specs_parse_or_yield_nan() {
    let spec = ConfigSpec::number();
    assert_eq!(parse_config(&spec, "42"), ConfigValue::Number(42.0));
    assert_eq!(parse_config(&spec, " 3.5 "), ConfigValue::Number(3.5));
    assert_eq!(parse_config(&spec, "-1"), ConfigValue::Number(-1.0));

    // Non-numeric strings are NaN, not an error.
    match parse_config(&spec, "not a number") {
        ConfigValue::Number(n) => assert!(n.is_nan()),
        other => panic!("expected Number, got {:?}", other),
    }
}

#[test]
fn boolean_specs_accept_the_documented_spellings() {
    let spec = ConfigSpec::boolean();
    for truthy in ["true", "TRUE", "y", "Y", "1", "on", "ON"] {
        assert_eq!(
            parse_config(&spec, truthy),
            ConfigValue::Boolean(true),
            "{} should be true",
            truthy
        );
    }
    for falsy in ["false", "n", "0", "off", "OFF"] {
        assert_eq!(
            parse_config(&spec, falsy),
            ConfigValue::Boolean(false),
            "{} should be false",
            falsy
        );
    }
    // Anything unrecognised is false.
    assert_eq!(parse_config(&spec, "maybe"), ConfigValue::Boolean(false));
    assert_eq!(parse_config(&spec, ""), ConfigValue::Boolean(false));
}

#[test]
fn string_list_specs_parse_json_arrays() {
    let spec = ConfigSpec::string_list();
    assert_eq!(
        parse_config(&spec, r#"["a", "b"]"#),
        ConfigValue::StringList(vec!["a".into(), "b".into()])
    );
    // Non-string elements are stringified rather than dropped.
    assert_eq!(
        parse_config(&spec, r#"[1, "b"]"#),
        ConfigValue::StringList(vec!["1".into(), "b".into()])
    );
    // Invalid JSON keeps the raw string as a one-element list.
    assert_eq!(
        parse_config(&spec, "plain"),
        ConfigValue::StringList(vec!["plain".into()])
    );
}

#[test]
fn record_specs_parse_json_or_keep_the_raw_string() {
    let spec = ConfigSpec::record();
    assert_eq!(
        parse_config(&spec, r#"{"a": 1}"#),
        ConfigValue::Record(json!({"a": 1}))
    );
    assert_eq!(
        parse_config(&spec, "not-json"),
        ConfigValue::Record(json!("not-json"))
    );
}

#[test]
fn coercion_is_idempotent_on_already_typed_values() {
    let cases = vec![
        (ConfigSpec::string(), ConfigValue::String("x".into())),
        (ConfigSpec::number(), ConfigValue::Number(7.0)),
        (ConfigSpec::boolean(), ConfigValue::Boolean(true)),
        (
            ConfigSpec::string_list(),
            ConfigValue::StringList(vec!["x".into()]),
        ),
        (ConfigSpec::record(), ConfigValue::Record(json!({"k": true}))),
        (ConfigSpec::internal(), ConfigValue::Record(json!(null))),
    ];
    for (spec, value) in cases {
        assert_eq!(coerce_value(&spec, value.clone()).unwrap(), value);
    }
}

#[test]
fn coercion_reparses_strings_and_rejects_other_mismatches() {
    assert_eq!(
        coerce_value(&ConfigSpec::number(), ConfigValue::String("8".into())).unwrap(),
        ConfigValue::Number(8.0)
    );
    assert_eq!(
        coerce_value(&ConfigSpec::boolean(), ConfigValue::Number(1.0)).unwrap_err(),
        ConfigKind::Number
    );
}

#[test]
fn file_values_coerce_by_declared_kind() {
    assert_eq!(
        coerce_json(&ConfigSpec::number(), json!(12)),
        Some(ConfigValue::Number(12.0))
    );
    assert_eq!(
        coerce_json(&ConfigSpec::boolean(), json!(true)),
        Some(ConfigValue::Boolean(true))
    );
    assert_eq!(
        coerce_json(&ConfigSpec::string(), json!("B")),
        Some(ConfigValue::String("B".into()))
    );
    // A string in the file goes through raw parsing.
    assert_eq!(
        coerce_json(&ConfigSpec::number(), json!("9")),
        Some(ConfigValue::Number(9.0))
    );
    assert_eq!(
        coerce_json(&ConfigSpec::string_list(), json!(["a", 2])),
        Some(ConfigValue::StringList(vec!["a".into(), "2".into()]))
    );
    // Irreconcilable shapes are skipped.
    assert_eq!(coerce_json(&ConfigSpec::number(), json!({"a": 1})), None);
}

#[test]
fn enum_values_are_preserved_for_introspection() {
    let spec = ConfigSpec::string().one_of(["low", "high"]).with_default("low");
    assert_eq!(
        spec.enum_values,
        Some(vec!["low".to_string(), "high".to_string()])
    );
    // Not enforced: out-of-set values still parse.
    assert_eq!(
        parse_config(&spec, "medium"),
        ConfigValue::String("medium".into())
    );
}
