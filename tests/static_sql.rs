//! Static template tests: classification, one-time placeholder
//! extraction, and bind-time value resolution.

mod common;

use common::{args, elem, setup_test, text};
use dynsql::{compile, Error, ScriptConfig, Value, ValueAccess};

#[test]
fn test_static_template_extracts_once() {
    let ctx = setup_test();
    let markup = elem(
        "select",
        &[],
        vec![text("select * from users where id = #{id}")],
    );
    let template = ctx.compile("users.byId", &markup).unwrap();
    assert!(!template.is_dynamic());

    let arguments = args(vec![("id", Value::I64(5))]);
    let bound = ctx.bind(&template, &arguments).unwrap();
    assert_eq!(bound.sql, "select * from users where id = ?");
    assert_eq!(bound.parameter_mappings.len(), 1);
    assert_eq!(bound.parameter_mappings[0].property, "id");
    assert!(bound.additional_bindings.is_empty());
    assert_eq!(
        bound.parameter_values(&arguments, &ValueAccess).unwrap(),
        vec![Value::I64(5)]
    );
}

#[test]
fn test_static_template_binds_same_sql_every_call() {
    let ctx = setup_test();
    let markup = elem(
        "insert",
        &[],
        vec![text("insert into t (a, b) values (#{a}, #{b})")],
    );
    let template = ctx.compile("t.insert", &markup).unwrap();
    let first = ctx.bind(&template, &args(vec![("a", Value::I64(1)), ("b", Value::I64(2))]));
    let second = ctx.bind(&template, &args(vec![("a", Value::I64(3)), ("b", Value::I64(4))]));
    assert_eq!(first.unwrap().sql, second.unwrap().sql);
}

#[test]
fn test_scalar_argument_binds_to_itself() {
    let ctx = setup_test();
    let markup = elem("select", &[], vec![text("select * from t where id = #{id}")]);
    let template = ctx.compile("t.byId", &markup).unwrap();
    let arguments = Value::I64(42);
    let bound = ctx.bind(&template, &arguments).unwrap();
    assert_eq!(
        bound.parameter_values(&arguments, &ValueAccess).unwrap(),
        vec![Value::I64(42)]
    );
}

#[test]
fn test_escaped_placeholder_stays_literal() {
    let ctx = setup_test();
    let markup = elem("select", &[], vec![text(r"select '\#{not a marker}'")]);
    let template = ctx.compile("t.literals", &markup).unwrap();
    assert!(!template.is_dynamic());
    let bound = ctx.bind(&template, &Value::Null).unwrap();
    assert_eq!(bound.sql, "select '#{not a marker}'");
    assert!(bound.parameter_mappings.is_empty());
}

#[test]
fn test_nested_property_path_resolves() {
    let ctx = setup_test();
    let markup = elem(
        "select",
        &[],
        vec![text("select * from t where id = #{user.id}")],
    );
    let template = ctx.compile("t.byUser", &markup).unwrap();
    let arguments = args(vec![(
        "user",
        args(vec![("id", Value::I64(9))]),
    )]);
    let bound = ctx.bind(&template, &arguments).unwrap();
    assert_eq!(
        bound.parameter_values(&arguments, &ValueAccess).unwrap(),
        vec![Value::I64(9)]
    );
}

#[test]
fn test_missing_property_fails_value_resolution() {
    let ctx = setup_test();
    let markup = elem("select", &[], vec![text("select #{absent}")]);
    let template = ctx.compile("t.missing", &markup).unwrap();
    let arguments = args(vec![]);
    let bound = ctx.bind(&template, &arguments).unwrap();
    assert_eq!(
        bound.parameter_values(&arguments, &ValueAccess).unwrap_err(),
        Error::PropertyNotFound {
            statement: "t.missing".into(),
            property: "absent".into(),
        }
    );
}

#[test]
fn test_configured_converter_applies_to_static_extraction() {
    let mut config = ScriptConfig::default();
    config.converters.register("timestamp", "chrono_naive");
    let markup = elem(
        "select",
        &[],
        vec![text("select * from t where at < #{at,type=timestamp}")],
    );
    let template = compile("t.before", &markup, None, &config).unwrap();
    let bound = template
        .bind(&args(vec![]), &dynsql::SimpleEvaluator, &ValueAccess)
        .unwrap();
    assert_eq!(
        bound.parameter_mappings[0].converter.as_deref(),
        Some("chrono_naive")
    );
}

#[test]
fn test_bad_placeholder_fails_at_compile_for_static_markup() {
    let ctx = setup_test();
    let markup = elem("select", &[], vec![text("select #{a,flavor=mint}")]);
    let err = ctx.compile("t.bad", &markup).unwrap_err();
    assert_eq!(
        err,
        Error::UnknownAttribute {
            statement: "t.bad".into(),
            attribute: "flavor".into(),
        }
    );
}
