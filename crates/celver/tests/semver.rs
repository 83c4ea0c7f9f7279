//! End-to-end tests for `semver_compare` through the full pipeline.

mod common;

use celver::{
    semver_compare, Env, EnvBuilder, EvalErrorKind, MapActivation, Program, Value, ValueMap, Version,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const MAX_OPENSHIFT: &str =
    "properties.exists(p, p.type == 'olm.maxOpenShiftVersion' && (semver_compare(p.value, 4.8) <= 0))";

fn program(env: &Env, source: &str) -> Program {
    let ast = env
        .compile(source)
        .unwrap_or_else(|err| panic!("failed to compile '{}': {}", source, err));
    env.program(&ast)
}

fn ocp(version: &str) -> MapActivation {
    MapActivation::new().with("ocpversion", version)
}

fn property(kind: &str, value: Value) -> Value {
    Value::map([("type", Value::from(kind)), ("value", value)])
}

fn properties(items: Vec<Value>) -> MapActivation {
    MapActivation::new().with("properties", items)
}

#[test]
fn free_call_compares_bound_version() {
    let env = common::semver_env();
    let program = program(&env, "semver_compare(ocpversion, '4.8.0') == 1");

    assert_eq!(program.evaluate(&ocp("4.9.0")), Ok(Value::Bool(true)));
    assert_eq!(program.evaluate(&ocp("4.7.0")), Ok(Value::Bool(false)));
    assert_eq!(program.evaluate(&ocp("4.8.0")), Ok(Value::Bool(false)));
}

#[test]
fn receiver_call_compares_bound_version() {
    let env = common::semver_env();
    let program = program(&env, "ocpversion.semver_compare('4.8.0') != 1");

    assert_eq!(program.evaluate(&ocp("4.9.0")), Ok(Value::Bool(false)));
    assert_eq!(program.evaluate(&ocp("4.7.0")), Ok(Value::Bool(true)));
}

#[test]
fn free_and_receiver_forms_agree() {
    let env = common::semver_env();
    let free = program(&env, "semver_compare(ocpversion, '4.8.0')");
    let receiver = program(&env, "ocpversion.semver_compare('4.8.0')");

    for version in ["4.7.0", "4.8.0", "4.9.0", "v4.8", "4.8.0-rc.1", "4.8.0+build"] {
        let activation = ocp(version);
        assert_eq!(
            free.evaluate(&activation),
            receiver.evaluate(&activation),
            "{}",
            version
        );
    }
}

#[test]
fn property_bag_from_operator_bundle() {
    let env = common::semver_env();
    let program = program(&env, MAX_OPENSHIFT);

    let gvk = Value::map([
        ("group", Value::from("a2")),
        ("version", Value::from("b")),
        ("kind", Value::from("c")),
    ]);
    let bundle = properties(vec![
        property("olm.maxOpenShiftVersion", Value::from("4.9")),
        property("olm.gvk", gvk),
    ]);
    assert_eq!(program.evaluate(&bundle), Ok(Value::Bool(false)));

    let older = properties(vec![property("olm.maxOpenShiftVersion", Value::from("4.7"))]);
    assert_eq!(program.evaluate(&older), Ok(Value::Bool(true)));

    let none = properties(Vec::new());
    assert_eq!(program.evaluate(&none), Ok(Value::Bool(false)));
}

#[test]
fn property_bag_short_circuits_past_bad_versions() {
    let env = common::semver_env();
    let program = program(&env, MAX_OPENSHIFT);

    // The unparseable entry errors, but a later entry satisfies the predicate.
    let bundle = properties(vec![
        property("olm.maxOpenShiftVersion", Value::from("not-a-version")),
        property("olm.maxOpenShiftVersion", Value::from("4.6")),
    ]);
    assert_eq!(program.evaluate(&bundle), Ok(Value::Bool(true)));

    // No entry satisfies it, so the error surfaces.
    let bundle = properties(vec![
        property("olm.maxOpenShiftVersion", Value::from("not-a-version")),
        property("olm.maxOpenShiftVersion", Value::from("4.9")),
    ]);
    let err = program.evaluate(&bundle).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::VersionParse);
    assert_eq!(
        err.message,
        "first operand: unable to parse 'not-a-version' to semver format"
    );
}

#[test]
fn property_bag_accepts_map_binding() {
    let env = common::semver_env();
    let program = program(&env, "properties.exists(k, k == 'olm.maxOpenShiftVersion')");

    let bag: ValueMap = [("olm.maxOpenShiftVersion", Value::from("4.9"))]
        .into_iter()
        .collect();
    let activation = MapActivation::new().with("properties", bag);
    assert_eq!(program.evaluate(&activation), Ok(Value::Bool(true)));
}

#[test]
fn coercion_failure_is_an_error_value() {
    let env = common::semver_env();
    let program = program(&env, "semver_compare(properties, '4.8.0')");

    let activation = properties(vec![Value::from("4.8.0")]);
    let value = program.eval(&activation);
    match &value {
        Value::Error(err) => {
            assert_eq!(err.kind, EvalErrorKind::Coercion);
            assert_eq!(
                err.message,
                "first operand: cannot convert list [\"4.8.0\"] to a version string"
            );
        }
        other => panic!("expected error value, got {:?}", other),
    }
    assert!(program.evaluate(&activation).is_err());
}

#[test]
fn errors_can_be_absorbed_by_the_expression() {
    let env = common::semver_env();
    let program = program(
        &env,
        "ocpversion == 'latest' || semver_compare(ocpversion, '4.8.0') >= 0",
    );

    assert_eq!(program.evaluate(&ocp("latest")), Ok(Value::Bool(true)));
    assert_eq!(program.evaluate(&ocp("4.8.1")), Ok(Value::Bool(true)));
    assert_eq!(
        program.evaluate(&ocp("nightly")).unwrap_err().kind,
        EvalErrorKind::VersionParse
    );
}

#[test]
fn unbound_variable_fails_evaluation() {
    let env = common::semver_env();
    let program = program(&env, "semver_compare(ocpversion, '4.8.0') == 1");

    let err = program.evaluate(&MapActivation::new()).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::UnboundVariable);
    assert_eq!(err.message, "no value bound for variable 'ocpversion'");

    // Extra bindings are ignored.
    let activation = ocp("4.9.0").with("unrelated", 1);
    assert_eq!(program.evaluate(&activation), Ok(Value::Bool(true)));
}

#[test]
fn call_arity_is_checked() {
    let env = common::semver_env();
    assert!(env.compile("semver_compare(ocpversion)").is_err());
    assert!(env.compile("ocpversion.semver_compare()").is_err());
    assert!(env.compile("ocpversion.semver_compare('1.0.0', '2.0.0')").is_err());
}

#[test]
fn env_and_program_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Env>();
    assert_send_sync::<EnvBuilder>();
    assert_send_sync::<Program>();
    assert_send_sync::<Value>();
}

#[test]
fn concurrent_evaluation() {
    let env = common::semver_env();
    let program = program(&env, "semver_compare(ocpversion, '4.8.0')");

    let cases = [("4.7.0", -1), ("4.8.0", 0), ("4.9.0", 1), ("5.0.0-rc.1", 1)];
    std::thread::scope(|scope| {
        for (version, expected) in cases {
            let program = &program;
            scope.spawn(move || {
                for _ in 0..100 {
                    assert_eq!(program.evaluate(&ocp(version)), Ok(Value::Int(expected)));
                }
            });
        }
    });
}

fn version_strategy() -> impl Strategy<Value = String> {
    let core = (0u64..20, 0u64..20, 0u64..20);
    let prerelease = prop::option::of(prop::collection::vec(
        prop_oneof![
            (0u64..30).prop_map(|n| n.to_string()),
            "[a-z][a-z0-9-]{0,5}",
        ],
        1..4,
    ));
    let build = prop::option::of("[a-z0-9]{1,6}");
    (core, prerelease, build).prop_map(|((major, minor, patch), pre, build)| {
        let mut version = format!("{}.{}.{}", major, minor, patch);
        if let Some(pre) = pre {
            version.push('-');
            version.push_str(&pre.join("."));
        }
        if let Some(build) = build {
            version.push('+');
            version.push_str(&build);
        }
        version
    })
}

fn cmp(a: &str, b: &str) -> i64 {
    match semver_compare(&Value::from(a), &Value::from(b)) {
        Value::Int(n) => n,
        other => panic!("comparing '{}' with '{}' gave {:?}", a, b, other),
    }
}

proptest! {
    #[test]
    fn compare_is_reflexive(v in version_strategy()) {
        prop_assert_eq!(cmp(&v, &v), 0);
    }

    #[test]
    fn compare_is_antisymmetric(a in version_strategy(), b in version_strategy()) {
        prop_assert_eq!(cmp(&a, &b), -cmp(&b, &a));
    }

    #[test]
    fn compare_is_transitive(
        a in version_strategy(),
        b in version_strategy(),
        c in version_strategy(),
    ) {
        let mut sorted = [a, b, c];
        sorted.sort_by(|x, y| cmp(x, y).cmp(&0));
        prop_assert!(cmp(&sorted[0], &sorted[1]) <= 0);
        prop_assert!(cmp(&sorted[1], &sorted[2]) <= 0);
        prop_assert!(cmp(&sorted[0], &sorted[2]) <= 0);
    }

    #[test]
    fn equality_is_transitive(a in version_strategy(), b in version_strategy()) {
        // `a+x` and `a+y` are equal in precedence; so is anything equal to both.
        let with_build = format!("{}+extra", a.split('+').next().unwrap_or_default());
        if cmp(&a, &b) == 0 {
            prop_assert_eq!(cmp(&b, &with_build), 0);
        }
        prop_assert_eq!(cmp(&a, &with_build), 0);
    }

    #[test]
    fn tolerant_short_forms_fill_zeros(major in 0u64..1000, minor in 0u64..1000) {
        prop_assert_eq!(
            Version::parse_tolerant(&format!("{}.{}", major, minor)),
            Version::parse_tolerant(&format!("{}.{}.0", major, minor))
        );
        prop_assert_eq!(
            Version::parse_tolerant(&format!("v{}", major)),
            Version::parse(&format!("{}.0.0", major))
        );
    }

    #[test]
    fn tolerant_parse_round_trips_display(v in version_strategy()) {
        let parsed = Version::parse_tolerant(&v).unwrap();
        prop_assert_eq!(parsed.to_string(), v);
    }
}
