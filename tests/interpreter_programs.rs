//! Interpreted experiments end to end: compiled documents, definition files,
//! salt composition and agreement with native assignment.

mod common;

use common::{FOO_BAR_PROGRAM, init_tracing, params};
use sortition::config::{load_definition, write_definition};
use sortition::error::AssignmentResult;
use sortition::experiment::{JsonLinesLogger, NullLogger, read_records};
use sortition::interpreter::builder::*;
use sortition::interpreter::{PureOp, evaluate_program};
use sortition::random::RandomOpKind;
use sortition::{
    Assignment, AssignmentError, Experiment, ExperimentConfig, ExperimentDefinition, Interpreted,
    MemoryLogger, Native, Params, Program, RandomOp, Value,
};
use tempfile::TempDir;

const DEFINITION: &str = r#"{
  "name": "checkout_flow",
  "default_unit": ["userid"],
  "program": {"op": "seq", "seq": [
    {"op": "set", "var": "show_banner", "value": {"op": "bernoulliTrial", "p": 0.3}},
    {"op": "set", "var": "discount",
     "value": {"op": "weightedChoice", "choices": [0, 5, 10], "weights": [0.5, 0.3, 0.2]}},
    {"op": "set", "var": "tier",
     "value": {"op": "cond", "cond": [
        {"if": {"op": ">=", "left": {"op": "get", "var": "discount"}, "right": 10},
         "then": "gold"},
        {"if": {"op": ">", "left": {"op": "get", "var": "discount"}, "right": 0},
         "then": "silver"}
     ], "else": "none"}}
  ]}
}"#;

fn checkout_native(params: &mut Assignment, _inputs: &Params) -> AssignmentResult<()> {
    params.draw("show_banner", RandomOp::bernoulli_trial(0.3))?;
    let discount = params.draw(
        "discount",
        RandomOp::weighted_choice(vec![0, 5, 10], vec![0.5, 0.3, 0.2]),
    )?;
    let tier = match discount.as_i64() {
        Some(d) if d >= 10 => "gold",
        Some(d) if d > 0 => "silver",
        _ => "none",
    };
    params.set("tier", tier);
    Ok(())
}

#[test]
fn definition_file_drives_interpreted_experiment() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("checkout.json");
    let definition = ExperimentDefinition::from_json_str(DEFINITION).unwrap();
    write_definition(&path, &definition).unwrap();

    for userid in 0..40 {
        let inputs = params(&[("userid", Value::Integer(userid))]);

        let loaded = load_definition(&path).unwrap();
        let config = loaded.config.clone();
        let mut interpreted =
            Experiment::from_definition(loaded, inputs.clone(), NullLogger).unwrap();
        let mut native =
            Experiment::new(config, inputs, Native::new(checkout_native), NullLogger).unwrap();

        assert_eq!(
            interpreted.get_params().unwrap(),
            native.get_params().unwrap(),
            "userid = {}",
            userid
        );
    }
}

#[test]
fn missing_default_unit_input_is_an_undefined_variable() {
    let definition = ExperimentDefinition::from_json_str(DEFINITION).unwrap();
    let mut exp =
        Experiment::from_definition(definition, params(&[("user", 1.into())]), NullLogger)
            .unwrap();
    assert!(matches!(
        exp.get("tier"),
        Err(sortition::ExperimentError::Assignment(AssignmentError::UndefinedVariable(name))) if name == "userid"
    ));
}

#[test]
fn exposures_round_trip_through_json_lines_file() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("logs").join("exposures.jsonl");
    let logger = JsonLinesLogger::open(&log_path).unwrap();

    for i in [42, 43] {
        let mut exp = Experiment::new(
            ExperimentConfig::new("test_name"),
            params(&[("i", Value::Integer(i))]),
            Interpreted::from_json_str(FOO_BAR_PROGRAM).unwrap(),
            &logger,
        )
        .unwrap();
        exp.get("foo").unwrap();
        exp.log_event("click", Some(params(&[("button", "buy".into())])))
            .unwrap();
    }

    // Same unit again: the logger remembers the exposure.
    let mut repeat = Experiment::new(
        ExperimentConfig::new("test_name"),
        params(&[("i", 42.into())]),
        Interpreted::from_json_str(FOO_BAR_PROGRAM).unwrap(),
        &logger,
    )
    .unwrap();
    repeat.get("foo").unwrap();

    let records = read_records(&log_path).unwrap();
    let events: Vec<&str> = records.iter().map(|r| r.event.as_str()).collect();
    assert_eq!(events, ["exposure", "click", "exposure", "click"]);
    assert_eq!(records[0].params["foo"], Value::from("b"));
    assert_eq!(records[0].hash_version, "sha1-hex15");
    assert_eq!(
        records[1].extra_data.as_ref().unwrap()["button"],
        Value::from("buy")
    );
    assert_ne!(records[0].event_id, records[2].event_id);
}

#[test]
fn full_salt_shares_draws_across_experiments() {
    let program = || {
        let shared = random(
            RandomOpKind::RandomInteger,
            [
                ("min", literal(0)),
                ("max", literal(1_000_000)),
                ("unit", get("userid")),
                ("full_salt", literal("shared_bucket")),
            ],
        );
        let local = random(
            RandomOpKind::RandomInteger,
            [
                ("min", literal(0)),
                ("max", literal(1_000_000)),
                ("unit", get("userid")),
            ],
        );
        Program::new(seq(vec![set("bucket", shared), set("local", local)]))
    };

    let mut differing_local = 0;
    for userid in 0..20 {
        let inputs = params(&[("userid", Value::Integer(userid))]);
        let a = evaluate_program(&program(), "exp_a", &inputs).unwrap();
        let b = evaluate_program(&program(), "exp_b", &inputs).unwrap();
        assert_eq!(a.params["bucket"], b.params["bucket"]);
        if a.params["local"] != b.params["local"] {
            differing_local += 1;
        }
    }
    assert!(differing_local > 0);
}

#[test]
fn explicit_salts_decouple_draws_from_param_names() {
    let inputs = params(&[("userid", 7.into())]);
    let with_salt = |var: &str| {
        Program::new(seq(vec![set(
            var,
            random(
                RandomOpKind::RandomFloat,
                [
                    ("min", literal(0.0)),
                    ("max", literal(1.0)),
                    ("unit", get("userid")),
                    ("salt", literal("score")),
                ],
            ),
        )]))
    };

    let first = evaluate_program(&with_salt("x"), "exp", &inputs).unwrap();
    let second = evaluate_program(&with_salt("y"), "exp", &inputs).unwrap();
    assert_eq!(first.params["x"], second.params["y"]);

    let mut assignment = Assignment::new("exp");
    let native = assignment
        .draw(
            "anything",
            RandomOp::random_float(0.0, 1.0).unit(7).salt("score"),
        )
        .unwrap();
    assert_eq!(native, first.params["x"]);
}

#[test]
fn built_program_serializes_to_equivalent_document() {
    let built = Program::new(seq(vec![
        set("foo", uniform_choice(literal(vec!["a", "b"]), get("i"))),
        set("bar", literal(41)),
    ]));
    let shipped = serde_json::to_string(&built).unwrap();
    let reparsed = Program::from_json_str(&shipped).unwrap();
    assert_eq!(reparsed, built);
    assert_eq!(reparsed.checksum(), built.checksum());

    let parsed = Program::from_json_str(FOO_BAR_PROGRAM).unwrap();
    let inputs = params(&[("i", 42.into())]);
    assert_eq!(
        evaluate_program(&built, "test_name", &inputs).unwrap().params,
        evaluate_program(&parsed, "test_name", &inputs).unwrap().params
    );
}

#[test]
fn pure_operators_compose_inside_programs() {
    let program = Program::new(seq(vec![
        set(
            "total",
            pure(PureOp::Sum, [("values", literal(vec![1, 2, 3, 4]))]),
        ),
        set(
            "bucket",
            pure(
                PureOp::Mod,
                [("left", get("total")), ("right", literal(3))],
            ),
        ),
        set(
            "label",
            cond(
                vec![(
                    equals(get("bucket"), literal(1)),
                    literal("one"),
                )],
                Some(literal("other")),
            ),
        ),
        ret(not(equals(get("label"), literal("other")))),
    ]));

    let evaluation = evaluate_program(&program, "exp", &Params::new()).unwrap();
    assert_eq!(evaluation.params["total"], Value::Integer(10));
    assert_eq!(evaluation.params["bucket"], Value::Integer(1));
    assert_eq!(evaluation.params["label"], Value::from("one"));
    assert!(evaluation.in_experiment);
}

#[test]
fn operator_failures_abort_the_whole_assignment() {
    let logger = MemoryLogger::new();
    let program = r#"{"op":"seq","seq":[
        {"op":"set","var":"ok","value":{"op":"uniformChoice","choices":[1,2],"unit":{"op":"get","var":"i"}}},
        {"op":"set","var":"broken","value":{"op":"weightedChoice","choices":[1,2],"weights":[0,0],"unit":{"op":"get","var":"i"}}}
    ]}"#;
    let mut exp = Experiment::new(
        ExperimentConfig::new("exp"),
        params(&[("i", 1.into())]),
        Interpreted::from_json_str(program).unwrap(),
        &logger,
    )
    .unwrap();

    assert!(exp.get("ok").is_err());
    assert!(exp.get_params().is_err());
    assert!(logger.is_empty());
}

#[test]
fn unsupported_operators_are_rejected_at_parse_time() {
    let err = Interpreted::from_json_str(r#"{"op":"seq","seq":[{"op":"launchRockets"}]}"#)
        .unwrap_err();
    assert!(matches!(err, AssignmentError::UnsupportedOperator(name) if name == "launchRockets"));
}

#[test]
fn out_of_range_integer_arguments_fail_instead_of_clamping() {
    let program = Program::from_json_str(
        r#"{"op":"seq","seq":[
            {"op":"set","var":"n","value":{"op":"randomInteger","min":0,"max":1e300,"unit":1}}
        ]}"#,
    )
    .unwrap();
    assert!(matches!(
        evaluate_program(&program, "exp", &Params::new()),
        Err(AssignmentError::Domain(_))
    ));

    let program = Program::from_json_str(
        r#"{"op":"seq","seq":[
            {"op":"set","var":"picked","value":{"op":"sample","choices":[1,2,3],"draws":1e300,"unit":1}}
        ]}"#,
    )
    .unwrap();
    assert!(matches!(
        evaluate_program(&program, "exp", &Params::new()),
        Err(AssignmentError::Domain(_))
    ));
}
