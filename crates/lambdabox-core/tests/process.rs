//! End-to-end behaviour of `LambdaService::process`

use lambdabox_core::{ExecutionResult, LambdaDefinition, LambdaService, StatusCode};
use serde_json::{Value, json};

fn process(lambda: &LambdaDefinition, data: &Value) -> ExecutionResult {
    LambdaService::default().process(lambda, data)
}

#[test]
fn increments_field() {
    let result = process(
        &LambdaDefinition::javascript("function(data) { return data.x + 1; }"),
        &json!({ "x": 5 }),
    );
    assert_eq!(result.status_code, StatusCode::Ok);
    assert_eq!(result.status_message, "OK");
    assert_eq!(result.response, Some(json!(6)));
    assert_eq!(result.error, None);
    assert!(result.execution_time_in_ms.unwrap() >= 0.0);
}

#[test]
fn captures_console_log() {
    let result = process(
        &LambdaDefinition::javascript("function(data) { console.log('hi'); return 1; }"),
        &json!({}),
    );
    assert_eq!(result.status_code, StatusCode::Ok);
    assert_eq!(result.response, Some(json!(1)));
    assert_eq!(result.console_output, Some(vec![r#""hi""#.to_owned()]));
}

#[test]
fn no_writes_gives_empty_output() {
    let result = process(
        &LambdaDefinition::javascript("function(data) { return [data, data]; }"),
        &json!("a"),
    );
    assert_eq!(result.response, Some(json!(["a", "a"])));
    assert_eq!(result.console_output, Some(Vec::new()));
}

#[test]
fn rejects_invalid_signatures() {
    for body in [
        "(data) => data",
        "",
        "function named(data) { return data; }",
        "let y = 2;\nfunction(data) { return y; }",
        "function(data) return data",
    ] {
        let result = process(&LambdaDefinition::javascript(body), &json!({}));
        assert_eq!(result.status_code, StatusCode::SignatureInvalid, "{body:?}");
        assert_eq!(
            result.status_message,
            "ERROR: The function signature is not valid. It should be function(data)"
        );
        assert_eq!(
            result.error.as_deref(),
            Some(r#"Invalid Lambda. It should start with "function(data) {""#)
        );
        assert_eq!(result.execution_time_in_ms, Some(0.0));
        assert_eq!(result.console_output, Some(Vec::new()));
        assert_eq!(result.response, None);
    }
}

#[test]
fn thrown_error_is_runtime_error() {
    let result = process(
        &LambdaDefinition::javascript("function(data) { throw new Error('boom'); }"),
        &json!({}),
    );
    assert_eq!(result.status_code, StatusCode::RuntimeError);
    assert_eq!(result.status_message, "ERROR");
    assert_eq!(result.error.as_deref(), Some("boom"));
    assert_eq!(result.response, None);
    assert_eq!(result.console_output, None);
    assert_eq!(result.execution_time_in_ms, None);
}

#[test]
fn writes_before_a_throw_are_discarded() {
    let result = process(
        &LambdaDefinition::javascript(
            "function(data) { console.log('a'); console.log('b'); throw new Error('late'); }",
        ),
        &json!({}),
    );
    assert_eq!(result.status_code, StatusCode::RuntimeError);
    assert_eq!(result.console_output, None);
}

#[test]
fn typescript_matches_lowered_javascript() {
    let mut service = LambdaService::default();
    let data = json!({ "items": [1, 2, 3], "factor": 2 });

    let ts = service.process(
        &LambdaDefinition::typescript(
            "function(data: Input) {\n  const total: number = data.items.reduce((a: number, b: number) => a + b, 0);\n  console.log(total);\n  return total * data.factor;\n}\ninterface Input { items: number[]; factor: number }",
        ),
        &data,
    );
    let js = service.process(
        &LambdaDefinition::javascript(
            "function(data) {\n  const total = data.items.reduce((a, b) => a + b, 0);\n  console.log(total);\n  return total * data.factor;\n}",
        ),
        &data,
    );

    assert_eq!(ts.status_code, StatusCode::Ok);
    assert_eq!(ts.response, Some(json!(12)));
    assert_eq!(ts.response, js.response);
    assert_eq!(ts.console_output, js.console_output);
}

#[test]
fn typescript_syntax_error_is_runtime_error() {
    let result = process(
        &LambdaDefinition::typescript("function(data: number) { return data +; }"),
        &json!(1),
    );
    assert_eq!(result.status_code, StatusCode::RuntimeError);
    assert!(result.error.is_some());
    assert_eq!(result.execution_time_in_ms, None);
}

#[test]
fn repeated_calls_agree() {
    let mut service = LambdaService::default();
    let lambda = LambdaDefinition::javascript(
        "function(data) { return Object.keys(data).sort().map((k) => k + '=' + data[k]); }",
    );
    let data = json!({ "b": 2, "a": 1 });

    let first = service.process(&lambda, &data);
    let second = service.process(&lambda, &data);
    assert_eq!(first.status_code, second.status_code);
    assert_eq!(first.response, second.response);
    assert_eq!(first.response, Some(json!(["a=1", "b=2"])));
}

#[test]
fn input_is_passed_by_value() {
    let mut service = LambdaService::default();
    let lambda = LambdaDefinition::javascript("function(data) { data.x = 99; return data.x; }");
    let data = json!({ "x": 1 });

    assert_eq!(service.process(&lambda, &data).response, Some(json!(99)));
    assert_eq!(data, json!({ "x": 1 }));
}

#[test]
fn result_serializes_for_callers() {
    let result = process(
        &LambdaDefinition::javascript("function(data) { return null; }"),
        &json!(null),
    );
    let wire = serde_json::to_value(&result).unwrap();
    assert_eq!(wire["statusCode"], json!(1));
    assert_eq!(wire["response"], Value::Null);
    assert_eq!(wire["consoleOutput"], json!([]));
    assert!(wire["executionTimeInMs"].is_number());
}

#[test]
fn globals_do_not_carry_over_between_calls() {
    let mut service = LambdaService::default();
    let counter = LambdaDefinition::javascript(
        "function(data) { globalThis.n = (globalThis.n || 0) + 1; return globalThis.n; }",
    );
    assert_eq!(service.process(&counter, &json!({})).response, Some(json!(1)));
    assert_eq!(service.process(&counter, &json!({})).response, Some(json!(1)));
}

#[test]
fn one_callers_data_is_invisible_to_the_next() {
    let mut service = LambdaService::default();
    let writer = LambdaDefinition::javascript(
        "function(data) { globalThis.stash = data.secret; return true; }",
    );
    let reader = LambdaDefinition::javascript(
        "function(data) { return typeof stash === 'undefined' ? null : stash; }",
    );

    assert!(service.process(&writer, &json!({ "secret": "hunter2" })).is_success());
    let result = service.process(&reader, &json!({}));
    assert_eq!(result.status_code, StatusCode::Ok);
    assert_eq!(result.response, Some(Value::Null));
}

#[test]
fn prototype_writes_do_not_carry_over() {
    let mut service = LambdaService::default();
    let polluter = LambdaDefinition::javascript(
        "function(data) { Object.prototype.x = 999; Array.prototype.y = 1; return ({}).x; }",
    );
    let observer = LambdaDefinition::javascript(
        "function(data) { return [({}).x === undefined, [].y === undefined]; }",
    );

    assert_eq!(service.process(&polluter, &json!({})).response, Some(json!(999)));
    assert_eq!(service.process(&observer, &json!({})).response, Some(json!([true, true])));
}
