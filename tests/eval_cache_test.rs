use flyweb_client::{DecodeError, EvalCache};
use serde_json::json;

#[test]
fn identical_source_resolves_to_the_same_callable() {
    let cache = EvalCache::new().expect("expression engine");

    let first = cache.resolve("(x) => x").expect("compile");
    let second = cache.resolve("(x) => x").expect("compile");
    assert!(first.same(&second));
    assert_eq!(cache.len(), 1);

    let other = cache.resolve("(x) => x + 1").expect("compile");
    assert!(!first.same(&other));
    assert_eq!(cache.len(), 2);
}

#[test]
fn compiled_expression_round_trips_through_invocation() {
    let cache = EvalCache::new().expect("expression engine");

    let expr = cache.resolve("(ev) => 1").expect("compile");
    let result = cache.call(&expr, &json!({})).expect("call");
    assert_eq!(result, json!(1));
}

#[test]
fn argument_reaches_the_expression() {
    let cache = EvalCache::new().expect("expression engine");

    let expr = cache.resolve("(ev) => ev.target_id").expect("compile");
    let result = cache
        .call(&expr, &json!({"target_id": "widget"}))
        .expect("call");
    assert_eq!(result, json!("widget"));
}

#[test]
fn structured_results_come_back_as_json() {
    let cache = EvalCache::new().expect("expression engine");

    let expr = cache
        .resolve("(ev) => ({ doubled: ev.n * 2, ok: true })")
        .expect("compile");
    let result = cache.call(&expr, &json!({"n": 21})).expect("call");
    assert_eq!(result, json!({"doubled": 42, "ok": true}));
}

#[test]
fn undefined_result_maps_to_null() {
    let cache = EvalCache::new().expect("expression engine");

    let expr = cache.resolve("(ev) => undefined").expect("compile");
    let result = cache.call(&expr, &json!(null)).expect("call");
    assert_eq!(result, json!(null));
}

#[test]
fn syntax_error_is_a_decode_error() {
    let cache = EvalCache::new().expect("expression engine");

    let err = cache.resolve("((( this is not javascript").expect_err("must not compile");
    assert!(matches!(err, DecodeError::ExprCompile { .. }));
    assert!(cache.is_empty());
}

#[test]
fn non_function_source_is_rejected() {
    let cache = EvalCache::new().expect("expression engine");

    let err = cache.resolve("42").expect_err("must not resolve");
    assert!(matches!(err, DecodeError::ExprCompile { .. }));
}

#[test]
fn failed_compile_does_not_poison_later_resolves() {
    let cache = EvalCache::new().expect("expression engine");

    cache.resolve("(((").expect_err("must not compile");
    let expr = cache.resolve("(ev) => \"fine\"").expect("compile");
    assert_eq!(cache.call(&expr, &json!({})).expect("call"), json!("fine"));
}

#[test]
fn throwing_expression_surfaces_the_error() {
    let cache = EvalCache::new().expect("expression engine");

    let expr = cache
        .resolve("(ev) => { throw new Error(\"boom\"); }")
        .expect("compile");
    let err = cache.call(&expr, &json!({})).expect_err("must throw");
    assert!(format!("{err}").contains("boom"), "got: {err}");
}
