use jex_lang::{normalize, JexError, NormalizerOptions};
use serde_json::json;

fn defaults() -> NormalizerOptions {
    NormalizerOptions::default()
}

// Scenario: a single embedded document is parsed in place.
#[test]
fn test_embedded_json_is_expanded() {
    let input = json!({"data": "{\"x\":1}"});
    let output = normalize(&input, &defaults()).unwrap();
    assert_eq!(output, json!({"data": {"x": 1}}));
}

#[test]
fn test_argument_is_never_mutated() {
    let input = json!({"data": "{\"x\":1}"});
    let before = input.clone();
    let _ = normalize(&input, &defaults()).unwrap();
    assert_eq!(input, before);
}

#[test]
fn test_non_json_strings_are_left_alone() {
    let input = json!({
        "plain": "hello world",
        "braceless": "x: 1",
        "short": "{}",
        "numbers": [1, 2.5, true, null]
    });
    let output = normalize(&input, &defaults()).unwrap();
    assert_eq!(output["plain"], json!("hello world"));
    assert_eq!(output["braceless"], json!("x: 1"));
    // "{}" parses to an empty object
    assert_eq!(output["short"], json!({}));
    assert_eq!(output["numbers"], json!([1, 2.5, true, null]));
}

#[test]
fn test_escaped_layers_are_peeled() {
    // The payload is escaped once: the raw text is {\"x\":1}
    let input = json!({"data": "{\\\"x\\\":1}"});
    let output = normalize(&input, &defaults()).unwrap();
    assert_eq!(output, json!({"data": {"x": 1}}));
}

#[test]
fn test_depth_per_string_cap_leaves_string() {
    let options = NormalizerOptions {
        max_depth_per_string: 0,
        ..defaults()
    };
    let input = json!({"data": "{\\\"x\\\":1}"});
    let output = normalize(&input, &options).unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_replacements_recurse_into_parsed_nodes() {
    let inner = json!({"deep": "{\"deeper\": 1}"});
    let input = json!({"data": serde_json::to_string(&inner).unwrap()});
    let output = normalize(&input, &defaults()).unwrap();
    assert_eq!(output, json!({"data": {"deep": {"deeper": 1}}}));
}

// Scenario: the node budget trips on a wide object.
#[test]
fn test_node_budget_is_enforced() {
    let options = NormalizerOptions {
        max_nodes_visited: 3,
        ..defaults()
    };
    let input = json!({"a": 1, "b": 2, "c": 3, "d": 4, "e": 5});
    let err = normalize(&input, &options).unwrap_err();
    match err {
        JexError::Limit(limit) => {
            assert_eq!(limit.name, "MaxNodesVisited");
            assert_eq!(limit.limit, 3);
        }
        other => panic!("expected limit error, got {:?}", other),
    }
}

#[test]
fn test_replacement_budget_is_enforced() {
    let options = NormalizerOptions {
        max_total_replacements: 1,
        ..defaults()
    };
    let input = json!({"a": "{\"x\":1}", "b": "{\"y\":2}"});
    let err = normalize(&input, &options).unwrap_err();
    match err {
        JexError::Limit(limit) => assert_eq!(limit.name, "MaxTotalReplacements"),
        other => panic!("expected limit error, got {:?}", other),
    }
}

#[test]
fn test_oversized_strings_are_not_attempted() {
    let payload = format!("{{\"k\":\"{}\"}}", "v".repeat(100));
    let options = NormalizerOptions {
        max_string_length: 50,
        ..defaults()
    };
    let input = json!({"data": payload});
    let output = normalize(&input, &options).unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_strict_mode_raises_on_unparseable_candidate() {
    let options = NormalizerOptions {
        strict: true,
        ..defaults()
    };
    // Looks bracketed but is not JSON and survives no unescape layer.
    let input = json!({"data": "{definitely not json}"});
    let err = normalize(&input, &options).unwrap_err();
    assert!(matches!(err, JexError::Runtime(_)));

    let lenient = normalize(&input, &defaults()).unwrap();
    assert_eq!(lenient, input);
}

// Running the normalizer twice is the same as running it once.
#[test]
fn test_idempotence() {
    let input = json!({
        "data": "{\"x\": \"{\\\"y\\\": 2}\"}",
        "list": ["[1,2,3]", "plain"]
    });
    let once = normalize(&input, &defaults()).unwrap();
    let twice = normalize(&once, &defaults()).unwrap();
    assert_eq!(once, twice);
}
