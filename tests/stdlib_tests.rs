use jex_lang::Engine;
use serde_json::{json, Value as Json};

fn run(script: &str, input: Json) -> Json {
    Engine::new()
        .run_script(script, &input)
        .expect("execution should succeed")
}

fn eval(expr: &str, input: Json) -> Json {
    let output = run(&format!("%set $.r = {};", expr), input);
    output.get("r").cloned().unwrap_or(Json::Null)
}

// ----------------------------------------------------------------------
// JSONPath
// ----------------------------------------------------------------------

#[test]
fn test_jp1_returns_first_match_or_null() {
    let input = json!({"cart": {"items": [{"sku": "A"}, {"sku": "B"}]}});
    assert_eq!(eval("jp1($in, $.cart.items[0].sku)", input.clone()), json!("A"));
    assert_eq!(eval("jp1($in, $.cart.absent)", input), Json::Null);
}

#[test]
fn test_jp_all_collects_matches() {
    let input = json!({"items": [{"price": 1}, {"price": 2}, {"note": "x"}]});
    assert_eq!(eval("jpAll($in, $.items[*].price)", input), json!([1, 2]));
}

#[test]
fn test_jp_all_recursive_descent() {
    let input = json!({"a": {"price": 1}, "b": [{"price": 2}]});
    assert_eq!(eval("jpAll($in, \"$..price\")", input), json!([1, 2]));
}

#[test]
fn test_coalesce_path_skips_nulls() {
    let input = json!({"a": null, "b": 5});
    assert_eq!(eval("coalescePath($in, $.a, $.b)", input.clone()), json!(5));
    assert_eq!(eval("coalescePath($in, $.x, $.y)", input), Json::Null);
}

#[test]
fn test_exists_path_sees_json_null() {
    let input = json!({"a": null});
    assert_eq!(eval("existsPath($in, $.a)", input.clone()), json!(true));
    assert_eq!(eval("existsPath($in, $.b)", input), json!(false));
}

// ----------------------------------------------------------------------
// Strings
// ----------------------------------------------------------------------

#[test]
fn test_string_case_and_trim() {
    assert_eq!(eval("upper(\"jex\")", json!({})), json!("JEX"));
    assert_eq!(eval("lower(\"JEX\")", json!({})), json!("jex"));
    assert_eq!(eval("trim(\"  x  \")", json!({})), json!("x"));
}

#[test]
fn test_substr_clamps() {
    assert_eq!(eval("substr(\"hello\", 1, 3)", json!({})), json!("ell"));
    assert_eq!(eval("substr(\"hello\", -2, 2)", json!({})), json!("he"));
    assert_eq!(eval("substr(\"hello\", 99)", json!({})), json!(""));
    assert_eq!(eval("substr(\"hello\", 1, -1)", json!({})), json!(""));
}

#[test]
fn test_left_and_right() {
    assert_eq!(eval("left(\"abcdef\", 2)", json!({})), json!("ab"));
    assert_eq!(eval("right(\"abcdef\", 2)", json!({})), json!("ef"));
    assert_eq!(eval("right(\"ab\", 9)", json!({})), json!("ab"));
}

#[test]
fn test_split_and_join() {
    assert_eq!(
        eval("split(\"a,b,c\", \",\")", json!({})),
        json!(["a", "b", "c"])
    );
    assert_eq!(
        eval("join(split(\"a,b,c\", \",\"), \"-\")", json!({})),
        json!("a-b-c")
    );
}

#[test]
fn test_replace() {
    assert_eq!(
        eval("replace(\"a-b-c\", \"-\", \"+\")", json!({})),
        json!("a+b+c")
    );
}

#[test]
fn test_regex_match_and_replace() {
    assert_eq!(
        eval("regexMatch(\"order-123\", \"^order-[0-9]+$\")", json!({})),
        json!(true)
    );
    assert_eq!(
        eval("regexMatch(\"order-abc\", \"^order-[0-9]+$\")", json!({})),
        json!(false)
    );
    assert_eq!(
        eval("regexReplace(\"a1b2\", \"[0-9]\", \"#\")", json!({})),
        json!("a#b#")
    );
}

#[test]
fn test_invalid_regex_is_a_runtime_error() {
    let err = Engine::new()
        .run_script("%set $.x = regexMatch(\"a\", \"(unclosed\");", &json!({}))
        .unwrap_err();
    assert!(err.to_string().contains("regexMatch"));
}

#[test]
fn test_concat_and_length() {
    assert_eq!(eval("concat(\"a\", 1, null, true)", json!({})), json!("a1true"));
    assert_eq!(eval("length(\"héllo\")", json!({})), json!(5));
    assert_eq!(eval("length(arr(1, 2, 3))", json!({})), json!(3));
    assert_eq!(eval("length(obj(\"a\", 1))", json!({})), json!(1));
    assert_eq!(eval("length(42)", json!({})), json!(0));
}

// ----------------------------------------------------------------------
// Math
// ----------------------------------------------------------------------

#[test]
fn test_math_builtins() {
    assert_eq!(eval("abs(-4.5)", json!({})), json!(4.5));
    assert_eq!(eval("min(3, 7)", json!({})), json!(3));
    assert_eq!(eval("max(3, 7)", json!({})), json!(7));
    assert_eq!(eval("floor(2.9)", json!({})), json!(2));
    assert_eq!(eval("ceil(2.1)", json!({})), json!(3));
}

#[test]
fn test_round_midpoint_away_from_zero() {
    assert_eq!(eval("round(15.497, 2)", json!({})), json!(15.5));
    assert_eq!(eval("round(2.5)", json!({})), json!(3));
    assert_eq!(eval("round(-2.5)", json!({})), json!(-3));
}

// ----------------------------------------------------------------------
// Dates
// ----------------------------------------------------------------------

#[test]
fn test_parse_and_format_roundtrip() {
    let r = eval(
        "formatDate(parseDate(\"2024-03-01T10:30:00+02:00\"), \"o\")",
        json!({}),
    );
    assert_eq!(r, json!("2024-03-01T10:30:00+02:00"));
}

#[test]
fn test_parse_date_without_offset_is_utc() {
    let r = eval("formatDate(parseDate(\"2024-03-01\"), \"o\")", json!({}));
    assert_eq!(r, json!("2024-03-01T00:00:00+00:00"));
}

#[test]
fn test_parse_date_failure_is_null() {
    assert_eq!(eval("parseDate(\"not a date\")", json!({})), Json::Null);
}

#[test]
fn test_date_add_units() {
    let base = "parseDate(\"2024-01-31T00:00:00+00:00\")";
    assert_eq!(
        eval(&format!("formatDate(dateAdd({base}, \"days\", 1), \"o\")"), json!({})),
        json!("2024-02-01T00:00:00+00:00")
    );
    // clamped to the shorter month
    assert_eq!(
        eval(&format!("formatDate(dateAdd({base}, \"months\", 1), \"o\")"), json!({})),
        json!("2024-02-29T00:00:00+00:00")
    );
    assert_eq!(
        eval(&format!("formatDate(dateAdd({base}, \"years\", -1), \"o\")"), json!({})),
        json!("2023-01-31T00:00:00+00:00")
    );
}

#[test]
fn test_date_diff_is_signed_whole_units() {
    let r = eval(
        "dateDiff(parseDate(\"2024-01-01\"), parseDate(\"2024-01-08\"), \"days\")",
        json!({}),
    );
    assert_eq!(r, json!(7));
    let r = eval(
        "dateDiff(parseDate(\"2024-01-08\"), parseDate(\"2024-01-01\"), \"hours\")",
        json!({}),
    );
    assert_eq!(r, json!(-168));
}

// ----------------------------------------------------------------------
// Type operations
// ----------------------------------------------------------------------

#[test]
fn test_type_coercions() {
    assert_eq!(eval("toString(12.5)", json!({})), json!("12.5"));
    assert_eq!(eval("toNumber(\"12.5\")", json!({})), json!(12.5));
    assert_eq!(eval("toNumber(\"junk\")", json!({})), json!(0));
    assert_eq!(eval("toBool(\"\")", json!({})), json!(false));
    assert_eq!(eval("toBool(\"x\")", json!({})), json!(true));
}

#[test]
fn test_number_string_roundtrip_preserves_scale() {
    assert_eq!(eval("toString(toNumber(\"15.50\"))", json!({})), json!("15.50"));
    assert_eq!(eval("toString(toNumber(\"154.97\"))", json!({})), json!("154.97"));
}

#[test]
fn test_is_empty() {
    assert_eq!(eval("isEmpty(null)", json!({})), json!(true));
    assert_eq!(eval("isEmpty(\"\")", json!({})), json!(true));
    assert_eq!(eval("isEmpty(arr())", json!({})), json!(true));
    assert_eq!(eval("isEmpty(obj())", json!({})), json!(true));
    assert_eq!(eval("isEmpty(0)", json!({})), json!(false));
    assert_eq!(eval("isEmpty(arr(1))", json!({})), json!(false));
}

#[test]
fn test_type_of() {
    assert_eq!(eval("typeOf(null)", json!({})), json!("null"));
    assert_eq!(eval("typeOf(true)", json!({})), json!("boolean"));
    assert_eq!(eval("typeOf(1.5)", json!({})), json!("number"));
    assert_eq!(eval("typeOf(\"s\")", json!({})), json!("string"));
    assert_eq!(eval("typeOf(now())", json!({})), json!("datetime"));
    assert_eq!(eval("typeOf(arr())", json!({})), json!("array"));
    assert_eq!(eval("typeOf(obj())", json!({})), json!("object"));
}

// ----------------------------------------------------------------------
// Arrays and objects
// ----------------------------------------------------------------------

#[test]
fn test_arr_and_obj_builders() {
    assert_eq!(eval("arr(1, \"two\", null)", json!({})), json!([1, "two", null]));
    assert_eq!(
        eval("obj(\"a\", 1, \"b\", 2)", json!({})),
        json!({"a": 1, "b": 2})
    );
    // odd trailing key is dropped
    assert_eq!(eval("obj(\"a\", 1, \"orphan\")", json!({})), json!({"a": 1}));
}

#[test]
fn test_push_mutates_the_variable_in_place() {
    let output = run(
        "%let xs = arr();\n\
         %do i = 1 %to 3; push(&xs, &i * 10); %end;\n\
         %set $.xs = &xs;",
        json!({}),
    );
    assert_eq!(output, json!({"xs": [10, 20, 30]}));
}

#[test]
fn test_first_last_count() {
    let input = json!({"xs": [7, 8, 9]});
    assert_eq!(eval("first($in.xs)", input.clone()), json!(7));
    assert_eq!(eval("last($in.xs)", input.clone()), json!(9));
    assert_eq!(eval("count($in.xs)", input), json!(3));
    assert_eq!(eval("first(arr())", json!({})), Json::Null);
}

#[test]
fn test_index_by_last_wins() {
    let input = json!({"xs": [
        {"id": "a", "n": 1},
        {"id": "b", "n": 2},
        {"id": "a", "n": 3}
    ]});
    let output = eval("indexBy($in.xs, $.id)", input);
    assert_eq!(
        output,
        json!({"a": {"id": "a", "n": 3}, "b": {"id": "b", "n": 2}})
    );
}

#[test]
fn test_lookup() {
    let input = json!({"map": {"k": 42}});
    assert_eq!(eval("lookup($in.map, \"k\")", input.clone()), json!(42));
    assert_eq!(eval("lookup($in.map, \"missing\")", input), Json::Null);
}

// ----------------------------------------------------------------------
// setPath and JSON-in-string expansion
// ----------------------------------------------------------------------

#[test]
fn test_set_path_builtin() {
    let output = run(
        "%let o = obj();\n\
         setPath(&o, \"a.b[0]\", \"deep\");\n\
         setPath($out, \"copied\", &o);",
        json!({}),
    );
    assert_eq!(output, json!({"copied": {"a": {"b": ["deep"]}}}));
}

#[test]
fn test_expand_json_at_path() {
    let input = json!({"payload": "{\"x\": 1}", "other": "[not json"});
    let output = eval("expandJson($in, \"payload\")", input);
    assert_eq!(output["payload"], json!({"x": 1}));
    assert_eq!(output["other"], json!("[not json"));
}

// Scenario: nested escaping stops at the depth cap.
#[test]
fn test_expand_json_all_depth_cap() {
    let l4 = json!({"value": 4});
    let l3 = json!({"nested": serde_json::to_string(&l4).unwrap()});
    let l2 = json!({"nested": serde_json::to_string(&l3).unwrap()});
    let input = json!({"nested": serde_json::to_string(&l2).unwrap()});

    let output = eval("expandJsonAll($in, 2)", input);
    // two parses succeed, the third level stays a string
    assert_eq!(output["nested"]["nested"]["nested"], json!("{\"value\":4}"));
}

#[test]
fn test_expand_json_all_unbounded_enough_depth() {
    let inner = json!({"deep": true});
    let input = json!({"wrapped": serde_json::to_string(&inner).unwrap()});
    let output = eval("expandJsonAll($in)", input);
    assert_eq!(output, json!({"wrapped": {"deep": true}}));
}
