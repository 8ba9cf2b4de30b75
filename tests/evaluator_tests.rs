use jex_lang::{Engine, ExecutionOptions, JexError};
use serde_json::{json, Value as Json};

fn run(script: &str, input: Json) -> Json {
    Engine::new()
        .run_script(script, &input)
        .expect("execution should succeed")
}

fn run_with(script: &str, input: Json, options: ExecutionOptions) -> Result<Json, JexError> {
    let engine = Engine::new();
    let program = engine.compile(script)?;
    engine.execute_with(&program, &input, None, options)
}

#[test]
fn test_let_and_set() {
    let output = run("%let x = 1 + 2; %set $.x = &x;", json!({}));
    assert_eq!(output, json!({"x": 3}));
}

#[test]
fn test_set_creates_intermediate_containers() {
    let output = run("%set $.a.b[1].c = \"deep\";", json!({}));
    assert_eq!(output, json!({"a": {"b": [null, {"c": "deep"}]}}));
}

#[test]
fn test_set_form_b_mutates_a_variable() {
    let output = run(
        "%let order = obj(\"id\", 7);\n\
         %set &order, \"lines[0].sku\", \"A-1\";\n\
         %set $.order = &order;",
        json!({}),
    );
    assert_eq!(
        output,
        json!({"order": {"id": 7, "lines": [{"sku": "A-1"}]}})
    );
}

#[test]
fn test_set_through_input_root_is_rejected() {
    let err = Engine::new()
        .run_script("%set $in.x = 1;", &json!({}))
        .unwrap_err();
    assert!(matches!(err, JexError::Runtime(_)));
}

#[test]
fn test_if_else_branches() {
    let script = "%if ($in.n > 10) %then %do; %set $.size = \"big\"; \
                  %else %do; %set $.size = \"small\"; %end;";
    assert_eq!(run(script, json!({"n": 25})), json!({"size": "big"}));
    assert_eq!(run(script, json!({"n": 5})), json!({"size": "small"}));
}

#[test]
fn test_foreach_iterates_arrays_in_order() {
    let output = run(
        "%let names = \"\";\n\
         %foreach user %in $in.users %do;\n\
             %let names = &names + &user.name + \";\";\n\
         %end;\n\
         %set $.names = &names;",
        json!({"users": [{"name": "a"}, {"name": "b"}, {"name": "c"}]}),
    );
    assert_eq!(output, json!({"names": "a;b;c;"}));
}

#[test]
fn test_foreach_over_null_does_not_execute() {
    let output = run(
        "%let n = 0; %foreach x %in $in.missing %do; %let n = &n + 1; %end; %set $.n = &n;",
        json!({}),
    );
    assert_eq!(output, json!({"n": 0}));
}

#[test]
fn test_foreach_treats_scalar_as_single_element() {
    let output = run(
        "%let n = 0; %foreach x %in $in.one %do; %let n = &n + &x; %end; %set $.n = &n;",
        json!({"one": 41}),
    );
    assert_eq!(output, json!({"n": 41}));
}

// Scenario: break terminates after the third element.
#[test]
fn test_break_stops_iteration() {
    let output = run(
        "%let iterations = 0;\n\
         %foreach num %in $in.numbers %do;\n\
             %let iterations = &iterations + 1;\n\
             %if (&num == 3) %then %do;\n\
                 %break;\n\
             %end;\n\
         %end;\n\
         %set $.iterations = &iterations;",
        json!({"numbers": [1, 2, 3, 4, 5]}),
    );
    assert_eq!(output, json!({"iterations": 3}));
}

// Scenario: continue skips only the matching element.
#[test]
fn test_continue_skips_element() {
    let output = run(
        "%let sum = 0;\n\
         %foreach num %in $in.numbers %do;\n\
             %if (&num == 3) %then %do;\n\
                 %continue;\n\
             %end;\n\
             %let sum = &sum + &num;\n\
         %end;\n\
         %set $.sum = &sum;",
        json!({"numbers": [1, 2, 3, 4, 5]}),
    );
    assert_eq!(output, json!({"sum": 12}));
}

#[test]
fn test_do_loop_inclusive_bounds() {
    let output = run(
        "%let sum = 0; %do i = 1 %to 5; %let sum = &sum + &i; %end; %set $.sum = &sum;",
        json!({}),
    );
    assert_eq!(output, json!({"sum": 15}));
}

// Scenario: a runaway loop trips MaxLoopIterations.
#[test]
fn test_loop_limit_is_enforced() {
    let options = ExecutionOptions {
        max_loop_iterations: 100,
        ..Default::default()
    };
    let err = run_with(
        "%do i = 1 %to 1000000; %let x = &i; %end;",
        json!({}),
        options,
    )
    .unwrap_err();
    match err {
        JexError::Limit(limit) => {
            assert_eq!(limit.name, "MaxLoopIterations");
            assert_eq!(limit.limit, 100);
        }
        other => panic!("expected limit error, got {:?}", other),
    }
}

#[test]
fn test_recursion_limit_is_enforced() {
    let options = ExecutionOptions {
        max_recursion_depth: 10,
        ..Default::default()
    };
    let err = run_with(
        "%func spin(); %return spin(); %endfunc; %set $.x = spin();",
        json!({}),
        options,
    )
    .unwrap_err();
    match err {
        JexError::Limit(limit) => {
            assert_eq!(limit.name, "MaxRecursionDepth");
            assert_eq!(limit.limit, 10);
        }
        other => panic!("expected limit error, got {:?}", other),
    }
}

// Scenario: recursive factorial.
#[test]
fn test_recursive_factorial() {
    let output = run(
        "%func factorial(n);\n\
             %if (&n <= 1) %then %do;\n\
                 %return 1;\n\
             %end;\n\
             %return &n * factorial(&n - 1);\n\
         %endfunc;\n\
         %set $.result = factorial(5);",
        json!({}),
    );
    assert_eq!(output, json!({"result": 120}));
}

#[test]
fn test_function_missing_arguments_bind_null() {
    let output = run(
        "%func greet(name, title); %return \"&title &name\"; %endfunc;\n\
         %set $.greeting = greet(\"Ada\");",
        json!({}),
    );
    // title is null, whose string form is empty
    assert_eq!(output, json!({"greeting": " Ada"}));
}

#[test]
fn test_bare_return_yields_null() {
    let output = run(
        "%func nothing(); %return; %endfunc; %set $.x = isNull(nothing());",
        json!({}),
    );
    assert_eq!(output, json!({"x": true}));
}

#[test]
fn test_top_level_return_ends_execution() {
    let output = run("%set $.a = 1; %return; %set $.b = 2;", json!({}));
    assert_eq!(output, json!({"a": 1}));
}

#[test]
fn test_macro_expansion_in_string_literals() {
    let output = run(
        "%let id = 42; %let label = \"order-&id ready\"; %set $.label = &label;",
        json!({}),
    );
    assert_eq!(output, json!({"label": "order-42 ready"}));
}

#[test]
fn test_macro_expansion_unknown_and_bare_ampersand() {
    let output = run(
        "%let x = 5; %set $.s = \"x=&x, gone=&gone, raw=& 1\";",
        json!({}),
    );
    // an unknown variable expands to the empty string; `&` before a
    // non-identifier character stays put
    assert_eq!(output, json!({"s": "x=5, gone=, raw=& 1"}));
}

#[test]
fn test_scope_function_let_is_not_visible_to_caller() {
    let output = run(
        "%let x = \"outer\";\n\
         %func shadow(); %let x = \"inner\"; %return &x; %endfunc;\n\
         %let inner = shadow();\n\
         %set $.x = &x;\n\
         %set $.inner = &inner;",
        json!({}),
    );
    assert_eq!(output, json!({"x": "outer", "inner": "inner"}));
}

#[test]
fn test_scope_loop_let_updates_outer_binding() {
    let output = run(
        "%let total = 0;\n\
         %do i = 1 %to 3; %let total = &total + &i; %end;\n\
         %set $.total = &total;",
        json!({}),
    );
    assert_eq!(output, json!({"total": 6}));
}

#[test]
fn test_loop_variable_shadows_outer_binding() {
    let output = run(
        "%let i = \"untouched\";\n\
         %do i = 1 %to 3; %end;\n\
         %set $.i = &i;",
        json!({}),
    );
    assert_eq!(output, json!({"i": "untouched"}));
}

#[test]
fn test_strict_mode_missing_variable_fails() {
    let options = ExecutionOptions {
        strict: true,
        ..Default::default()
    };
    let err = run_with("%set $.x = &nope;", json!({}), options).unwrap_err();
    match err {
        JexError::Runtime(e) => assert!(e.message.contains("nope")),
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn test_lenient_mode_missing_variable_is_null() {
    let output = run("%set $.x = isNull(&nope);", json!({}));
    assert_eq!(output, json!({"x": true}));
}

#[test]
fn test_strict_mode_missing_property_fails() {
    let options = ExecutionOptions {
        strict: true,
        ..Default::default()
    };
    assert!(run_with("%set $.x = $in.absent;", json!({}), options).is_err());
}

#[test]
fn test_division_and_modulo_by_zero_yield_zero() {
    let output = run("%set $.d = 10 / 0; %set $.m = 10 % 0;", json!({}));
    assert_eq!(output, json!({"d": 0, "m": 0}));
}

#[test]
fn test_decimal_arithmetic_is_exact() {
    let output = run("%set $.x = 0.1 + 0.2;", json!({}));
    assert_eq!(output, json!({"x": 0.3}));
}

#[test]
fn test_plus_concatenates_when_either_side_is_string() {
    let output = run("%set $.a = \"n=\" + 5; %set $.b = 1 + 2;", json!({}));
    assert_eq!(output, json!({"a": "n=5", "b": 3}));
}

#[test]
fn test_equality_mixed_kinds_compares_strings() {
    let output = run(
        "%set $.numStr = 1 == \"1\"; %set $.nullEmpty = null == \"\"; %set $.nulls = null == null;",
        json!({}),
    );
    assert_eq!(
        output,
        json!({"numStr": true, "nullEmpty": false, "nulls": true})
    );
}

#[test]
fn test_negative_array_index_counts_from_end() {
    let output = run("%set $.last = $in.items[-1];", json!({"items": [1, 2, 3]}));
    assert_eq!(output, json!({"last": 3}));
}

#[test]
fn test_runtime_index_in_set_path() {
    let output = run(
        "%do i = 0 %to 2; %set $.copies[&i] = &i * 10; %end;",
        json!({}),
    );
    assert_eq!(output, json!({"copies": [0, 10, 20]}));
}

#[test]
fn test_unknown_builtin_variable_fails() {
    let err = Engine::new()
        .run_script("%set $.x = $bogus;", &json!({}))
        .unwrap_err();
    match err {
        JexError::Runtime(e) => assert!(e.message.contains("bogus")),
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn test_unknown_function_fails() {
    let err = Engine::new()
        .run_script("%set $.x = definitelyNotAFunction();", &json!({}))
        .unwrap_err();
    match err {
        JexError::Runtime(e) => assert!(e.message.contains("definitelyNotAFunction")),
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn test_arity_is_checked_before_invocation() {
    let err = Engine::new()
        .run_script("%set $.x = substr(\"abc\");", &json!({}))
        .unwrap_err();
    match err {
        JexError::Runtime(e) => assert!(e.message.contains("at least")),
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn test_meta_root_is_available() {
    let engine = Engine::new();
    let program = engine
        .compile("%set $.source = $meta.source; %set $.noMeta = isNull($meta);")
        .unwrap();
    let meta = json!({"source": "pipeline-7"});
    let output = engine
        .execute_with(&program, &json!({}), Some(&meta), ExecutionOptions::default())
        .unwrap();
    assert_eq!(output, json!({"source": "pipeline-7", "noMeta": false}));

    let output = engine.execute(&program, &json!({})).unwrap();
    assert_eq!(output, json!({"source": null, "noMeta": true}));
}

#[test]
fn test_output_root_is_readable_during_execution() {
    let output = run(
        "%set $.a = 2; %set $.b = $out.a * 3;",
        json!({}),
    );
    assert_eq!(output, json!({"a": 2, "b": 6}));
}

#[test]
fn test_output_size_limit() {
    let options = ExecutionOptions {
        max_output_size_bytes: 16,
        ..Default::default()
    };
    let err = run_with(
        "%set $.blob = \"a long string that will not fit\";",
        json!({}),
        options,
    )
    .unwrap_err();
    match err {
        JexError::Limit(limit) => assert_eq!(limit.name, "MaxOutputSizeBytes"),
        other => panic!("expected limit error, got {:?}", other),
    }
}
