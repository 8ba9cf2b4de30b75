use jex_lang::ast::{BinOp, Expr, Statement, UnaryOp};
use jex_lang::parser::Parser;
use rust_decimal::Decimal;

fn parse(source: &str) -> Vec<Statement> {
    Parser::new(source)
        .expect("lexing should succeed")
        .parse_program()
        .expect("parsing should succeed")
}

fn parse_err(source: &str) -> String {
    match Parser::new(source) {
        Err(e) => e.message,
        Ok(mut parser) => parser.parse_program().unwrap_err().message,
    }
}

fn number(n: i64) -> Expr {
    Expr::Number(Decimal::from(n))
}

#[test]
fn test_let_statement() {
    let statements = parse("%let x = 1;");
    match &statements[0] {
        Statement::Let { name, value, .. } => {
            assert_eq!(name, "x");
            assert_eq!(value, &number(1));
        }
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_set_form_a() {
    let statements = parse("%set $.summary.total = 10;");
    match &statements[0] {
        Statement::Set { target: None, path, value, .. } => {
            assert_eq!(path, &Expr::JsonPath("$.summary.total".into()));
            assert_eq!(value, &number(10));
        }
        other => panic!("expected set, got {:?}", other),
    }
}

#[test]
fn test_set_form_b() {
    let statements = parse("%set &order, \"lines[0].sku\", \"A-1\";");
    match &statements[0] {
        Statement::Set {
            target: Some(target),
            path,
            value,
            ..
        } => {
            assert_eq!(target, &Expr::VarRef("order".into()));
            assert_eq!(path, &Expr::String("lines[0].sku".into()));
            assert_eq!(value, &Expr::String("A-1".into()));
        }
        other => panic!("expected set, got {:?}", other),
    }
}

#[test]
fn test_json_path_literal_reassembly() {
    let statements = parse("%let p = $.a.b[0]['with space'][*];");
    match &statements[0] {
        Statement::Let { value, .. } => {
            assert_eq!(
                value,
                &Expr::JsonPath("$.a.b[0]['with space'][*]".into())
            );
        }
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_json_path_with_runtime_index_stays_postfix() {
    let statements = parse("%let v = $.items[&i];");
    match &statements[0] {
        Statement::Let { value, .. } => match value {
            Expr::Index { base, index } => {
                assert_eq!(base.as_ref(), &Expr::JsonPath("$.items".into()));
                assert_eq!(index.as_ref(), &Expr::VarRef("i".into()));
            }
            other => panic!("expected index access, got {:?}", other),
        },
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_builtin_var_and_property_chain() {
    let statements = parse("%let name = $in.customer.name;");
    match &statements[0] {
        Statement::Let { value, .. } => {
            assert_eq!(
                value,
                &Expr::Property {
                    base: Box::new(Expr::Property {
                        base: Box::new(Expr::BuiltinVar("in".into())),
                        name: "customer".into(),
                    }),
                    name: "name".into(),
                }
            );
        }
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_precedence_or_lowest_mul_highest() {
    let statements = parse("%let x = 1 + 2 * 3 == 7 && true || false;");
    match &statements[0] {
        Statement::Let { value, .. } => match value {
            Expr::Binary { op: BinOp::Or, left, .. } => match left.as_ref() {
                Expr::Binary { op: BinOp::And, left, .. } => match left.as_ref() {
                    Expr::Binary { op: BinOp::Equal, left, .. } => match left.as_ref() {
                        Expr::Binary { op: BinOp::Add, right, .. } => {
                            assert!(matches!(
                                right.as_ref(),
                                Expr::Binary { op: BinOp::Multiply, .. }
                            ));
                        }
                        other => panic!("expected addition, got {:?}", other),
                    },
                    other => panic!("expected equality, got {:?}", other),
                },
                other => panic!("expected and, got {:?}", other),
            },
            other => panic!("expected or at the root, got {:?}", other),
        },
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_unary_operators() {
    let statements = parse("%let x = !&flag; %let y = -3;");
    assert!(matches!(
        &statements[0],
        Statement::Let { value: Expr::Unary { op: UnaryOp::Not, .. }, .. }
    ));
    assert!(matches!(
        &statements[1],
        Statement::Let { value: Expr::Unary { op: UnaryOp::Negate, .. }, .. }
    ));
}

#[test]
fn test_if_then_else() {
    let statements = parse(
        "%if (&a > 1) %then %do; %let x = 1; %else %do; %let x = 2; %end;",
    );
    match &statements[0] {
        Statement::If {
            then_branch,
            else_branch,
            ..
        } => {
            assert_eq!(then_branch.len(), 1);
            assert_eq!(else_branch.as_ref().unwrap().len(), 1);
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn test_foreach_and_do_loop() {
    let statements = parse(
        "%foreach item %in $in.items %do; %let x = &item; %end;\n\
         %do i = 1 %to 10; %let y = &i; %end;",
    );
    assert!(matches!(&statements[0], Statement::Foreach { var, .. } if var == "item"));
    assert!(matches!(&statements[1], Statement::DoLoop { var, .. } if var == "i"));
}

#[test]
fn test_function_declaration() {
    let statements = parse(
        "%func total(a, b); %return &a + &b; %endfunc;",
    );
    match &statements[0] {
        Statement::FunctionDecl(func) => {
            assert_eq!(func.name, "total");
            assert_eq!(func.params, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(func.body.len(), 1);
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_nested_end_blocks_inside_function() {
    let statements = parse(
        "%func pick(n); %if (&n > 0) %then %do; %return 1; %end; %return 0; %endfunc;",
    );
    match &statements[0] {
        Statement::FunctionDecl(func) => assert_eq!(func.body.len(), 2),
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_function_inside_block_is_rejected() {
    let message = parse_err(
        "%if (true) %then %do; %func f(); %return 1; %endfunc; %end;",
    );
    assert!(message.contains("top level"));
}

#[test]
fn test_object_and_array_literals() {
    let statements = parse("%let o = { name: \"x\", \"with space\": [1, 2] };");
    match &statements[0] {
        Statement::Let { value: Expr::Object(pairs), .. } => {
            assert_eq!(pairs[0].0, "name");
            assert_eq!(pairs[1].0, "with space");
            assert!(matches!(&pairs[1].1, Expr::Array(items) if items.len() == 2));
        }
        other => panic!("expected object literal, got {:?}", other),
    }
}

#[test]
fn test_call_with_arguments() {
    let statements = parse("%let r = round(&total, 2);");
    match &statements[0] {
        Statement::Let { value: Expr::Call { name, args, .. }, .. } => {
            assert_eq!(name, "round");
            assert_eq!(args.len(), 2);
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_bare_identifier_is_a_variable_reference() {
    let statements = parse("%let x = total;");
    assert!(matches!(
        &statements[0],
        Statement::Let { value: Expr::VarRef(name), .. } if name == "total"
    ));
}

#[test]
fn test_method_call_is_rejected() {
    assert!(parse_err("%let x = &a.foo();").contains("method call"));
}

#[test]
fn test_missing_semicolon_fails() {
    assert!(parse_err("%let x = 1").contains("';'"));
}

#[test]
fn test_unclosed_block_fails() {
    assert!(parse_err("%foreach x %in &xs %do; %let y = &x;").contains("%end"));
}

#[test]
fn test_empty_statements_are_skipped() {
    let statements = parse(";; %let x = 1; ;;");
    assert_eq!(statements.len(), 1);
}

#[test]
fn test_return_with_and_without_value() {
    let statements = parse("%func f(); %return; %endfunc; %func g(); %return 1; %endfunc;");
    match (&statements[0], &statements[1]) {
        (Statement::FunctionDecl(f), Statement::FunctionDecl(g)) => {
            assert!(matches!(&f.body[0], Statement::Return { value: None, .. }));
            assert!(matches!(&g.body[0], Statement::Return { value: Some(_), .. }));
        }
        other => panic!("expected two functions, got {:?}", other),
    }
}
