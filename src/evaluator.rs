use crate::ast::{BinOp, Expr, Function, Program, Span, Statement, UnaryOp};
use crate::context::ExecutionContext;
use crate::engine::{FunctionKind, FunctionRegistry};
use crate::error::{JexError, RuntimeError};
use crate::library::LibraryManager;
use crate::paths::{parse_set_path, set_by_path, PathRoot};
use crate::value::Value;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value as Json;
use std::sync::Arc;

/// A mutation target: the only places the language can write through are
/// variables and `$out`.
enum Place {
    Var(String),
    Out,
}

/// Tree-walking interpreter over a compiled program.
///
/// The evaluator borrows the immutable program, the engine registry, and
/// the library manager; all mutable state lives in the per-execution
/// [`ExecutionContext`].
pub struct Evaluator<'a> {
    program: &'a Program,
    registry: &'a FunctionRegistry,
    libraries: &'a LibraryManager,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        program: &'a Program,
        registry: &'a FunctionRegistry,
        libraries: &'a LibraryManager,
    ) -> Self {
        Evaluator {
            program,
            registry,
            libraries,
        }
    }

    /// Execute the top-level statements. A `%return` at top level ends the
    /// execution.
    pub fn run(&self, ctx: &mut ExecutionContext) -> Result<(), JexError> {
        self.exec_block(&self.program.statements, ctx)?;
        ctx.flags.returning = false;
        ctx.flags.return_value = None;
        Ok(())
    }

    fn exec_block(&self, statements: &[Statement], ctx: &mut ExecutionContext) -> Result<(), JexError> {
        for statement in statements {
            self.exec_statement(statement, ctx)?;
            if ctx.flags.any() {
                return Ok(());
            }
        }
        Ok(())
    }

    fn exec_statement(&self, statement: &Statement, ctx: &mut ExecutionContext) -> Result<(), JexError> {
        match statement {
            Statement::Let { name, value, .. } => {
                let value = self.eval_expr(value, ctx)?;
                ctx.scopes.assign(name, value);
                Ok(())
            }

            Statement::Set {
                target: None,
                path,
                value,
                span,
            } => {
                let path_text = self.path_from_expr(path, ctx)?;
                let (root, segments) =
                    parse_set_path(&path_text).map_err(|e| e.with_span(*span))?;
                match root {
                    PathRoot::In | PathRoot::Meta => Err(RuntimeError::at(
                        format!("cannot write through read-only root in '{}'", path_text),
                        *span,
                    )
                    .with_path(&path_text)
                    .into()),
                    PathRoot::Out | PathRoot::Implicit => {
                        let value = self.eval_expr(value, ctx)?.to_json();
                        set_by_path(ctx.output_mut(), &segments, value, &path_text)
                            .map_err(|e| e.with_span(*span))?;
                        Ok(())
                    }
                }
            }

            Statement::Set {
                target: Some(target),
                path,
                value,
                span,
            } => {
                let place = self.resolve_place(target, *span)?;
                let path_text = self.eval_expr(path, ctx)?.as_string();
                let (root, segments) =
                    parse_set_path(&path_text).map_err(|e| e.with_span(*span))?;
                if matches!(root, PathRoot::In | PathRoot::Meta) {
                    return Err(RuntimeError::at(
                        format!("cannot write through read-only root in '{}'", path_text),
                        *span,
                    )
                    .into());
                }
                let value = self.eval_expr(value, ctx)?.to_json();
                let mut node = self.read_place_json(&place, ctx, *span)?;
                set_by_path(&mut node, &segments, value, &path_text)
                    .map_err(|e| e.with_span(*span))?;
                self.write_place(&place, Value::Json(node), ctx);
                Ok(())
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval_expr(condition, ctx)?.as_bool() {
                    self.exec_block(then_branch, ctx)
                } else if let Some(body) = else_branch {
                    self.exec_block(body, ctx)
                } else {
                    Ok(())
                }
            }

            Statement::Foreach {
                var,
                collection,
                body,
                ..
            } => {
                let collection = self.eval_expr(collection, ctx)?;
                let items: Vec<Value> = match &collection {
                    Value::Null | Value::Json(Json::Null) => Vec::new(),
                    Value::Json(Json::Array(elements)) => {
                        elements.iter().map(Value::from_json_shallow).collect()
                    }
                    other => vec![other.clone()],
                };

                ctx.scopes.push();
                let result = self.run_loop_body(items, var, body, ctx);
                ctx.scopes.pop();
                result
            }

            Statement::DoLoop {
                var,
                from,
                to,
                body,
                span,
            } => {
                let from = self.loop_bound(from, ctx, *span)?;
                let to = self.loop_bound(to, ctx, *span)?;
                let items = (from..=to).map(|i| Value::Number(Decimal::from(i)));

                ctx.scopes.push();
                let result = self.run_loop_body(items, var, body, ctx);
                ctx.scopes.pop();
                result
            }

            Statement::Break(_) => {
                ctx.flags.breaking = true;
                Ok(())
            }
            Statement::Continue(_) => {
                ctx.flags.continuing = true;
                Ok(())
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, ctx)?,
                    None => Value::Null,
                };
                ctx.flags.returning = true;
                ctx.flags.return_value = Some(value);
                Ok(())
            }

            Statement::Expression(expr) => {
                self.eval_expr(expr, ctx)?;
                Ok(())
            }

            // Lifted into the function table during compilation.
            Statement::FunctionDecl(_) => Ok(()),
        }
    }

    fn run_loop_body<I>(
        &self,
        items: I,
        var: &str,
        body: &[Statement],
        ctx: &mut ExecutionContext,
    ) -> Result<(), JexError>
    where
        I: IntoIterator<Item = Value>,
    {
        for item in items {
            ctx.bump_loop()?;
            ctx.scopes.define(var, item);
            self.exec_block(body, ctx)?;
            if ctx.flags.breaking {
                ctx.flags.breaking = false;
                break;
            }
            if ctx.flags.continuing {
                ctx.flags.continuing = false;
                continue;
            }
            if ctx.flags.returning {
                break;
            }
        }
        Ok(())
    }

    fn loop_bound(
        &self,
        expr: &Expr,
        ctx: &mut ExecutionContext,
        span: Span,
    ) -> Result<i64, JexError> {
        let bound = self.eval_expr(expr, ctx)?.as_number().trunc();
        bound
            .to_i64()
            .ok_or_else(|| RuntimeError::at("loop bound out of range", span).into())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn eval_expr(&self, expr: &Expr, ctx: &mut ExecutionContext) -> Result<Value, JexError> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(self.expand_macros(s, ctx)?)),
            Expr::JsonPath(path) => Ok(Value::String(path.clone())),

            Expr::VarRef(name) => match ctx.scopes.get(name) {
                Some(value) => Ok(value.clone()),
                None if ctx.options().strict => {
                    Err(RuntimeError::new(format!("unknown variable '&{}'", name)).into())
                }
                None => Ok(Value::Null),
            },

            Expr::BuiltinVar(name) => match name.to_lowercase().as_str() {
                "in" => Ok(Value::Json(ctx.input().clone())),
                "out" => Ok(Value::Json(ctx.output().clone())),
                "meta" => Ok(ctx
                    .meta()
                    .map(|m| Value::Json(m.clone()))
                    .unwrap_or(Value::Null)),
                _ => Err(RuntimeError::new(format!(
                    "unknown built-in variable '${}' (expected $in, $out, or $meta)",
                    name
                ))
                .into()),
            },

            Expr::Unary { op, operand } => {
                let operand = self.eval_expr(operand, ctx)?;
                Ok(match op {
                    UnaryOp::Not => Value::Boolean(!operand.as_bool()),
                    UnaryOp::Negate => Value::Number(-operand.as_number()),
                })
            }

            Expr::Binary { op, left, right } => match op {
                BinOp::And => {
                    if !self.eval_expr(left, ctx)?.as_bool() {
                        return Ok(Value::Boolean(false));
                    }
                    Ok(Value::Boolean(self.eval_expr(right, ctx)?.as_bool()))
                }
                BinOp::Or => {
                    if self.eval_expr(left, ctx)?.as_bool() {
                        return Ok(Value::Boolean(true));
                    }
                    Ok(Value::Boolean(self.eval_expr(right, ctx)?.as_bool()))
                }
                _ => {
                    let left = self.eval_expr(left, ctx)?;
                    let right = self.eval_expr(right, ctx)?;
                    Ok(apply_binop(*op, &left, &right))
                }
            },

            Expr::Property { base, name } => {
                let base = self.eval_expr(base, ctx)?;
                match &base {
                    Value::Json(Json::Object(map)) => match map.get(name) {
                        Some(child) => Ok(Value::from_json_shallow(child)),
                        None => self.missing(ctx, format!("missing property '{}'", name)),
                    },
                    _ => self.missing(
                        ctx,
                        format!("cannot read property '{}' of {}", name, base.type_of()),
                    ),
                }
            }

            Expr::Index { base, index } => {
                let base = self.eval_expr(base, ctx)?;
                let index = self.eval_expr(index, ctx)?.as_number().trunc();
                match &base {
                    Value::Json(Json::Array(elements)) => {
                        let raw = index.to_i64().unwrap_or(i64::MAX);
                        let idx = if raw < 0 {
                            // Negative indices count from the end.
                            let back = (-raw) as usize;
                            if back > elements.len() {
                                return self.missing(ctx, "index out of bounds".to_string());
                            }
                            elements.len() - back
                        } else {
                            raw as usize
                        };
                        match elements.get(idx) {
                            Some(child) => Ok(Value::from_json_shallow(child)),
                            None => self.missing(ctx, "index out of bounds".to_string()),
                        }
                    }
                    Value::Json(Json::Object(map)) => {
                        let key = index.to_string();
                        match map.get(&key) {
                            Some(child) => Ok(Value::from_json_shallow(child)),
                            None => self.missing(ctx, format!("missing property '{}'", key)),
                        }
                    }
                    _ => self.missing(
                        ctx,
                        format!("cannot index into {}", base.type_of()),
                    ),
                }
            }

            Expr::Call { name, args, span } => self.eval_call(name, args, *span, ctx),

            Expr::Object(pairs) => {
                let mut map = serde_json::Map::new();
                for (key, value) in pairs {
                    let value = self.eval_expr(value, ctx)?;
                    map.insert(key.clone(), value.to_json());
                }
                Ok(Value::Json(Json::Object(map)))
            }

            Expr::Array(elements) => {
                let mut array = Vec::with_capacity(elements.len());
                for element in elements {
                    array.push(self.eval_expr(element, ctx)?.to_json());
                }
                Ok(Value::Json(Json::Array(array)))
            }
        }
    }

    fn missing(&self, ctx: &ExecutionContext, message: String) -> Result<Value, JexError> {
        if ctx.options().strict {
            Err(RuntimeError::new(message).into())
        } else {
            Ok(Value::Null)
        }
    }

    /// Replace `&ident` occurrences in a string literal with the string
    /// coercion of the variable. Single left-to-right pass; the expansion
    /// output is not re-scanned.
    fn expand_macros(&self, literal: &str, ctx: &ExecutionContext) -> Result<String, JexError> {
        if !literal.contains('&') {
            return Ok(literal.to_string());
        }
        let chars: Vec<char> = literal.chars().collect();
        let mut result = String::with_capacity(literal.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '&'
                && i + 1 < chars.len()
                && (chars[i + 1].is_alphabetic() || chars[i + 1] == '_')
            {
                let mut name = String::new();
                let mut j = i + 1;
                while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                    name.push(chars[j]);
                    j += 1;
                }
                match ctx.scopes.get(&name) {
                    Some(value) => result.push_str(&value.as_string()),
                    None if ctx.options().strict => {
                        return Err(RuntimeError::new(format!(
                            "unknown variable '&{}' in string literal",
                            name
                        ))
                        .into())
                    }
                    None => {}
                }
                i = j;
            } else {
                result.push(chars[i]);
                i += 1;
            }
        }
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn eval_call(
        &self,
        name: &str,
        args: &[Expr],
        span: Span,
        ctx: &mut ExecutionContext,
    ) -> Result<Value, JexError> {
        let key = name.to_lowercase();

        if let Some(function) = self.program.functions.get(&key) {
            let function = Arc::clone(function);
            return self.call_user_function(&function, args, span, ctx);
        }
        if let Some(function) = self.libraries.resolve(&key) {
            let function = Arc::clone(function);
            return self.call_user_function(&function, args, span, ctx);
        }
        if let Some(entry) = self.registry.resolve(&key) {
            entry
                .check_arity(name, args.len())
                .map_err(|e| e.with_span(span))?;

            if entry.kind == FunctionKind::MutatesFirstArg {
                let place = self.resolve_place(&args[0], span)?;
                let mut values = vec![self.read_place_value(&place, ctx)];
                for arg in &args[1..] {
                    values.push(self.eval_expr(arg, ctx)?);
                }
                let func = Arc::clone(&entry.func);
                let result = (func.as_ref())(ctx, values).map_err(|e| tag(e, name, span))?;
                self.write_place(&place, result, ctx);
                return Ok(Value::Null);
            }

            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.eval_expr(arg, ctx)?);
            }
            let func = Arc::clone(&entry.func);
            let is_void = entry.kind == FunctionKind::Void;
            let result = (func.as_ref())(ctx, values).map_err(|e| tag(e, name, span))?;
            return Ok(if is_void { Value::Null } else { result });
        }

        Err(RuntimeError::at(format!("unknown function '{}'", name), span).into())
    }

    fn call_user_function(
        &self,
        function: &Function,
        args: &[Expr],
        span: Span,
        ctx: &mut ExecutionContext,
    ) -> Result<Value, JexError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg, ctx)?);
        }

        ctx.enter_call()?;
        ctx.scopes.push_frame();
        for (i, param) in function.params.iter().enumerate() {
            let value = values.get(i).cloned().unwrap_or(Value::Null);
            ctx.scopes.define(param, value);
        }

        let result = self.exec_block(&function.body, ctx);
        ctx.scopes.pop();
        ctx.exit_call();

        match result {
            Ok(()) => {
                ctx.flags.returning = false;
                Ok(ctx.flags.return_value.take().unwrap_or(Value::Null))
            }
            Err(JexError::Runtime(e)) => Err(tag(e, &function.name, span).into()),
            Err(other) => Err(other),
        }
    }

    // ------------------------------------------------------------------
    // Paths and places
    // ------------------------------------------------------------------

    /// Build a path string from a Set Form A path expression. Index
    /// expressions are evaluated and truncated to integers; everything
    /// else is purely syntactic.
    fn path_from_expr(&self, expr: &Expr, ctx: &mut ExecutionContext) -> Result<String, JexError> {
        match expr {
            Expr::BuiltinVar(name) => Ok(format!("${}", name)),
            Expr::JsonPath(path) => Ok(path.clone()),
            Expr::String(s) => Ok(s.clone()),
            Expr::VarRef(name) => Ok(format!("&{}", name)),
            Expr::Property { base, name } => {
                let base = self.path_from_expr(base, ctx)?;
                Ok(format!("{}.{}", base, name))
            }
            Expr::Index { base, index } => {
                let base = self.path_from_expr(base, ctx)?;
                let index = self
                    .eval_expr(index, ctx)?
                    .as_number()
                    .trunc()
                    .to_i64()
                    .ok_or_else(|| RuntimeError::new("path index out of range"))?;
                Ok(format!("{}[{}]", base, index))
            }
            _ => Err(RuntimeError::new(
                "expression cannot be used as an assignment path",
            )
            .into()),
        }
    }

    fn resolve_place(&self, expr: &Expr, span: Span) -> Result<Place, JexError> {
        match expr {
            Expr::VarRef(name) => Ok(Place::Var(name.clone())),
            Expr::BuiltinVar(name) => match name.to_lowercase().as_str() {
                "out" => Ok(Place::Out),
                "in" | "meta" => Err(RuntimeError::at(
                    format!("'${}' is read-only", name),
                    span,
                )
                .into()),
                _ => Err(RuntimeError::at(
                    format!("unknown built-in variable '${}'", name),
                    span,
                )
                .into()),
            },
            _ => Err(RuntimeError::at(
                "mutation target must be a variable or $out",
                span,
            )
            .into()),
        }
    }

    fn read_place_value(&self, place: &Place, ctx: &ExecutionContext) -> Value {
        match place {
            Place::Var(name) => ctx.scopes.get(name).cloned().unwrap_or(Value::Null),
            Place::Out => Value::Json(ctx.output().clone()),
        }
    }

    fn read_place_json(
        &self,
        place: &Place,
        ctx: &ExecutionContext,
        span: Span,
    ) -> Result<Json, JexError> {
        match self.read_place_value(place, ctx) {
            Value::Json(node) => Ok(node),
            other => Err(RuntimeError::at(
                format!("set target must be a JSON node, got {}", other.type_of()),
                span,
            )
            .into()),
        }
    }

    fn write_place(&self, place: &Place, value: Value, ctx: &mut ExecutionContext) {
        match place {
            Place::Var(name) => ctx.scopes.assign(name, value),
            Place::Out => *ctx.output_mut() = value.to_json(),
        }
    }
}

fn tag(mut error: RuntimeError, name: &str, span: Span) -> RuntimeError {
    if error.function.is_none() {
        error.function = Some(name.to_string());
    }
    error.with_span(span)
}

/// Non-short-circuiting binary operators over coerced operands.
fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Value {
    match op {
        BinOp::Add => {
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Value::String(format!("{}{}", left.as_string(), right.as_string()))
            } else {
                Value::Number(left.as_number() + right.as_number())
            }
        }
        BinOp::Subtract => Value::Number(left.as_number() - right.as_number()),
        BinOp::Multiply => Value::Number(left.as_number() * right.as_number()),
        // Division and modulo by zero yield zero.
        BinOp::Divide => Value::Number(
            left.as_number()
                .checked_div(right.as_number())
                .unwrap_or(Decimal::ZERO),
        ),
        BinOp::Modulo => Value::Number(
            left.as_number()
                .checked_rem(right.as_number())
                .unwrap_or(Decimal::ZERO),
        ),
        BinOp::Equal => Value::Boolean(left.loose_eq(right)),
        BinOp::NotEqual => Value::Boolean(!left.loose_eq(right)),
        BinOp::LessThan => Value::Boolean(left.as_number() < right.as_number()),
        BinOp::LessEqual => Value::Boolean(left.as_number() <= right.as_number()),
        BinOp::GreaterThan => Value::Boolean(left.as_number() > right.as_number()),
        BinOp::GreaterEqual => Value::Boolean(left.as_number() >= right.as_number()),
        BinOp::And | BinOp::Or => unreachable!("logical operators short-circuit in eval_expr"),
    }
}
