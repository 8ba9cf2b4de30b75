//! # JEX - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree for JEX, a language for
//! transforming one JSON document into another under a compile-once /
//! execute-many discipline.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens with source spans
//! - **[expressions]** - Expression nodes (literals, references, operations)
//! - **[operators]** - Binary and unary operators
//! - **[statements]** - Statements, functions, and the compiled program
//!
//! ## Core Concepts
//!
//! A script is a sequence of `;`-terminated statements. Keywords carry a
//! `%` prefix, variables a `&` prefix, and the three document roots are
//! `$in`, `$out`, and `$meta`:
//!
//! ```text
//! %let items = jpAll($in, $.cart.items[*]);
//! %foreach item %in &items %do;
//!     %let total = &total + jp1(&item, $.price);
//! %end;
//! %set $.summary.total = round(&total, 2);
//! ```
//!
//! `$.a.b[0]` in source is captured as a single [JsonPath](Expr::JsonPath)
//! literal; `$` followed by an identifier is a [BuiltinVar](Expr::BuiltinVar).

pub mod expressions;
pub mod operators;
pub mod statements;
pub mod tokens;

pub use expressions::Expr;
pub use operators::{BinOp, UnaryOp};
pub use statements::{Function, Program, Statement};
pub use tokens::{Keyword, Position, Span, Token, TokenKind};
