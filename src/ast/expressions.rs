use crate::ast::{BinOp, Span, UnaryOp};
use rust_decimal::Decimal;

/// Abstract Syntax Tree node representing a parsed expression.
///
/// The tree is immutable after compilation; evaluation never rewrites it,
/// so compiled programs can be shared freely between threads.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// `null`
    Null,

    /// `true` / `false`
    Boolean(bool),

    /// Decimal number literal
    ///
    /// # Example
    /// ```text
    /// 154.97
    /// ```
    Number(Decimal),

    /// String literal. `&name` occurrences inside it are macro-expanded at
    /// every evaluation.
    ///
    /// # Example
    /// ```text
    /// "order &orderId shipped"
    /// ```
    String(String),

    // References
    /// Variable reference (`&name`)
    VarRef(String),

    /// Built-in document root: `$in`, `$out`, or `$meta`. Unknown names are
    /// rejected at evaluation time.
    BuiltinVar(String),

    /// JSONPath literal reassembled from source form.
    ///
    /// # Examples
    /// ```text
    /// $.a.b[0].c
    /// $.items[*].price
    /// ```
    JsonPath(String),

    // Operations
    /// Unary operation (`!x`, `-x`)
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Binary operation (arithmetic, comparison, logical)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Function call. Resolution order at evaluation: script functions,
    /// then libraries in insertion order, then the engine registry.
    ///
    /// # Example
    /// ```text
    /// round(&subtotal * 0.1, 2)
    /// ```
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },

    // Access
    /// Property access (`expr.name`)
    Property {
        base: Box<Expr>,
        name: String,
    },

    /// Index access (`expr[i]`). Negative indices count from the end.
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },

    // Literals with structure
    /// Object literal with ordered key/value pairs
    ///
    /// # Example
    /// ```text
    /// { orderId: $.order.id, "line count": count(&lines) }
    /// ```
    Object(Vec<(String, Expr)>),

    /// Array literal
    Array(Vec<Expr>),
}
