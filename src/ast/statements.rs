use crate::ast::{Expr, Span};
use std::collections::HashMap;
use std::sync::Arc;

/// A parsed statement.
///
/// Every statement records the span of its introducing token so runtime
/// errors can point back into the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable binding
    ///
    /// # Example
    /// ```text
    /// %let total = &subtotal - &discount;
    /// ```
    Let {
        name: String,
        value: Expr,
        span: Span,
    },

    /// Assignment into a JSON tree. `target` is `None` for Form A
    /// (`%set <path> = value;`, target `$out`) and `Some` for Form B
    /// (`%set <target>, <path>, <value>;`).
    ///
    /// # Examples
    /// ```text
    /// %set $.summary.total = &total;
    /// %set &order, "lines[0].sku", &sku;
    /// ```
    Set {
        target: Option<Expr>,
        path: Expr,
        value: Expr,
        span: Span,
    },

    /// Conditional
    ///
    /// # Example
    /// ```text
    /// %if (&subtotal >= 100) %then %do; ... %end; %else %do; ... %end;
    /// ```
    If {
        condition: Expr,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
        span: Span,
    },

    /// Collection iteration
    ///
    /// # Example
    /// ```text
    /// %foreach item %in $.cart.items %do; ... %end;
    /// ```
    Foreach {
        var: String,
        collection: Expr,
        body: Vec<Statement>,
        span: Span,
    },

    /// Counted loop, inclusive upper bound, step +1
    ///
    /// # Example
    /// ```text
    /// %do i = 1 %to 10; ... %end;
    /// ```
    DoLoop {
        var: String,
        from: Expr,
        to: Expr,
        body: Vec<Statement>,
        span: Span,
    },

    /// `%break;`
    Break(Span),

    /// `%continue;`
    Continue(Span),

    /// `%return;` or `%return expr;`
    Return {
        value: Option<Expr>,
        span: Span,
    },

    /// Bare expression terminated by `;` — evaluated for side effects
    Expression(Expr),

    /// `%func name(params); ... %endfunc;` — extracted into the function
    /// table during compilation
    FunctionDecl(Arc<Function>),
}

/// A user function declared with `%func ... %endfunc`, in a script or a
/// library.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// A compiled program: the top-level statements (function declarations
/// removed) plus the script function table keyed by lowercased name.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub functions: HashMap<String, Arc<Function>>,
}
