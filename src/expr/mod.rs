//! Price-alert expression language.
//!
//! A deliberately small arithmetic DSL: `+ - * /`, parentheses, numeric
//! literals and identifiers. Identifiers are either built-in statistic names
//! (`avg25`, `minPrice`, ...) or `@"Item Name"` references, which are
//! rewritten to synthetic identifiers before parsing.
//!
//! ```rust
//! use mabi_auction_sdk::expr::{compile, Bindings};
//!
//! let compiled = compile(r#"@"Fine Leather" * 0.9"#).unwrap();
//! let mut bindings = Bindings::new();
//! bindings.insert("Fine_Leather".to_string(), 1000.0);
//! assert_eq!(compiled.evaluate(&bindings).unwrap(), 900.0);
//! ```

pub mod eval;
pub mod lexer;
pub mod parser;
pub mod references;

use std::collections::{BTreeSet, HashMap};

pub use eval::evaluate;
pub use parser::{BinaryOp, Expr};
pub use references::{extract, synthetic_name, ReferenceTable};

/// Identifier → value mapping supplied at evaluation time.
pub type Bindings = HashMap<String, f64>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Malformed expression source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at offset {position}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the rewritten expression text.
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Failure while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("unbound identifier '{0}'")]
    UnboundIdentifier(String),

    #[error("division by zero")]
    DivisionByZero,
}

// ---------------------------------------------------------------------------
// CompiledExpression
// ---------------------------------------------------------------------------

/// An immutable, re-evaluable expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    rewritten: String,
    references: ReferenceTable,
    root: Expr,
}

impl CompiledExpression {
    /// The text the user wrote.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The text after `@"..."` references were replaced.
    pub fn rewritten(&self) -> &str {
        &self.rewritten
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Free identifiers in the tree, sorted and deduplicated.
    pub fn identifiers(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.root.for_each_ident(&mut |name| {
            out.insert(name);
        });
        out
    }

    pub fn evaluate(&self, bindings: &Bindings) -> Result<f64, EvaluationError> {
        evaluate(self, bindings)
    }
}

/// Compile expression source into an evaluable tree.
pub fn compile(source: &str) -> Result<CompiledExpression, ParseError> {
    let rewritten = references::rewrite(source);
    let tokens = lexer::tokenize(&rewritten.expression)?;
    let root = parser::Parser::new(tokens, rewritten.expression.len()).parse()?;
    Ok(CompiledExpression {
        source: source.to_string(),
        rewritten: rewritten.expression,
        references: rewritten.references,
        root,
    })
}

// ---------------------------------------------------------------------------
// PriceExpression
// ---------------------------------------------------------------------------

/// User-authored expression source with its compiled form cached.
///
/// Only the source is meant to be persisted; the compiled tree is rebuilt
/// when the source changes.
#[derive(Debug, Clone)]
pub struct PriceExpression {
    source: String,
    compiled: Result<CompiledExpression, ParseError>,
}

impl PriceExpression {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = compile(&source);
        Self { source, compiled }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace the source. Recompiles only when the text actually changed.
    /// Returns `true` if a recompile happened.
    pub fn set_source(&mut self, source: &str) -> bool {
        if source == self.source {
            return false;
        }
        self.source = source.to_string();
        self.compiled = compile(source);
        true
    }

    pub fn compiled(&self) -> Result<&CompiledExpression, &ParseError> {
        self.compiled.as_ref()
    }

    /// Validity flag for the editing UI.
    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }
}

impl PartialEq for PriceExpression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
