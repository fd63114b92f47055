use super::parser::{BinaryOp, Expr};
use super::{Bindings, CompiledExpression, EvaluationError};

/// Evaluate a compiled expression against `bindings`.
///
/// NaN values propagate through arithmetic untouched; only a missing
/// binding or a zero divisor is an error.
pub fn evaluate(compiled: &CompiledExpression, bindings: &Bindings) -> Result<f64, EvaluationError> {
    eval_node(compiled.root(), bindings)
}

fn eval_node(expr: &Expr, bindings: &Bindings) -> Result<f64, EvaluationError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Ident(name) => bindings
            .get(name)
            .copied()
            .ok_or_else(|| EvaluationError::UnboundIdentifier(name.clone())),
        Expr::Neg(inner) => Ok(-eval_node(inner, bindings)?),
        Expr::Binary { op, lhs, rhs } => {
            let a = eval_node(lhs, bindings)?;
            let b = eval_node(rhs, bindings)?;
            match op {
                BinaryOp::Add => Ok(a + b),
                BinaryOp::Sub => Ok(a - b),
                BinaryOp::Mul => Ok(a * b),
                BinaryOp::Div if b == 0.0 => Err(EvaluationError::DivisionByZero),
                BinaryOp::Div => Ok(a / b),
            }
        }
    }
}
