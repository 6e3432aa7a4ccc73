//! Parsen en evalueren van expressies tegen een parameterset.

use meval::{Context, Expr};

use super::ParameterSet;
use super::error::EvalError;

/// Parse een expressie zonder haar te evalueren.
///
/// Controleert alleen de syntax; variabelen en functies worden pas bij het
/// evalueren opgezocht.
pub fn compile_expression(source: &str) -> Result<Expr, EvalError> {
    let normalized = normalize_expression(source);
    if normalized.is_empty() {
        return Err(EvalError::Internal);
    }
    normalized.parse::<Expr>().map_err(EvalError::from)
}

/// Evalueer een expressie. Variabelen worden eerst in `parameters` gezocht en
/// daarna in de ingebouwde constanten.
pub fn evaluate_expression(
    source: &str,
    parameters: Option<&ParameterSet>,
) -> Result<f64, EvalError> {
    let expr = compile_expression(source)?;
    let context = build_context();

    let value = match parameters {
        Some(set) => expr.eval_with_context((set, &context))?,
        None => expr.eval_with_context(&context)?,
    };

    if value.is_nan() {
        Err(EvalError::Domain)
    } else if value.is_infinite() {
        Err(EvalError::DivisionByZero)
    } else {
        Ok(value)
    }
}

fn normalize_expression(source: &str) -> String {
    let trimmed = source.trim();
    // Oude documenten bewaren expressies met een `term:` prefix.
    let stripped = trimmed.strip_prefix("term:").unwrap_or(trimmed);
    stripped.trim().to_owned()
}

fn build_context() -> Context<'static> {
    let mut context = Context::new();
    context.func("log", f64::ln);
    context.func("log10", f64::log10);
    context.func("log2", f64::log2);
    context.func2("pow", f64::powf);
    context.func2("mod", modulo);
    context.func("sec", |value| 1.0 / value.cos());
    context.func("csc", |value| 1.0 / value.sin());
    context.func("cot", |value| 1.0 / value.tan());
    context.func("deg", f64::to_degrees);
    context.func("rad", f64::to_radians);
    context.func3("if", |condition, truthy, falsy| {
        if condition != 0.0 { truthy } else { falsy }
    });
    context
}

fn modulo(dividend: f64, divisor: f64) -> f64 {
    if divisor == 0.0 {
        return f64::NAN;
    }
    dividend % divisor
}
