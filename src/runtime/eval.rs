//! Pure expression evaluation against a variable store.
//!
//! Evaluation is total: unknown variables read as `Null`, and every
//! operator coerces its operands to a type-appropriate default instead of
//! failing, so a bad guard can never abort a transition.

use crate::format::{BinaryOp, Expr, Literal, TemplatePart, TemplateText, UnaryOp};

use super::VariableStore;

pub fn eval(expr: &Expr, vars: &VariableStore) -> Literal {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Variable(name) => match vars.get(name) {
            Some(value) => value.clone(),
            None => {
                log::debug!("variable {} is not set, reading as null", name);
                Literal::Null
            }
        },
        Expr::Unary { op, operand } => {
            let value = eval(operand, vars);
            match op {
                UnaryOp::Not => Literal::Boolean(!truthy(&value)),
                UnaryOp::Neg => match value {
                    Literal::Integer(i) => Literal::Integer(-i),
                    Literal::Float(f) => Literal::Float(-f),
                    other => Literal::Float(-numeric(&other)),
                },
            }
        }
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, vars),
    }
}

/// Render a template, substituting each `${expr}` hole with the display
/// form of its value.
pub fn render(text: &TemplateText, vars: &VariableStore) -> String {
    text.parts
        .iter()
        .map(|part| match part {
            TemplatePart::Text(text) => text.clone(),
            TemplatePart::Value(expr) => eval(expr, vars).to_string(),
        })
        .collect()
}

pub fn truthy(value: &Literal) -> bool {
    match value {
        Literal::Null => false,
        Literal::String(s) => !s.is_empty(),
        Literal::Integer(i) => *i != 0,
        Literal::Float(f) => *f != 0.0,
        Literal::Boolean(b) => *b,
    }
}

fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, vars: &VariableStore) -> Literal {
    // short-circuit the logical operators before touching the right side
    match op {
        BinaryOp::Or => {
            let left = eval(lhs, vars);
            if truthy(&left) {
                return Literal::Boolean(true);
            }
            return Literal::Boolean(truthy(&eval(rhs, vars)));
        }
        BinaryOp::And => {
            let left = eval(lhs, vars);
            if !truthy(&left) {
                return Literal::Boolean(false);
            }
            return Literal::Boolean(truthy(&eval(rhs, vars)));
        }
        _ => {}
    }

    let left = eval(lhs, vars);
    let right = eval(rhs, vars);

    match op {
        BinaryOp::Eq => Literal::Boolean(literal_eq(&left, &right)),
        BinaryOp::Ne => Literal::Boolean(!literal_eq(&left, &right)),
        BinaryOp::Lt => Literal::Boolean(numeric(&left) < numeric(&right)),
        BinaryOp::Le => Literal::Boolean(numeric(&left) <= numeric(&right)),
        BinaryOp::Gt => Literal::Boolean(numeric(&left) > numeric(&right)),
        BinaryOp::Ge => Literal::Boolean(numeric(&left) >= numeric(&right)),
        BinaryOp::Add => match (&left, &right) {
            (Literal::String(a), Literal::String(b)) => {
                Literal::String(format!("{}{}", a, b))
            }
            (Literal::Integer(a), Literal::Integer(b)) => Literal::Integer(a + b),
            _ => Literal::Float(numeric(&left) + numeric(&right)),
        },
        BinaryOp::Sub => match (&left, &right) {
            (Literal::Integer(a), Literal::Integer(b)) => Literal::Integer(a - b),
            _ => Literal::Float(numeric(&left) - numeric(&right)),
        },
        BinaryOp::Mul => match (&left, &right) {
            (Literal::Integer(a), Literal::Integer(b)) => Literal::Integer(a * b),
            _ => Literal::Float(numeric(&left) * numeric(&right)),
        },
        BinaryOp::Div => {
            if numeric(&right) == 0.0 {
                log::warn!("division by zero in story expression, yielding 0");
                return Literal::Integer(0);
            }
            match (&left, &right) {
                (Literal::Integer(a), Literal::Integer(b)) => Literal::Integer(a / b),
                _ => Literal::Float(numeric(&left) / numeric(&right)),
            }
        }
        BinaryOp::Or | BinaryOp::And => unreachable!("handled above"),
    }
}

fn literal_eq(left: &Literal, right: &Literal) -> bool {
    match (left, right) {
        (Literal::Null, Literal::Null) => true,
        (Literal::String(a), Literal::String(b)) => a == b,
        (Literal::Boolean(a), Literal::Boolean(b)) => a == b,
        (Literal::Integer(a), Literal::Integer(b)) => a == b,
        (Literal::Float(a), Literal::Float(b)) => a == b,
        (Literal::Integer(a), Literal::Float(b)) | (Literal::Float(b), Literal::Integer(a)) => {
            (*a as f64) == *b
        }
        _ => false,
    }
}

fn numeric(value: &Literal) -> f64 {
    match value {
        Literal::Null => 0.0,
        Literal::String(_) => 0.0,
        Literal::Integer(i) => *i as f64,
        Literal::Float(f) => *f,
        Literal::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
    }
}
