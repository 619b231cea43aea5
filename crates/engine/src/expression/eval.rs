//! Tree-walking evaluation against the variable store.

use std::cmp::Ordering;

use cogwork_types::{Value, VariableStore};

use super::parser::{BinaryOp, Expr, Function, UnaryOp};

pub(crate) fn evaluate(expression: &Expr, variables: &VariableStore) -> Result<Value, String> {
    match expression {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => variables
            .get(name)
            .cloned()
            .ok_or_else(|| format!("variable '{name}' is not defined")),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, variables))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Unary(operator, operand) => unary(*operator, evaluate(operand, variables)?),
        Expr::Binary(BinaryOp::And, left, right) => {
            if !evaluate(left, variables)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(evaluate(right, variables)?.is_truthy()))
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            if evaluate(left, variables)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(evaluate(right, variables)?.is_truthy()))
        }
        Expr::Binary(operator, left, right) => binary(*operator, evaluate(left, variables)?, evaluate(right, variables)?),
        Expr::Index(target, index) => index_into(evaluate(target, variables)?, evaluate(index, variables)?),
        Expr::Call(function, arguments) => call(*function, arguments, variables),
    }
}

fn unary(operator: UnaryOp, operand: Value) -> Result<Value, String> {
    match (operator, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Negate, Value::Integer(number)) => number
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| "integer overflow in negation".to_string()),
        (UnaryOp::Negate, Value::Float(number)) => Ok(Value::Float(-number)),
        (UnaryOp::Negate, other) => Err(format!("cannot negate a {}", other.type_name())),
    }
}

fn binary(operator: BinaryOp, left: Value, right: Value) -> Result<Value, String> {
    match operator {
        BinaryOp::Equal => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Less => compare(&left, &right).map(|ordering| Value::Bool(ordering == Ordering::Less)),
        BinaryOp::LessEqual => compare(&left, &right).map(|ordering| Value::Bool(ordering != Ordering::Greater)),
        BinaryOp::Greater => compare(&left, &right).map(|ordering| Value::Bool(ordering == Ordering::Greater)),
        BinaryOp::GreaterEqual => compare(&left, &right).map(|ordering| Value::Bool(ordering != Ordering::Less)),
        BinaryOp::Add => add(left, right),
        BinaryOp::Subtract => arithmetic("-", left, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Multiply => arithmetic("*", left, right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Divide => divide(left, right),
        BinaryOp::Remainder => remainder(left, right),
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => (*a as f64) == *b,
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering, String> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let (a, b) = (left.as_f64().unwrap_or(f64::NAN), right.as_f64().unwrap_or(f64::NAN));
            a.partial_cmp(&b).ok_or_else(|| "cannot order NaN".to_string())
        }
        _ => Err(format!("cannot compare {} with {}", left.type_name(), right.type_name())),
    }
}

fn add(left: Value, right: Value) -> Result<Value, String> {
    match (left, right) {
        (Value::String(a), other) => Ok(Value::String(a + &other.to_text())),
        (other, Value::String(b)) => Ok(Value::String(other.to_text() + &b)),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (left, right) => arithmetic("+", left, right, i64::checked_add, |a, b| a + b),
    }
}

fn arithmetic(
    symbol: &str,
    left: Value,
    right: Value,
    integer: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Result<Value, String> {
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => integer(*a, *b)
            .map(Value::Integer)
            .ok_or_else(|| format!("integer overflow in {a} {symbol} {b}")),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let (a, b) = numeric_pair(&left, &right);
            Ok(Value::Float(float(a, b)))
        }
        _ => Err(format!("cannot apply '{symbol}' to {} and {}", left.type_name(), right.type_name())),
    }
}

fn divide(left: Value, right: Value) -> Result<Value, String> {
    match (&left, &right) {
        (Value::Integer(_), Value::Integer(0)) => Err("division by zero".into()),
        (Value::Integer(a), Value::Integer(b)) => match a.checked_rem(*b) {
            Some(0) => a
                .checked_div(*b)
                .map(Value::Integer)
                .ok_or_else(|| format!("integer overflow in {a} / {b}")),
            Some(_) => Ok(Value::Float(*a as f64 / *b as f64)),
            None => Err(format!("integer overflow in {a} / {b}")),
        },
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let (a, b) = numeric_pair(&left, &right);
            if b == 0.0 {
                return Err("division by zero".into());
            }
            Ok(Value::Float(a / b))
        }
        _ => Err(format!("cannot apply '/' to {} and {}", left.type_name(), right.type_name())),
    }
}

fn remainder(left: Value, right: Value) -> Result<Value, String> {
    match (&left, &right) {
        (Value::Integer(_), Value::Integer(0)) => Err("division by zero".into()),
        (Value::Integer(a), Value::Integer(b)) => a
            .checked_rem(*b)
            .map(Value::Integer)
            .ok_or_else(|| format!("integer overflow in {a} % {b}")),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let (a, b) = numeric_pair(&left, &right);
            if b == 0.0 {
                return Err("division by zero".into());
            }
            Ok(Value::Float(a % b))
        }
        _ => Err(format!("cannot apply '%' to {} and {}", left.type_name(), right.type_name())),
    }
}

fn numeric_pair(left: &Value, right: &Value) -> (f64, f64) {
    (left.as_f64().unwrap_or(f64::NAN), right.as_f64().unwrap_or(f64::NAN))
}

fn index_into(target: Value, index: Value) -> Result<Value, String> {
    match (target, index) {
        (Value::List(items), Value::Integer(position)) => {
            let resolved = resolve_position(position, items.len())?;
            Ok(items[resolved].clone())
        }
        (Value::String(text), Value::Integer(position)) => {
            let characters: Vec<char> = text.chars().collect();
            let resolved = resolve_position(position, characters.len())?;
            Ok(Value::String(characters[resolved].to_string()))
        }
        (Value::Map(entries), Value::String(key)) => entries.get(&key).cloned().ok_or_else(|| format!("key '{key}' not found")),
        (target, index) => Err(format!("cannot index {} with {}", target.type_name(), index.type_name())),
    }
}

// Negative positions count from the end.
fn resolve_position(position: i64, length: usize) -> Result<usize, String> {
    let signed_length = i64::try_from(length).map_err(|_| "collection too large to index".to_string())?;
    let resolved = if position < 0 { signed_length + position } else { position };
    if (0..signed_length).contains(&resolved) {
        usize::try_from(resolved).map_err(|_| format!("index {position} out of range"))
    } else {
        Err(format!("index {position} out of range for length {length}"))
    }
}

fn call(function: Function, arguments: &[Expr], variables: &VariableStore) -> Result<Value, String> {
    let argument = match (function, arguments) {
        // The fallback is only evaluated when needed, and a missing variable counts as null.
        (Function::Default, [primary, fallback]) => {
            let primary = match primary {
                Expr::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
                other => evaluate(other, variables)?,
            };
            return if primary.is_null() { evaluate(fallback, variables) } else { Ok(primary) };
        }
        (_, [single]) => evaluate(single, variables)?,
        _ => return Err(format!("{}() called with {} argument(s)", function.name(), arguments.len())),
    };

    match function {
        Function::Len => match &argument {
            Value::String(text) => Ok(Value::Integer(text.chars().count() as i64)),
            Value::List(items) => Ok(Value::Integer(items.len() as i64)),
            Value::Map(entries) => Ok(Value::Integer(entries.len() as i64)),
            other => Err(format!("len() is not defined for {}", other.type_name())),
        },
        Function::Str => Ok(Value::String(argument.to_text())),
        Function::Int => match &argument {
            Value::Float(number) => truncate_to_integer(*number),
            Value::String(text) => match text.trim().parse::<i64>() {
                Ok(number) => Ok(Value::Integer(number)),
                Err(_) => match text.trim().parse::<f64>() {
                    Ok(number) => truncate_to_integer(number),
                    Err(_) => Err(format!("cannot convert {text:?} to an integer")),
                },
            },
            other => other
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| format!("cannot convert {} to an integer", other.type_name())),
        },
        Function::Float => match &argument {
            Value::Null | Value::List(_) | Value::Map(_) | Value::Resource(_) => {
                Err(format!("cannot convert {} to a float", argument.type_name()))
            }
            other => other
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| format!("cannot convert {:?} to a float", other.to_text())),
        },
        Function::Upper => match argument {
            Value::String(text) => Ok(Value::String(text.to_uppercase())),
            other => Err(format!("upper() expects a string, got {}", other.type_name())),
        },
        Function::Lower => match argument {
            Value::String(text) => Ok(Value::String(text.to_lowercase())),
            other => Err(format!("lower() expects a string, got {}", other.type_name())),
        },
        Function::Default => Ok(argument),
    }
}

fn truncate_to_integer(number: f64) -> Result<Value, String> {
    Value::Float(number.trunc())
        .as_i64()
        .map(Value::Integer)
        .ok_or_else(|| format!("{number} is out of range for an integer"))
}
