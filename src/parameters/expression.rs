//! Expression parsing and evaluation
//!
//! This module parses and evaluates the small arithmetic language shared by
//! catalog model formulas (`P[0]*exp(-X/P[1])`) and parameter link expressions
//! (`Amplitude_1_1 * 2`).

use crate::utils::special::lambert_w;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, digit1, multispace0},
    combinator::recognize,
    multi::many0,
    number::complete::double,
    sequence::pair,
    IResult, Parser,
};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },
}

/// Result type for expression evaluation
pub type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant number
    Number(f64),

    /// Variable reference
    Variable(String),

    /// Indexed reference such as `P[3]`
    Indexed(String, usize),

    /// Unary operations
    Unary(UnaryOp, Box<Expression>),

    /// Binary operations
    Binary(BinaryOp, Box<Expression>, Box<Expression>),

    /// Function call
    Function(String, Vec<Expression>),
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    /// Addition (+)
    Add,

    /// Subtraction (-)
    Sub,

    /// Multiplication (*)
    Mul,

    /// Division (/)
    Div,

    /// Power (^ or **)
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// Context for expression evaluation, providing variable values
pub trait EvaluationContext {
    /// Get the value of a variable
    fn get_variable(&self, name: &str) -> ExprResult<f64>;

    /// Get the value of an indexed variable such as `P[2]`
    fn get_indexed(&self, name: &str, index: usize) -> ExprResult<f64> {
        Err(ExpressionError::UndefinedVariable {
            name: format!("{}[{}]", name, index),
        })
    }

    /// Check if a variable exists
    fn has_variable(&self, name: &str) -> bool;
}

/// Simple implementation of EvaluationContext using a HashMap
#[derive(Debug, Clone, Default)]
pub struct SimpleContext {
    variables: HashMap<String, f64>,
    arrays: HashMap<String, Vec<f64>>,
}

impl SimpleContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable value
    pub fn set_variable(&mut self, name: &str, value: f64) {
        self.variables.insert(name.to_string(), value);
    }

    /// Set an indexable variable
    pub fn set_array(&mut self, name: &str, values: Vec<f64>) {
        self.arrays.insert(name.to_string(), values);
    }
}

impl EvaluationContext for SimpleContext {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.variables
            .get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn get_indexed(&self, name: &str, index: usize) -> ExprResult<f64> {
        self.arrays
            .get(name)
            .and_then(|values| values.get(index))
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: format!("{}[{}]", name, index),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

impl EvaluationContext for HashMap<String, f64> {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

fn arity(name: &str, args: &[f64], expected: usize) -> ExprResult<()> {
    if args.len() != expected {
        return Err(ExpressionError::InvalidOperation {
            message: format!(
                "{}() requires {} argument(s), got {}",
                name,
                expected,
                args.len()
            ),
        });
    }
    Ok(())
}

fn call_function(name: &str, args: &[f64]) -> ExprResult<f64> {
    let unary: Option<fn(f64) -> f64> = match name {
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        "asin" => Some(f64::asin),
        "acos" => Some(f64::acos),
        "atan" => Some(f64::atan),
        "sinh" => Some(f64::sinh),
        "cosh" => Some(f64::cosh),
        "tanh" => Some(f64::tanh),
        "exp" => Some(f64::exp),
        "log" | "ln" => Some(f64::ln),
        "log10" => Some(f64::log10),
        "sqrt" => Some(f64::sqrt),
        "abs" => Some(f64::abs),
        "lambertw" => Some(lambert_w),
        _ => None,
    };
    if let Some(f) = unary {
        arity(name, args, 1)?;
        return Ok(f(args[0]));
    }

    match name {
        "pow" => {
            arity(name, args, 2)?;
            Ok(args[0].powf(args[1]))
        }
        "max" | "min" => {
            if args.len() < 2 {
                return Err(ExpressionError::InvalidOperation {
                    message: format!("{}() requires at least 2 arguments, got {}", name, args.len()),
                });
            }
            let folded = if name == "max" {
                args.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))
            } else {
                args.iter().fold(f64::INFINITY, |a, &b| a.min(b))
            };
            Ok(folded)
        }
        _ => Err(ExpressionError::UndefinedFunction {
            name: name.to_string(),
        }),
    }
}

impl Expression {
    /// Parse an expression from a string
    ///
    /// A leading `Y=` (as written in model formulas) is accepted and ignored.
    pub fn parse(input: &str) -> ExprResult<Self> {
        let trimmed = input.trim();
        let body = match trimmed.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("y=") => &trimmed[2..],
            _ => trimmed,
        };

        match expr_parser(body) {
            Ok((remainder, expr)) => {
                if remainder.trim().is_empty() {
                    Ok(expr)
                } else {
                    Err(ExpressionError::ParseError {
                        message: format!("Unexpected trailing characters: '{}'", remainder),
                    })
                }
            }
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Evaluate the expression with the given context
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<f64> {
        match self {
            Self::Number(n) => Ok(*n),

            Self::Variable(name) => {
                if context.has_variable(name) {
                    return context.get_variable(name);
                }
                match name.as_str() {
                    "pi" => Ok(std::f64::consts::PI),
                    "e" => Ok(std::f64::consts::E),
                    _ => context.get_variable(name),
                }
            }

            Self::Indexed(name, index) => context.get_indexed(name, *index),

            Self::Unary(UnaryOp::Neg, expr) => Ok(-expr.evaluate(context)?),

            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(context)?;
                let rhs = right.evaluate(context)?;

                Ok(match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div => lhs / rhs,
                    BinaryOp::Pow => lhs.powf(rhs),
                })
            }

            Self::Function(name, args) => {
                let mut evaluated_args = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated_args.push(arg.evaluate(context)?);
                }
                call_function(name, &evaluated_args)
            }
        }
    }

    /// Find all variable names used in the expression
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) | Self::Indexed(..) => {}
            Self::Variable(name) => vars.push(name.clone()),
            Self::Unary(_, expr) => expr.collect_variables(vars),
            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
            Self::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }

    /// Largest index used with `name[...]`, if any
    pub fn max_index(&self, name: &str) -> Option<usize> {
        match self {
            Self::Number(_) | Self::Variable(_) => None,
            Self::Indexed(n, index) => (n == name).then_some(*index),
            Self::Unary(_, expr) => expr.max_index(name),
            Self::Binary(_, left, right) => left.max_index(name).max(right.max_index(name)),
            Self::Function(_, args) => args.iter().filter_map(|a| a.max_index(name)).max(),
        }
    }

    /// Shift every `name[k]` reference to `name[k + offset]`
    pub fn renumber(&self, name: &str, offset: usize) -> Expression {
        match self {
            Self::Indexed(n, index) if n == name => Self::Indexed(n.clone(), index + offset),
            Self::Number(_) | Self::Variable(_) | Self::Indexed(..) => self.clone(),
            Self::Unary(op, expr) => Self::Unary(*op, Box::new(expr.renumber(name, offset))),
            Self::Binary(op, left, right) => Self::Binary(
                *op,
                Box::new(left.renumber(name, offset)),
                Box::new(right.renumber(name, offset)),
            ),
            Self::Function(f, args) => Self::Function(
                f.clone(),
                args.iter().map(|a| a.renumber(name, offset)).collect(),
            ),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Variable(name) => write!(f, "{}", name),
            Self::Indexed(name, index) => write!(f, "{}[{}]", name, index),
            Self::Unary(UnaryOp::Neg, expr) => write!(f, "-({})", expr),
            Self::Binary(op, left, right) => write!(f, "({}{}{})", left, op.symbol(), right),
            Self::Function(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

// Parser functions using nom

fn failure(input: &str, kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Consume `symbol` after optional whitespace, returning the remaining input
fn symbol<'a>(input: &'a str, token: &'static str) -> Option<&'a str> {
    let (input, _) = multispace0::<&str, nom::error::Error<&str>>(input).ok()?;
    tag::<&str, &str, nom::error::Error<&str>>(token)
        .parse(input)
        .ok()
        .map(|(rest, _)| rest)
}

/// Parse an identifier (variable or function name)
fn identifier(input: &str) -> IResult<&str, String> {
    let mut parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));

    let (input, matched) = parser.parse(input)?;
    Ok((input, matched.to_string()))
}

/// Parse a comma-separated list of expressions (for function arguments)
fn args_list(input: &str) -> IResult<&str, Vec<Expression>> {
    let (mut input, first) = expr_parser(input)?;
    let mut args = vec![first];

    while let Some(after_comma) = symbol(input, ",") {
        let (rest, expr) = expr_parser(after_comma)?;
        args.push(expr);
        input = rest;
    }

    Ok((input, args))
}

/// Parse a number
fn number(input: &str) -> IResult<&str, Expression> {
    let (input, num) = double(input)?;
    Ok((input, Expression::Number(num)))
}

/// Parse a name followed by an optional call or index suffix
fn named(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;

    if let Some(after_paren) = symbol(input, "(") {
        if let Some(rest) = symbol(after_paren, ")") {
            return Ok((rest, Expression::Function(name, vec![])));
        }
        let (rest, args) = args_list(after_paren)?;
        let rest = symbol(rest, ")").ok_or_else(|| failure(rest, nom::error::ErrorKind::Char))?;
        return Ok((rest, Expression::Function(name, args)));
    }

    if let Some(after_bracket) = symbol(input, "[") {
        let (rest, _) = multispace0.parse(after_bracket)?;
        let (rest, digits) = digit1.parse(rest)?;
        let index = digits
            .parse::<usize>()
            .map_err(|_| failure(rest, nom::error::ErrorKind::Digit))?;
        let rest = symbol(rest, "]").ok_or_else(|| failure(rest, nom::error::ErrorKind::Char))?;
        return Ok((rest, Expression::Indexed(name, index)));
    }

    Ok((input, Expression::Variable(name)))
}

/// Parse a primary expression (number, name, call, index, or parenthesized expression)
fn primary(input: &str) -> IResult<&str, Expression> {
    let (input, _) = multispace0.parse(input)?;

    match input.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '.' => number(input),
        Some('(') => {
            let (rest, expr) = expr_parser(&input[1..])?;
            let rest = symbol(rest, ")").ok_or_else(|| failure(rest, nom::error::ErrorKind::Char))?;
            Ok((rest, expr))
        }
        Some(c) if c.is_ascii_alphabetic() || c == '_' => named(input),
        _ => Err(failure(input, nom::error::ErrorKind::Alt)),
    }
}

/// Parse a power expression; `^` and `**` are right-associative
fn power(input: &str) -> IResult<&str, Expression> {
    let (input, base) = primary(input)?;

    match symbol(input, "**").or_else(|| symbol(input, "^")) {
        Some(after_op) => {
            let (rest, exponent) = unary(after_op)?;
            Ok((
                rest,
                Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
            ))
        }
        None => Ok((input, base)),
    }
}

/// Parse a unary expression (-expr, +expr)
fn unary(input: &str) -> IResult<&str, Expression> {
    if let Some(rest) = symbol(input, "-") {
        let (rest, expr) = unary(rest)?;
        return Ok((rest, Expression::Unary(UnaryOp::Neg, Box::new(expr))));
    }
    if let Some(rest) = symbol(input, "+") {
        return unary(rest);
    }
    power(input)
}

/// Parse a multiplicative expression, folding left
fn term(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut left) = unary(input)?;

    loop {
        let op = symbol(input, "*")
            .map(|rest| (rest, BinaryOp::Mul))
            .or_else(|| symbol(input, "/").map(|rest| (rest, BinaryOp::Div)));

        match op {
            Some((after_op, op)) => {
                let (rest, right) = unary(after_op)?;
                left = Expression::Binary(op, Box::new(left), Box::new(right));
                input = rest;
            }
            None => return Ok((input, left)),
        }
    }
}

/// Parse an additive expression, folding left
fn expr_parser(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut left) = term(input)?;

    loop {
        let op = symbol(input, "+")
            .map(|rest| (rest, BinaryOp::Add))
            .or_else(|| symbol(input, "-").map(|rest| (rest, BinaryOp::Sub)));

        match op {
            Some((after_op, op)) => {
                let (rest, right) = term(after_op)?;
                left = Expression::Binary(op, Box::new(left), Box::new(right));
                input = rest;
            }
            None => return Ok((input, left)),
        }
    }
}
