use crate::error::{EpiError, Result};
use crate::traits::Scalar;
use std::collections::HashMap;

/// OpCodes for the Stack-based Virtual Machine.
/// The VM operates on a stack of `Scalar` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant `f64` value onto the stack.
    LoadConst(f64),
    /// Pushes the value of a variable (by index) onto the stack.
    /// For parameter functions index 0 is always the time `t`.
    LoadVar(usize),
    /// Pushes the value of a named constant (by index) onto the stack.
    LoadParam(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    Sin,
    Cos,
    Exp,
    /// Natural logarithm.
    Ln,
    Sqrt,
    Abs,
    /// Pops top value (a), pushes -a.
    Neg,
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }
}

/// Stack-based Virtual Machine for evaluating parameter expressions.
///
/// The VM is stateless; `execute` takes all necessary context:
/// - `bytecode`: Instructions to run.
/// - `vars`: Variable values (read-only).
/// - `params`: Named constant values (read-only).
/// - `stack`: A mutable buffer for intermediate computations.
///
/// Returns the value left on the stack. Bytecode produced by `Compiler` is
/// always balanced; malformed bytecode evaluates to NaN.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(
        bytecode: &Bytecode,
        vars: &[T],
        params: &[T],
        stack: &mut Vec<T>,
    ) -> T {
        stack.clear();

        for op in &bytecode.ops {
            let value = match *op {
                OpCode::LoadConst(val) => T::from_f64(val).unwrap_or_else(T::nan),
                OpCode::LoadVar(idx) => vars.get(idx).copied().unwrap_or_else(T::nan),
                OpCode::LoadParam(idx) => params.get(idx).copied().unwrap_or_else(T::nan),
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                    let b = pop(stack);
                    let a = pop(stack);
                    match op {
                        OpCode::Add => a + b,
                        OpCode::Sub => a - b,
                        OpCode::Mul => a * b,
                        OpCode::Div => a / b,
                        _ => a.powf(b),
                    }
                }
                OpCode::Sin => pop(stack).sin(),
                OpCode::Cos => pop(stack).cos(),
                OpCode::Exp => pop(stack).exp(),
                OpCode::Ln => pop(stack).ln(),
                OpCode::Sqrt => pop(stack).sqrt(),
                OpCode::Abs => pop(stack).abs(),
                OpCode::Neg => -pop(stack),
            };
            stack.push(value);
        }

        pop(stack)
    }
}

fn pop<T: Scalar>(stack: &mut Vec<T>) -> T {
    stack.pop().unwrap_or_else(T::nan)
}

// --- AST & Parser ---

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>), // char is operator +, -, *, /, ^
    Unary(char, Box<Expr>),             // -
    Call(String, Box<Expr>),            // functions like exp(x)
}

/// Compiles an AST (`Expr`) into `Bytecode`.
/// Resolves variable and parameter names to indices.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_names: &[String], param_names: &[String]) -> Self {
        let var_map = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let param_map = param_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Self { var_map, param_map }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<()> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(&idx) = self.param_map.get(name) {
                    ops.push(OpCode::LoadParam(idx));
                } else if let Some(value) = builtin_constant(name) {
                    ops.push(OpCode::LoadConst(value));
                } else {
                    return Err(EpiError::UnknownSymbol(name.clone()));
                }
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                ops.push(match op {
                    '+' => OpCode::Add,
                    '-' => OpCode::Sub,
                    '*' => OpCode::Mul,
                    '/' => OpCode::Div,
                    '^' => OpCode::Pow,
                    other => return Err(EpiError::UnknownSymbol(other.to_string())),
                });
            }
            Expr::Unary(op, operand) => {
                self.compile_recursive(operand, ops)?;
                match op {
                    '-' => ops.push(OpCode::Neg),
                    other => return Err(EpiError::UnknownSymbol(other.to_string())),
                }
            }
            Expr::Call(func, arg) => {
                self.compile_recursive(arg, ops)?;
                ops.push(match func.as_str() {
                    "sin" => OpCode::Sin,
                    "cos" => OpCode::Cos,
                    "exp" => OpCode::Exp,
                    "ln" | "log" => OpCode::Ln,
                    "sqrt" => OpCode::Sqrt,
                    "abs" => OpCode::Abs,
                    _ => return Err(EpiError::UnknownFunction(func.clone())),
                });
            }
        }
        Ok(())
    }
}

fn builtin_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

// --- Simple Parser ---

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr> {
    let fail = |message: String| EpiError::Parse {
        expression: input.to_string(),
        message,
    };
    let tokens = tokenize(input).map_err(fail)?;
    if tokens.is_empty() {
        return Err(fail("empty expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expression().map_err(fail)?;
    if let Some(token) = parser.peek() {
        return Err(fail(format!("unexpected trailing token {token:?}")));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            // scientific notation: 1e5, 2.5E-3
            if let Some(&e) = chars.peek() {
                if e == 'e' || e == 'E' {
                    num_str.push(e);
                    chars.next();
                    if let Some(&sign) = chars.peek() {
                        if sign == '+' || sign == '-' {
                            num_str.push(sign);
                            chars.next();
                        }
                    }
                    while let Some(&d) = chars.peek() {
                        if d.is_ascii_digit() {
                            num_str.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            let value = num_str
                .parse()
                .map_err(|_| format!("invalid number literal `{num_str}`"))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            tokens.push(match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                other => return Err(format!("unexpected character `{other}`")),
            });
            chars.next();
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type ParseResult = std::result::Result<Expr, String>;

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).cloned()
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_expression(&mut self) -> ParseResult {
        let mut left = self.parse_product()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => '+',
                Token::Minus => '-',
                _ => break,
            };
            self.consume();
            let right = self.parse_product()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_product(&mut self) -> ParseResult {
        let mut left = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => '*',
                Token::Slash => '/',
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // Negation binds looser than `^`, so `-t^2` is `-(t^2)`.
    fn parse_unary(&mut self) -> ParseResult {
        if let Some(Token::Minus) = self.peek() {
            self.consume();
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary('-', Box::new(expr)));
        }
        self.parse_power()
    }

    // Right-associative: `2^3^2` is `2^(3^2)`.
    fn parse_power(&mut self) -> ParseResult {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), '^', Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ParseResult {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume(); // eat '('
                    let arg = self.parse_expression()?;
                    match self.consume() {
                        Some(Token::RParen) => Ok(Expr::Call(name, Box::new(arg))),
                        _ => Err("expected ')'".to_string()),
                    }
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                match self.consume() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected token {token:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, t: f64) -> f64 {
        let expr = parse(src).expect("expression should parse");
        let compiler = Compiler::new(&["t".to_string()], &[]);
        let code = compiler.compile(&expr).expect("expression should compile");
        VM::execute(&code, &[t], &[], &mut Vec::new())
    }

    #[test]
    fn evaluates_with_operator_precedence() {
        assert_eq!(eval("1 + 2 * 3", 0.0), 7.0);
        assert_eq!(eval("(1 + 2) * 3", 0.0), 9.0);
        assert_eq!(eval("2 ^ 3 * 2", 0.0), 16.0);
        assert_eq!(eval("10 - 4 - 3", 0.0), 3.0);
    }

    #[test]
    fn powers_bind_tighter_than_negation() {
        assert_eq!(eval("-t^2", 3.0), -9.0);
        assert_eq!(eval("(-t)^2", 3.0), 9.0);
        assert_eq!(eval("2^3^2", 0.0), 512.0);
        assert_eq!(eval("2^-1", 0.0), 0.5);
        assert_eq!(eval("3 * -2", 0.0), -6.0);
        let bell = eval("exp(-(t - 10)^2)", 12.0);
        assert!((bell - (-4.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn parses_scientific_notation() {
        assert_eq!(eval("1e5", 0.0), 100_000.0);
        assert_eq!(eval("2.5E-1 * t", 4.0), 1.0);
    }

    #[test]
    fn logistic_decay_of_reproduction_number() {
        let src = "2 / (1 + exp(0.1 * (t - 50)))";
        assert!((eval(src, 50.0) - 1.0).abs() < 1e-12);
        assert!(eval(src, 0.0) > 1.98);
        assert!(eval(src, 150.0) < 1e-3);
    }

    #[test]
    fn supports_functions_and_constants() {
        assert!((eval("ln(e)", 0.0) - 1.0).abs() < 1e-12);
        assert!((eval("sin(pi / 2)", 0.0) - 1.0).abs() < 1e-12);
        assert_eq!(eval("sqrt(abs(-16))", 0.0), 4.0);
    }

    #[test]
    fn named_constants_resolve_to_params() {
        let expr = parse("c * t + y_0").expect("parse");
        let compiler = Compiler::new(&["t".to_string()], &["c".to_string(), "y_0".to_string()]);
        let code = compiler.compile(&expr).expect("compile");
        let value = VM::execute(&code, &[2.0], &[3.0, 1.0], &mut Vec::new());
        assert_eq!(value, 7.0);
    }

    #[test]
    fn rejects_malformed_input() {
        for src in ["1 +", "(t", "t)", "2 $ 3", "", "1 2"] {
            let err = parse(src).expect_err("input should be rejected");
            assert!(
                matches!(err, EpiError::Parse { .. }),
                "unexpected error for {src:?}: {err}"
            );
        }
    }

    #[test]
    fn unknown_symbols_fail_to_compile() {
        let compiler = Compiler::new(&["t".to_string()], &[]);
        let err = compiler
            .compile(&parse("t + missing").expect("parse"))
            .expect_err("unknown symbol should fail");
        assert!(err.to_string().contains("unknown"), "unexpected error: {err}");

        let err = compiler
            .compile(&parse("tan(t)").expect("parse"))
            .expect_err("unknown function should fail");
        assert!(matches!(err, EpiError::UnknownFunction(name) if name == "tan"));
    }
}
