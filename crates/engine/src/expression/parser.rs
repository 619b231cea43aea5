//! Recursive-descent parser producing the expression tree.

use cogwork_types::Value;

use super::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

/// Built-in functions, resolved while parsing so unknown names fail early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Len,
    Str,
    Int,
    Float,
    Upper,
    Lower,
    Default,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "len" => Function::Len,
            "str" => Function::Str,
            "int" => Function::Int,
            "float" => Function::Float,
            "upper" => Function::Upper,
            "lower" => Function::Lower,
            "default" => Function::Default,
            _ => return None,
        })
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Function::Len => "len",
            Function::Str => "str",
            Function::Int => "int",
            Function::Float => "float",
            Function::Upper => "upper",
            Function::Lower => "lower",
            Function::Default => "default",
        }
    }

    fn arity(self) -> usize {
        match self {
            Function::Default => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Variable(String),
    List(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

/// Deepest nesting of parentheses, brackets, calls and prefix operators.
const MAX_NESTING: usize = 64;

/// Longest fragment, in tokens. Operator chains build left-deep trees, so this
/// bounds tree depth where [`MAX_NESTING`] cannot.
const MAX_TOKENS: usize = 512;

pub(crate) fn parse(tokens: Vec<Token>) -> Result<Expr, String> {
    if tokens.is_empty() {
        return Err("expression is empty".into());
    }
    if tokens.len() > MAX_TOKENS {
        return Err(format!("expression is too long ({} tokens, at most {MAX_TOKENS})", tokens.len()));
    }
    let mut parser = Parser {
        tokens,
        position: 0,
        depth: 0,
    };
    let expression = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expression),
        Some(token) => Err(format!("unexpected {} after end of expression", token.describe())),
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {} but found {}", expected.describe(), token.describe())),
            None => Err(format!("expected {} but the expression ended", expected.describe())),
        }
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, String>) -> Result<T, String> {
        if self.depth >= MAX_NESTING {
            return Err(format!("expression nested more than {MAX_NESTING} levels deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_comparison()?;
        loop {
            let operator = match self.peek() {
                Some(Token::EqualEqual) => BinaryOp::Equal,
                Some(Token::NotEqual) => BinaryOp::NotEqual,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_comparison()?;
            left = Expr::Binary(operator, Box::new(left), Box::new(right));
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_additive()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Less) => BinaryOp::Less,
                Some(Token::LessEqual) => BinaryOp::LessEqual,
                Some(Token::Greater) => BinaryOp::Greater,
                Some(Token::GreaterEqual) => BinaryOp::GreaterEqual,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_additive()?;
            left = Expr::Binary(operator, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(operator, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Remainder,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(operator, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        let operator = if self.eat(&Token::Minus) {
            UnaryOp::Negate
        } else if self.eat(&Token::Bang) {
            UnaryOp::Not
        } else {
            return self.parse_postfix();
        };
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary(operator, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, String> {
        let mut expression = self.parse_primary()?;
        while self.eat(&Token::LeftBracket) {
            let index = self.nested(Self::parse_or)?;
            self.expect(Token::RightBracket)?;
            expression = Expr::Index(Box::new(expression), Box::new(index));
        }
        Ok(expression)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let token = self.advance().ok_or_else(|| "unexpected end of expression".to_string())?;
        match token {
            Token::Integer(number) => Ok(Expr::Literal(Value::Integer(number))),
            Token::Float(number) => Ok(Expr::Literal(Value::Float(number))),
            Token::Str(text) => Ok(Expr::Literal(Value::String(text))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::LeftParen => {
                let inner = self.nested(Self::parse_or)?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Token::LeftBracket => {
                let items = self.nested(|parser| parser.parse_arguments(Token::RightBracket))?;
                Ok(Expr::List(items))
            }
            Token::Ident(name) => {
                if !self.eat(&Token::LeftParen) {
                    return Ok(Expr::Variable(name));
                }
                let function = Function::lookup(&name).ok_or_else(|| format!("unknown function '{name}'"))?;
                let arguments = self.nested(|parser| parser.parse_arguments(Token::RightParen))?;
                if arguments.len() != function.arity() {
                    return Err(format!(
                        "{}() takes {} argument(s) but {} were given",
                        function.name(),
                        function.arity(),
                        arguments.len()
                    ));
                }
                Ok(Expr::Call(function, arguments))
            }
            other => Err(format!("unexpected {}", other.describe())),
        }
    }

    /// Comma separated expressions up to `closing`, which is consumed. A trailing comma is allowed.
    fn parse_arguments(&mut self, closing: Token) -> Result<Vec<Expr>, String> {
        let mut items = Vec::new();
        loop {
            if self.eat(&closing) {
                return Ok(items);
            }
            items.push(self.parse_or()?);
            if !self.eat(&Token::Comma) {
                self.expect(closing)?;
                return Ok(items);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::lexer::tokenize;

    fn parse_source(source: &str) -> Result<Expr, String> {
        parse(tokenize(source)?)
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expression = parse_source("1 + 2 * 3").expect("parse");
        assert_eq!(
            expression,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Literal(Value::Integer(1))),
                Box::new(Expr::Binary(
                    BinaryOp::Multiply,
                    Box::new(Expr::Literal(Value::Integer(2))),
                    Box::new(Expr::Literal(Value::Integer(3)))
                ))
            )
        );
    }

    #[test]
    fn indexing_and_calls_nest() {
        let expression = parse_source("upper(names[0])").expect("parse");
        assert_eq!(
            expression,
            Expr::Call(
                Function::Upper,
                vec![Expr::Index(
                    Box::new(Expr::Variable("names".into())),
                    Box::new(Expr::Literal(Value::Integer(0)))
                )]
            )
        );
    }

    #[test]
    fn reports_structural_errors() {
        assert!(parse_source("1 +").unwrap_err().contains("unexpected end"));
        assert!(parse_source("(1").unwrap_err().contains("expected ')'"));
        assert!(parse_source("1 2").unwrap_err().contains("after end of expression"));
        assert!(parse_source("shout(x)").unwrap_err().contains("unknown function 'shout'"));
        assert!(parse_source("len(a, b)").unwrap_err().contains("takes 1 argument"));
        assert!(parse(Vec::new()).unwrap_err().contains("empty"));
    }

    #[test]
    fn nesting_limit_covers_every_recursive_form() {
        let at_limit = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse_source(&at_limit).is_ok());

        let too_deep = [
            format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1)),
            format!("{}1", "!".repeat(MAX_NESTING + 1)),
            format!("{}1{}", "len(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1)),
            format!("{}0{}", "items[".repeat(MAX_NESTING + 1), "]".repeat(MAX_NESTING + 1)),
        ];
        for source in &too_deep {
            assert!(parse_source(source).unwrap_err().contains("nested more than"), "{source}");
        }
    }
}
