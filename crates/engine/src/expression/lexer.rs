//! Tokenizer for the built-in expression language.

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Integer(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Integer(number) => number.to_string(),
            Token::Float(number) => number.to_string(),
            Token::Str(text) => format!("{text:?}"),
            Token::Ident(name) => name.clone(),
            Token::True => "true".into(),
            Token::False => "false".into(),
            Token::Null => "null".into(),
            Token::LeftParen => "'('".into(),
            Token::RightParen => "')'".into(),
            Token::LeftBracket => "'['".into(),
            Token::RightBracket => "']'".into(),
            Token::Comma => "','".into(),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Percent => "'%'".into(),
            Token::Bang => "'!'".into(),
            Token::EqualEqual => "'=='".into(),
            Token::NotEqual => "'!='".into(),
            Token::Less => "'<'".into(),
            Token::LessEqual => "'<='".into(),
            Token::Greater => "'>'".into(),
            Token::GreaterEqual => "'>='".into(),
            Token::AndAnd => "'&&'".into(),
            Token::OrOr => "'||'".into(),
        }
    }
}

/// Split `source` into tokens. Errors carry a human readable message.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let current = chars[index];
        if current.is_whitespace() {
            index += 1;
            continue;
        }

        if current.is_ascii_digit() {
            let (token, next) = lex_number(&chars, index)?;
            tokens.push(token);
            index = next;
            continue;
        }

        if current.is_alphabetic() || current == '_' {
            let start = index;
            while index < chars.len() && (chars[index].is_alphanumeric() || chars[index] == '_' || chars[index] == '.') {
                index += 1;
            }
            let word: String = chars[start..index].iter().collect();
            tokens.push(match word.as_str() {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                _ => Token::Ident(word),
            });
            continue;
        }

        if current == '\'' || current == '"' {
            let (text, next) = lex_string(&chars, index)?;
            tokens.push(Token::Str(text));
            index = next;
            continue;
        }

        let next = chars.get(index + 1).copied();
        let (token, width) = match (current, next) {
            ('=', Some('=')) => (Token::EqualEqual, 2),
            ('!', Some('=')) => (Token::NotEqual, 2),
            ('<', Some('=')) => (Token::LessEqual, 2),
            ('>', Some('=')) => (Token::GreaterEqual, 2),
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('!', _) => (Token::Bang, 1),
            ('<', _) => (Token::Less, 1),
            ('>', _) => (Token::Greater, 1),
            ('(', _) => (Token::LeftParen, 1),
            (')', _) => (Token::RightParen, 1),
            ('[', _) => (Token::LeftBracket, 1),
            (']', _) => (Token::RightBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('=', _) => return Err(format!("unexpected '=' at position {index}; use '==' for comparison")),
            (other, _) => return Err(format!("unexpected character '{other}' at position {index}")),
        };
        tokens.push(token);
        index += width;
    }

    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> Result<(Token, usize), String> {
    let mut index = start;
    let mut is_float = false;
    while index < chars.len() && chars[index].is_ascii_digit() {
        index += 1;
    }
    if index + 1 < chars.len() && chars[index] == '.' && chars[index + 1].is_ascii_digit() {
        is_float = true;
        index += 1;
        while index < chars.len() && chars[index].is_ascii_digit() {
            index += 1;
        }
    }
    if index < chars.len() && (chars[index] == 'e' || chars[index] == 'E') {
        let mut lookahead = index + 1;
        if lookahead < chars.len() && (chars[lookahead] == '+' || chars[lookahead] == '-') {
            lookahead += 1;
        }
        if lookahead < chars.len() && chars[lookahead].is_ascii_digit() {
            is_float = true;
            index = lookahead;
            while index < chars.len() && chars[index].is_ascii_digit() {
                index += 1;
            }
        }
    }

    let literal: String = chars[start..index].iter().collect();
    if is_float {
        let number = literal.parse::<f64>().map_err(|error| format!("invalid number '{literal}': {error}"))?;
        Ok((Token::Float(number), index))
    } else {
        let number = literal
            .parse::<i64>()
            .map_err(|_| format!("integer literal '{literal}' is out of range"))?;
        Ok((Token::Integer(number), index))
    }
}

fn lex_string(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let quote = chars[start];
    let mut text = String::new();
    let mut index = start + 1;

    while index < chars.len() {
        match chars[index] {
            current if current == quote => return Ok((text, index + 1)),
            '\\' => {
                let escaped = chars
                    .get(index + 1)
                    .ok_or_else(|| "unterminated escape sequence in string literal".to_string())?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    '\\' => '\\',
                    '\'' => '\'',
                    '"' => '"',
                    '{' => '{',
                    '}' => '}',
                    other => return Err(format!("unknown escape sequence '\\{other}'")),
                });
                index += 2;
            }
            other => {
                text.push(other);
                index += 1;
            }
        }
    }

    Err("unterminated string literal".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_operators_and_literals() {
        let tokens = tokenize("a.b >= 2.5 && !done || 'x' != \"y\"").expect("tokens");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a.b".into()),
                Token::GreaterEqual,
                Token::Float(2.5),
                Token::AndAnd,
                Token::Bang,
                Token::Ident("done".into()),
                Token::OrOr,
                Token::Str("x".into()),
                Token::NotEqual,
                Token::Str("y".into()),
            ]
        );
    }

    #[test]
    fn integers_stay_integers_and_exponents_make_floats() {
        assert_eq!(tokenize("42").expect("tokens"), vec![Token::Integer(42)]);
        assert_eq!(tokenize("1e3").expect("tokens"), vec![Token::Float(1000.0)]);
    }

    #[test]
    fn string_escapes_are_decoded() {
        let tokens = tokenize(r#"'it\'s {here}\n'"#).expect("tokens");
        assert_eq!(tokens, vec![Token::Str("it's {here}\n".into())]);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(tokenize("'open").unwrap_err().contains("unterminated"));
        assert!(tokenize("a = b").unwrap_err().contains("'=='"));
        assert!(tokenize("a # b").unwrap_err().contains("'#'"));
        assert!(tokenize("99999999999999999999").unwrap_err().contains("out of range"));
    }
}
