//! Lexer and parser for the transformation language.
//!
//! The language is deliberately tiny: assignment statements whose right-hand
//! side is an identifier or literal followed by a chain of method calls with
//! literal arguments. There are no control flow constructs, no user-defined
//! functions, and no way to name anything other than dataset values, so the
//! grammar itself is part of the sandbox.
//!
//! ```text
//! program := stmt*
//! stmt    := IDENT '=' expr
//! expr    := (IDENT | literal) call*
//! call    := '.' IDENT '(' [ literal {',' literal} ] ')'
//! ```
//!
//! `#` starts a comment that runs to end of line.

use std::fmt;

/// Literal value as written in generated code.
#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Str(s) => write!(f, "\"{s}\""),
            Lit::Int(v) => write!(f, "{v}"),
            Lit::Float(v) => write!(f, "{v}"),
            Lit::Bool(v) => write!(f, "{v}"),
            Lit::Null => f.write_str("null"),
        }
    }
}

/// One method call in a chain, e.g. `drop_nulls("artist")`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub args: Vec<Lit>,
    /// 1-based source line, for error messages.
    pub line: usize,
}

/// Base of an expression before any method calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Ident(String),
    Literal(Lit),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub base: Operand,
    pub calls: Vec<MethodCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub target: String,
    pub expr: Expr,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Lit(Lit),
    Assign,
    Dot,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
}

/// Parse a full program. Errors carry the source line.
pub fn parse_program(code: &str) -> Result<Program, String> {
    let tokens = lex(code)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut stmts = Vec::new();
    while !parser.at_end() {
        stmts.push(parser.statement()?);
    }
    Ok(Program { stmts })
}

fn lex(code: &str) -> Result<Vec<Spanned>, String> {
    let mut tokens = Vec::new();
    let mut chars = code.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // comment to end of line
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    return Err(format!("line {line}: unexpected '==' outside a filter argument"));
                }
                tokens.push(Spanned { token: Token::Assign, line });
            }
            '.' => {
                chars.next();
                tokens.push(Spanned { token: Token::Dot, line });
            }
            '(' => {
                chars.next();
                tokens.push(Spanned { token: Token::LParen, line });
            }
            ')' => {
                chars.next();
                tokens.push(Spanned { token: Token::RParen, line });
            }
            ',' => {
                chars.next();
                tokens.push(Spanned { token: Token::Comma, line });
            }
            '"' | '\'' => {
                let lit = lex_string(&mut chars, line)?;
                tokens.push(Spanned { token: Token::Lit(lit), line });
            }
            c if c.is_ascii_digit() || c == '-' => {
                let lit = lex_number(&mut chars, line)?;
                tokens.push(Spanned { token: Token::Lit(lit), line });
            }
            c if c.is_alphabetic() || c == '_' => {
                let word = lex_word(&mut chars);
                let token = match word.as_str() {
                    "true" | "True" => Token::Lit(Lit::Bool(true)),
                    "false" | "False" => Token::Lit(Lit::Bool(false)),
                    "null" | "None" => Token::Lit(Lit::Null),
                    _ => Token::Ident(word),
                };
                tokens.push(Spanned { token, line });
            }
            other => {
                return Err(format!("line {line}: unexpected character '{other}'"));
            }
        }
    }
    Ok(tokens)
}

fn lex_string(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, line: usize) -> Result<Lit, String> {
    let quote = chars.next().expect("caller peeked the quote");
    let mut out = String::new();
    loop {
        match chars.next() {
            None | Some('\n') => {
                return Err(format!("line {line}: unterminated string literal"));
            }
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(c @ ('"' | '\'' | '\\')) => out.push(c),
                Some(c) => return Err(format!("line {line}: unknown escape '\\{c}'")),
                None => return Err(format!("line {line}: unterminated string literal")),
            },
            Some(c) if c == quote => return Ok(Lit::Str(out)),
            Some(c) => out.push(c),
        }
    }
}

fn lex_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, line: usize) -> Result<Lit, String> {
    let mut text = String::new();
    if chars.peek() == Some(&'-') {
        text.push(chars.next().expect("peeked"));
    }
    let mut is_float = false;
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            chars.next();
        } else if c == '.' && !is_float {
            is_float = true;
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if is_float {
        text.parse::<f64>()
            .map(Lit::Float)
            .map_err(|_| format!("line {line}: invalid number '{text}'"))
    } else {
        text.parse::<i64>()
            .map(Lit::Int)
            .map_err(|_| format!("line {line}: invalid number '{text}'"))
    }
}

fn lex_word(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }
    word
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    fn statement(&mut self) -> Result<Stmt, String> {
        let (target, line) = match self.next() {
            Some(Spanned { token: Token::Ident(name), line }) => (name, line),
            Some(Spanned { token, line }) => {
                return Err(format!("line {line}: expected identifier, found {token:?}"));
            }
            None => return Err("unexpected end of code".to_string()),
        };
        match self.next() {
            Some(Spanned { token: Token::Assign, .. }) => {}
            Some(Spanned { token, line }) => {
                return Err(format!("line {line}: expected '=' after '{target}', found {token:?}"));
            }
            None => return Err(format!("line {line}: expected '=' after '{target}'")),
        }
        let expr = self.expression()?;
        Ok(Stmt { target, expr, line })
    }

    fn expression(&mut self) -> Result<Expr, String> {
        let base = match self.next() {
            Some(Spanned { token: Token::Ident(name), .. }) => Operand::Ident(name),
            Some(Spanned { token: Token::Lit(lit), .. }) => Operand::Literal(lit),
            Some(Spanned { token, line }) => {
                return Err(format!("line {line}: expected a value, found {token:?}"));
            }
            None => return Err(format!("line {}: expected a value", self.last_line())),
        };

        let mut calls = Vec::new();
        while matches!(self.peek(), Some(Spanned { token: Token::Dot, .. })) {
            self.next();
            calls.push(self.call()?);
        }
        Ok(Expr { base, calls })
    }

    fn call(&mut self) -> Result<MethodCall, String> {
        let (name, line) = match self.next() {
            Some(Spanned { token: Token::Ident(name), line }) => (name, line),
            Some(Spanned { token, line }) => {
                return Err(format!("line {line}: expected method name, found {token:?}"));
            }
            None => return Err(format!("line {}: expected method name", self.last_line())),
        };
        match self.next() {
            Some(Spanned { token: Token::LParen, .. }) => {}
            _ => return Err(format!("line {line}: expected '(' after '{name}'")),
        }

        let mut args = Vec::new();
        if matches!(self.peek(), Some(Spanned { token: Token::RParen, .. })) {
            self.next();
            return Ok(MethodCall { name, args, line });
        }
        loop {
            match self.next() {
                Some(Spanned { token: Token::Lit(lit), .. }) => args.push(lit),
                Some(Spanned { token, line }) => {
                    return Err(format!(
                        "line {line}: method arguments must be literals, found {token:?}"
                    ));
                }
                None => return Err(format!("line {line}: unterminated call to '{name}'")),
            }
            match self.next() {
                Some(Spanned { token: Token::Comma, .. }) => {}
                Some(Spanned { token: Token::RParen, .. }) => break,
                Some(Spanned { token, line }) => {
                    return Err(format!("line {line}: expected ',' or ')', found {token:?}"));
                }
                None => return Err(format!("line {line}: unterminated call to '{name}'")),
            }
        }
        Ok(MethodCall { name, args, line })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignment_with_chain() {
        let program = parse_program("df = df.drop_nulls(\"a\").fill_null(\"b\", \"Unknown\")")
            .expect("parse");
        assert_eq!(program.stmts.len(), 1);
        let stmt = &program.stmts[0];
        assert_eq!(stmt.target, "df");
        assert_eq!(stmt.expr.base, Operand::Ident("df".to_string()));
        assert_eq!(stmt.expr.calls.len(), 2);
        assert_eq!(stmt.expr.calls[0].name, "drop_nulls");
        assert_eq!(stmt.expr.calls[1].args[1], Lit::Str("Unknown".to_string()));
    }

    #[test]
    fn parses_multiple_statements_and_comments() {
        let code = "# clean step\ndf = df.copy()\ndf = df.trim(\"name\")";
        let program = parse_program(code).expect("parse");
        assert_eq!(program.stmts.len(), 2);
        assert_eq!(program.stmts[1].line, 3);
    }

    #[test]
    fn parses_literal_kinds() {
        let program =
            parse_program("df = df.clip(\"v\", -1, 2.5).filter(\"ok\", \"==\", True).fill_null(\"x\", null)")
                .expect("parse");
        let calls = &program.stmts[0].expr.calls;
        assert_eq!(calls[0].args[1], Lit::Int(-1));
        assert_eq!(calls[0].args[2], Lit::Float(2.5));
        assert_eq!(calls[1].args[2], Lit::Bool(true));
        assert_eq!(calls[2].args[1], Lit::Null);
    }

    #[test]
    fn parses_single_quoted_strings() {
        let program = parse_program("df = df.fill_null('artist', 'Unknown')").expect("parse");
        assert_eq!(
            program.stmts[0].expr.calls[0].args[0],
            Lit::Str("artist".to_string())
        );
    }

    #[test]
    fn empty_code_is_an_empty_program() {
        let program = parse_program("").expect("parse");
        assert!(program.stmts.is_empty());
        let program = parse_program("# only a comment\n").expect("parse");
        assert!(program.stmts.is_empty());
    }

    #[test]
    fn reports_line_on_error() {
        let err = parse_program("df = df.copy()\ndf = df.drop_nulls(oops)").unwrap_err();
        assert!(err.contains("line 2"), "got: {err}");
        assert!(err.contains("literal"), "got: {err}");
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = parse_program("df = df.fill_null(\"a, 1)").unwrap_err();
        assert!(err.contains("unterminated string"));
    }

    #[test]
    fn rejects_call_on_nothing() {
        let err = parse_program("df =").unwrap_err();
        assert!(err.contains("expected a value"));
    }
}
