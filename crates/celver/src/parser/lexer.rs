//! Tokenizer built on logos.

use logos::Logos;

use super::ast::Span;

pub type SpannedToken = (Token, Span);

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Words reserved by the language that may not be used as identifiers.
const RESERVED: &[&str] = &[
    "as", "break", "const", "continue", "else", "for", "function", "if", "import", "let", "loop",
    "package", "namespace", "return", "var", "void", "while",
];

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    /// Magnitude only; the parser applies a leading `-` and range-checks.
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok(), priority = 3)]
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok(), priority = 1)]
    Int(u64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok(), priority = 5)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok(), priority = 2)]
    Float(f64),

    #[regex(r#"""""#, |lex| triple_quoted(lex, "\"\"\""))]
    #[regex(r"'''", |lex| triple_quoted(lex, "'''"))]
    #[regex(r#"[rR]""#, |lex| raw_quoted(lex, '"'))]
    #[regex(r"[rR]'", |lex| raw_quoted(lex, '\''))]
    #[regex(r#"""#, |lex| text_quoted(lex, '"'))]
    #[regex(r"'", |lex| text_quoted(lex, '\''))]
    String(String),

    #[regex(r#"[bB]""#, |lex| scan_quoted(lex, '"', EscapeMode::Bytes))]
    #[regex(r"[bB]'", |lex| scan_quoted(lex, '\'', EscapeMode::Bytes))]
    Bytes(Vec<u8>),

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("in")]
    In,

    /// Produced by [`lex`] for identifiers listed in [`RESERVED`].
    Reserved(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 0)]
    Ident(String),

    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Token::Int(n) => return write!(f, "{}", n),
            Token::Float(n) => return write!(f, "{}", n),
            Token::String(s) => return write!(f, "{:?}", s),
            Token::Bytes(b) => return write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Token::Reserved(s) | Token::Ident(s) => return f.write_str(s),
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::In => "in",
            Token::EqEq => "==",
            Token::Ne => "!=",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::And => "&&",
            Token::Or => "||",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Not => "!",
            Token::Question => "?",
            Token::Colon => ":",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Dot => ".",
            Token::Comma => ",",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum EscapeMode {
    /// `\x` and octal escapes denote code points.
    Text,
    /// `\x` and octal escapes denote raw bytes.
    Bytes,
}

fn text_quoted(lex: &mut logos::Lexer<Token>, quote: char) -> Option<String> {
    String::from_utf8(scan_quoted(lex, quote, EscapeMode::Text)?).ok()
}

/// Scan a single-line quoted literal after its opening quote, decoding escapes.
fn scan_quoted(lex: &mut logos::Lexer<Token>, quote: char, mode: EscapeMode) -> Option<Vec<u8>> {
    let remainder = lex.remainder();
    let mut chars = remainder.char_indices();
    let mut out = Vec::new();

    while let Some((pos, c)) = chars.next() {
        match c {
            c if c == quote => {
                lex.bump(pos + c.len_utf8());
                return Some(out);
            }
            '\n' => return None,
            '\\' => {
                let (_, escape) = chars.next()?;
                match escape {
                    'x' | 'X' => {
                        let code = take_hex(&mut chars, 2)?;
                        push_code(&mut out, code, mode)?;
                    }
                    'u' => push_char(&mut out, char::from_u32(take_hex(&mut chars, 4)?)?),
                    'U' => push_char(&mut out, char::from_u32(take_hex(&mut chars, 8)?)?),
                    '0'..='3' => {
                        let mut code = escape.to_digit(8)?;
                        for _ in 0..2 {
                            code = code * 8 + chars.next()?.1.to_digit(8)?;
                        }
                        push_code(&mut out, code, mode)?;
                    }
                    other => push_char(&mut out, simple_escape(other)?),
                }
            }
            other => push_char(&mut out, other),
        }
    }

    None
}

fn simple_escape(c: char) -> Option<char> {
    Some(match c {
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0C',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0B',
        '\\' | '\'' | '"' | '`' | '?' | '/' => c,
        _ => return None,
    })
}

fn take_hex(chars: &mut std::str::CharIndices<'_>, digits: usize) -> Option<u32> {
    let mut value = 0;
    for _ in 0..digits {
        value = value * 16 + chars.next()?.1.to_digit(16)?;
    }
    Some(value)
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn push_code(out: &mut Vec<u8>, code: u32, mode: EscapeMode) -> Option<()> {
    match mode {
        EscapeMode::Bytes => out.push(u8::try_from(code).ok()?),
        EscapeMode::Text => push_char(out, char::from_u32(code)?),
    }
    Some(())
}

fn raw_quoted(lex: &mut logos::Lexer<Token>, quote: char) -> Option<String> {
    let remainder = lex.remainder();
    let end = remainder.find(quote)?;
    let content = &remainder[..end];
    if content.contains('\n') {
        return None;
    }
    let content = content.to_string();
    lex.bump(end + quote.len_utf8());
    Some(content)
}

fn triple_quoted(lex: &mut logos::Lexer<Token>, delimiter: &str) -> Option<String> {
    let remainder = lex.remainder();
    let end = remainder.find(delimiter)?;
    let content = remainder[..end].to_string();
    lex.bump(end + delimiter.len());
    Some(content)
}

/// Tokenize the input, failing on the first unrecognized character or malformed literal.
pub fn lex(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(Token::Ident(name)) if RESERVED.contains(&name.as_str()) => {
                tokens.push((Token::Reserved(name), span))
            }
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let text = &input[span.clone()];
                let message = if text.starts_with(['"', '\'']) || text.len() > 1 {
                    format!("malformed literal starting at '{}'", text)
                } else {
                    format!("unexpected character '{}'", text)
                };
                return Err(LexError { message, span });
            }
        }
    }

    Ok(tokens)
}
