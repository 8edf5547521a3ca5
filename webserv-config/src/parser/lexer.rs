//! Lexer for the nginx-style configuration language
//!
//! Tokenizes configuration text into a flat stream.
//!
//! Key features:
//! - `{`, `}` and `;` are always tokens of their own, even with no surrounding space
//! - Words run until whitespace or one of `{ } ;`
//! - `"..."` and `'...'` are a single string token; backslash escapes are kept as written
//! - `#` at the start of a token comments out the rest of the line
//! - Brace balance is checked before the stream is handed to the parser

use crate::error::SyntaxError;
use logos::Logos;
use std::fmt;

/// Raw lexemes recognised by the generated lexer
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Lexeme {
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Whitespace,

    #[regex(r"#[^\n]*", logos::skip)]
    Comment,

    // ============================================================
    // Structural
    // ============================================================
    #[token("{")]
    BlockStart,

    #[token("}")]
    BlockEnd,

    #[token(";")]
    Semicolon,

    // ============================================================
    // Values
    // ============================================================
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    DoubleQuoted,

    #[regex(r"'([^'\\\n]|\\.)*'")]
    SingleQuoted,

    #[regex(r#"[^ \t\r\n\f{};"'#][^ \t\r\n\f{};]*"#)]
    Word,
}

/// Kind of a [`Token`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    BlockStart,
    BlockEnd,
    String,
    Semicolon,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::BlockStart => "'{'",
            TokenKind::BlockEnd => "'}'",
            TokenKind::String => "string",
            TokenKind::Semicolon => "';'",
            TokenKind::Eof => "end of file",
        };
        f.write_str(name)
    }
}

/// A token with the line it started on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// A string token with exactly this text
    pub fn is_word(&self, text: &str) -> bool {
        self.kind == TokenKind::String && self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "'{}'", self.text),
            kind => write!(f, "{}", kind),
        }
    }
}

/// Lexer result type
pub type LexResult = Result<Vec<Token>, SyntaxError>;

/// Byte offsets where each line starts, for span to line conversion
struct LineIndex(Vec<usize>);

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self(starts)
    }

    fn line_of(&self, offset: usize) -> usize {
        self.0.partition_point(|&start| start <= offset)
    }
}

/// Tokenize configuration text
///
/// The returned stream always ends with an [`TokenKind::Eof`] token and has
/// balanced braces.
pub fn tokenize(source: &str) -> LexResult {
    let index = LineIndex::new(source);
    let mut lexer = Lexeme::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let line = index.line_of(lexer.span().start);
        let slice = lexer.slice();

        let token = match result {
            Ok(Lexeme::BlockStart) => Token::new(TokenKind::BlockStart, "{", line),
            Ok(Lexeme::BlockEnd) => Token::new(TokenKind::BlockEnd, "}", line),
            Ok(Lexeme::Semicolon) => Token::new(TokenKind::Semicolon, ";", line),
            Ok(Lexeme::DoubleQuoted | Lexeme::SingleQuoted) => {
                Token::new(TokenKind::String, &slice[1..slice.len() - 1], line)
            }
            Ok(Lexeme::Word) => Token::new(TokenKind::String, slice, line),
            Ok(Lexeme::Whitespace | Lexeme::Comment) => continue,
            Err(()) if slice.starts_with(['"', '\'']) => {
                return Err(SyntaxError::UnexpectedEof {
                    line,
                    message: format!("Unterminated quoted string at line {}", line),
                });
            }
            Err(()) => {
                return Err(SyntaxError::UnexpectedToken {
                    line,
                    message: format!("Unexpected character '{}' at line {}", slice, line),
                });
            }
        };
        tokens.push(token);
    }

    let last_line = source.lines().count().max(1);
    tokens.push(Token::new(TokenKind::Eof, "", last_line));

    validate_braces(&tokens)?;
    tracing::debug!("Tokenized {} tokens", tokens.len());
    Ok(tokens)
}

/// Check that braces never close below zero and are balanced at the end
pub fn validate_braces(tokens: &[Token]) -> Result<(), SyntaxError> {
    let mut balance: usize = 0;

    for token in tokens {
        match token.kind {
            TokenKind::BlockStart => balance += 1,
            TokenKind::BlockEnd => {
                balance = balance.checked_sub(1).ok_or_else(|| SyntaxError::UnexpectedToken {
                    line: token.line,
                    message: format!("Unexpected '}}' at line {}", token.line),
                })?;
            }
            _ => {}
        }
    }

    if balance > 0 {
        let line = tokens.last().map_or(1, |t| t.line);
        return Err(SyntaxError::MissingBrace {
            line,
            message: format!("Unclosed block (missing '}}') at line {}", line),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_basic_directive() {
        let tokens = kinds("server { listen 8080; }");
        let expected = vec![
            (TokenKind::String, "server".to_string()),
            (TokenKind::BlockStart, "{".to_string()),
            (TokenKind::String, "listen".to_string()),
            (TokenKind::String, "8080".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
            (TokenKind::BlockEnd, "}".to_string()),
            (TokenKind::Eof, String::new()),
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_adjacent_delimiters() {
        let tokens = kinds("server{listen 80;root /var/www;}");
        let texts: Vec<_> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["server", "{", "listen", "80", ";", "root", "/var/www", ";", "}", ""]);
    }

    #[test]
    fn test_comments_and_lines() {
        let source = "# leading comment\nworker_processes 4; # trailing\n\nerror_log /tmp/e.log;";
        let tokens = tokenize(source).unwrap();
        assert_eq!(tokens[0].text, "worker_processes");
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[3].text, "error_log");
        assert_eq!(tokens[3].line, 4);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(tokens.last().unwrap().line, 4);
    }

    #[test]
    fn test_hash_inside_word() {
        let tokens = kinds("return 302 /page#top;");
        assert_eq!(tokens[2].1, "/page#top");
    }

    #[test]
    fn test_quoted_strings() {
        let tokens = kinds(r#"return 404 "Not Found"; add_header X 'a;b{c}';"#);
        assert_eq!(tokens[2], (TokenKind::String, "Not Found".to_string()));
        assert_eq!(tokens[6], (TokenKind::String, "a;b{c}".to_string()));
    }

    #[test]
    fn test_escapes_pass_through() {
        let tokens = kinds(r#"return 200 "say \"hi\"";"#);
        assert_eq!(tokens[2].1, r#"say \"hi\""#);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = tokenize("root /var;\nreturn 200 \"oops;\n").unwrap_err();
        assert!(matches!(err, SyntaxError::UnexpectedEof { line: 2, .. }));
    }

    #[test]
    fn test_premature_close() {
        let err = tokenize("http {\n}\n}\n").unwrap_err();
        assert!(matches!(err, SyntaxError::UnexpectedToken { line: 3, .. }));
    }

    #[test]
    fn test_unclosed_block() {
        let err = tokenize("http {\n server {\n }\n").unwrap_err();
        assert!(matches!(err, SyntaxError::MissingBrace { line: 3, .. }));
    }

    #[test]
    fn test_brace_balance_prefixes() {
        let t = |kind| Token::new(kind, "", 1);
        let balanced = [
            t(TokenKind::BlockStart),
            t(TokenKind::BlockStart),
            t(TokenKind::BlockEnd),
            t(TokenKind::BlockEnd),
            t(TokenKind::Eof),
        ];
        assert!(validate_braces(&balanced).is_ok());

        let dips = [t(TokenKind::BlockEnd), t(TokenKind::BlockStart), t(TokenKind::Eof)];
        assert!(matches!(validate_braces(&dips), Err(SyntaxError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_empty_source() {
        let tokens = tokenize("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }
}
