use std::fmt;

use eyre::Result;

use super::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme {
    /// Unquoted word, directives are always identifiers
    Ident(String),
    /// Contents of a quoted string, without the quotes
    Str(String),
    /// Let the caller decide if they need an int or a float
    Num(String),
    OpenBracket,
    CloseBracket,
    Eof,
}

impl Lexeme {
    pub fn kind(&self) -> LexemeKind {
        match self {
            Lexeme::Ident(_) => LexemeKind::Ident,
            Lexeme::Str(_) => LexemeKind::Str,
            Lexeme::Num(_) => LexemeKind::Num,
            Lexeme::OpenBracket => LexemeKind::OpenBracket,
            Lexeme::CloseBracket => LexemeKind::CloseBracket,
            Lexeme::Eof => LexemeKind::Eof,
        }
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::Ident(s) => write!(f, "{s}"),
            Lexeme::Str(s) => write!(f, "\"{s}\""),
            Lexeme::Num(n) => write!(f, "{n}"),
            Lexeme::OpenBracket => write!(f, "["),
            Lexeme::CloseBracket => write!(f, "]"),
            Lexeme::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    Ident,
    Str,
    Num,
    OpenBracket,
    CloseBracket,
    Eof,
}

impl LexemeKind {
    pub fn describe(self) -> &'static str {
        match self {
            LexemeKind::Ident => "an identifier",
            LexemeKind::Str => "a quoted string",
            LexemeKind::Num => "a number",
            LexemeKind::OpenBracket => "'['",
            LexemeKind::CloseBracket => "']'",
            LexemeKind::Eof => "end of input",
        }
    }
}

/// Splits the text of one scene file into lexemes.
///
/// Holds at most one lexeme of look-ahead.
pub struct Lexer {
    txt: String,
    pos: usize,
    line: usize,
    lexeme_buf: Option<Lexeme>,
}

impl Lexer {
    pub fn new(txt: String) -> Self {
        Self {
            txt,
            pos: 0,
            line: 1,
            lexeme_buf: None,
        }
    }

    /// Line the lexer has advanced to.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn peek(&mut self) -> Result<&Lexeme> {
        let l = match self.lexeme_buf.take() {
            Some(l) => l,
            None => self.lex()?,
        };

        Ok(self.lexeme_buf.insert(l))
    }

    pub fn next(&mut self) -> Result<Lexeme> {
        if let Some(l) = self.lexeme_buf.take() {
            return Ok(l);
        }

        self.lex()
    }

    fn lex(&mut self) -> Result<Lexeme> {
        self.skip_whitespace_comments();

        let next = match self.peek_char() {
            Some(ch) => ch,
            None => return Ok(Lexeme::Eof),
        };

        Ok(match next {
            '"' => self.lex_quoted()?,
            '[' => {
                self.advance();
                Lexeme::OpenBracket
            }
            ']' => {
                self.advance();
                Lexeme::CloseBracket
            }
            ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_ident(),
            '-' | '+' | '.' => self.lex_num(),
            ch if ch.is_ascii_digit() => self.lex_num(),
            ch => {
                return Err(ParseError::InvalidInput {
                    reason: format!("invalid character '{ch}'"),
                }
                .into())
            }
        })
    }

    fn lex_ident(&mut self) -> Lexeme {
        let s = self.advance_while(|ch| {
            ch != '"' && ch != '[' && ch != ']' && ch != '#' && !ch.is_ascii_whitespace()
        });
        Lexeme::Ident(s.to_string())
    }

    fn lex_num(&mut self) -> Lexeme {
        let s = self.advance_while(|ch| {
            matches!(ch, '-' | '+' | '.' | 'e' | 'E') || ch.is_ascii_digit()
        });
        Lexeme::Num(s.to_string())
    }

    fn lex_quoted(&mut self) -> Result<Lexeme> {
        // opening quote
        self.advance();
        let start_line = self.line;
        let s = self.advance_while(|ch| ch != '"' && ch != '\n').to_string();

        if self.peek_char() != Some('"') {
            return Err(ParseError::InvalidInput {
                reason: format!("string starting on line {start_line} is not terminated"),
            }
            .into());
        }
        self.advance();

        Ok(Lexeme::Str(s))
    }

    fn skip_whitespace_comments(&mut self) {
        while let Some(ch) = self.peek_char() {
            match ch {
                '#' => {
                    self.advance_while(|ch| ch != '\n');
                }
                ch if ch.is_ascii_whitespace() => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn advance_while(&mut self, cond: fn(char) -> bool) -> &str {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if !cond(ch) {
                break;
            }
            self.advance();
        }

        &self.txt[start..self.pos]
    }

    fn advance(&mut self) {
        if let Some(ch) = self.txt[self.pos..].chars().next() {
            if ch == '\n' {
                self.line += 1;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.txt[self.pos..].chars().next()
    }
}

#[cfg(test)]
mod test_super {
    use super::{Lexeme, Lexer};

    fn ident(s: &str) -> Lexeme {
        Lexeme::Ident(s.to_string())
    }

    fn string(s: &str) -> Lexeme {
        Lexeme::Str(s.to_string())
    }

    fn num(s: &str) -> Lexeme {
        Lexeme::Num(s.to_string())
    }

    #[test]
    fn test_example_1() {
        let input = "LookAt 3 4 1.5  # eye
        .5 .5 0  # look at point
        0 0 1    # up vector
        Camera \"perspective\" \"float fov\" 45";

        let mut lexer = Lexer::new(input.to_string());

        assert_eq!(lexer.next().unwrap(), ident("LookAt"));
        assert_eq!(lexer.next().unwrap(), num("3"));
        assert_eq!(lexer.next().unwrap(), num("4"));
        assert_eq!(lexer.next().unwrap(), num("1.5"));

        assert_eq!(lexer.next().unwrap(), num(".5"));
        assert_eq!(lexer.next().unwrap(), num(".5"));
        assert_eq!(lexer.next().unwrap(), num("0"));

        assert_eq!(lexer.next().unwrap(), num("0"));
        assert_eq!(lexer.next().unwrap(), num("0"));
        assert_eq!(lexer.next().unwrap(), num("1"));

        assert_eq!(lexer.next().unwrap(), ident("Camera"));
        assert_eq!(lexer.next().unwrap(), string("perspective"));
        assert_eq!(lexer.next().unwrap(), string("float fov"));
        assert_eq!(lexer.next().unwrap(), num("45"));
        assert_eq!(lexer.next().unwrap(), Lexeme::Eof);
    }

    #[test]
    fn test_example_2() {
        let input = "Texture \"checks\" \"spectrum\" \"checkerboard\"
        \"float uscale\" [16] \"float vscale\" [16]
        \"rgb tex1\" [.1 .1 .1]";

        let mut lexer = Lexer::new(input.to_string());

        assert_eq!(lexer.next().unwrap(), ident("Texture"));
        assert_eq!(lexer.next().unwrap(), string("checks"));
        assert_eq!(lexer.next().unwrap(), string("spectrum"));
        assert_eq!(lexer.next().unwrap(), string("checkerboard"));

        assert_eq!(lexer.next().unwrap(), string("float uscale"));
        assert_eq!(lexer.next().unwrap(), Lexeme::OpenBracket);
        assert_eq!(lexer.next().unwrap(), num("16"));
        assert_eq!(lexer.next().unwrap(), Lexeme::CloseBracket);
        assert_eq!(lexer.next().unwrap(), string("float vscale"));
        assert_eq!(lexer.next().unwrap(), Lexeme::OpenBracket);
        assert_eq!(lexer.next().unwrap(), num("16"));
        assert_eq!(lexer.next().unwrap(), Lexeme::CloseBracket);

        assert_eq!(lexer.next().unwrap(), string("rgb tex1"));
        assert_eq!(lexer.next().unwrap(), Lexeme::OpenBracket);
        assert_eq!(lexer.next().unwrap(), num(".1"));
        assert_eq!(lexer.next().unwrap(), num(".1"));
        assert_eq!(lexer.next().unwrap(), num(".1"));
        assert_eq!(lexer.next().unwrap(), Lexeme::CloseBracket);
        assert_eq!(lexer.next().unwrap(), Lexeme::Eof);
    }

    #[test]
    fn test_comments() {
        let input = "#
        Camera
        # dsds dsdsdsd s ds sdd s Sampler
        #
        WorldBegin";

        let mut lexer = Lexer::new(input.to_string());

        assert_eq!(lexer.next().unwrap(), ident("Camera"));
        assert_eq!(lexer.next().unwrap(), ident("WorldBegin"));
        assert_eq!(lexer.next().unwrap(), Lexeme::Eof);
    }

    #[test]
    fn test_floats_exp() {
        let input = "4.37114e-8 1 1.91069e-15 -2";
        let mut lexer = Lexer::new(input.to_string());
        assert_eq!(lexer.next().unwrap(), num("4.37114e-8"));
        assert_eq!(lexer.next().unwrap(), num("1"));
        assert_eq!(lexer.next().unwrap(), num("1.91069e-15"));
        assert_eq!(lexer.next().unwrap(), num("-2"));
        assert_eq!(lexer.next().unwrap(), Lexeme::Eof);
    }

    #[test]
    fn test_peek_and_lines() {
        let mut lexer = Lexer::new("WorldBegin\n\nWorldEnd".to_string());
        assert_eq!(lexer.peek().unwrap(), &ident("WorldBegin"));
        assert_eq!(lexer.next().unwrap(), ident("WorldBegin"));
        assert_eq!(lexer.peek().unwrap(), &ident("WorldEnd"));
        assert_eq!(lexer.line(), 3);
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("Shape \"sphere".to_string());
        assert_eq!(lexer.next().unwrap(), ident("Shape"));
        assert!(lexer.next().is_err());
    }
}
