//! A lexical re-walk of a source file.
//!
//! The session needs every character of the original text in order, with
//! its position, and needs to know where tokens begin. This tokenizer only
//! splits the text; it does not parse.

use crate::errors::InlineError;
use crate::session::Session;
use vcov_source::SourcePos;

/// Token categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Spaces and tabs.
    Whitespace,
    /// One line break.
    Newline,
    /// `// ...` or `/* ... */`.
    Comment,
    /// A string literal.
    Str,
    /// A simple identifier or keyword.
    Ident,
    /// `\escaped` identifier, without its terminating whitespace.
    Escaped,
    /// `$name`.
    System,
    /// `` `name ``.
    Directive,
    /// A number, including based literals such as `4'b10x1`.
    Number,
    /// Operators and punctuation.
    Operator,
}

/// One token of the original text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'s> {
    /// Category.
    pub kind: TokenKind,
    /// Text, borrowed from the source.
    pub text: &'s str,
    /// Position of the first character.
    pub pos: SourcePos,
}

impl Token<'_> {
    /// Returns `true` for whitespace, newlines and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment)
    }

    /// Returns `true` if the token's text covers `pos`. Only single-line
    /// tokens cover anything.
    pub fn covers(&self, pos: SourcePos) -> bool {
        if self.text.contains('\n') || pos.line != self.pos.line {
            return false;
        }
        let len = self.text.chars().count() as u32;
        self.pos.col <= pos.col && pos.col < self.pos.col + len
    }
}

const OPERATORS: [&str; 20] = [
    "<<<", ">>>", "===", "!==", "~&", "~|", "~^", "^~", "<<", ">>", "==", "!=", "<=", ">=", "&&", "||", "**",
    "->", "+:", "-:",
];

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Splits `source` into tokens covering every character.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let byte_at = |i: usize| chars.get(i).map_or(source.len(), |(b, _)| *b);
    let ch = |i: usize| chars.get(i).map(|(_, c)| *c);
    let mut tokens = Vec::new();
    let (mut line, mut col) = (1u32, 1u32);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i].1;
        let start = i;
        let kind = if c == '\n' {
            i += 1;
            TokenKind::Newline
        } else if c == ' ' || c == '\t' || c == '\r' {
            while matches!(ch(i), Some(' ' | '\t' | '\r')) {
                i += 1;
            }
            TokenKind::Whitespace
        } else if c == '/' && ch(i + 1) == Some('/') {
            while ch(i).is_some_and(|c| c != '\n') {
                i += 1;
            }
            TokenKind::Comment
        } else if c == '/' && ch(i + 1) == Some('*') {
            i += 2;
            while i < chars.len() && !(ch(i) == Some('*') && ch(i + 1) == Some('/')) {
                i += 1;
            }
            i = (i + 2).min(chars.len());
            TokenKind::Comment
        } else if c == '"' {
            i += 1;
            while let Some(c) = ch(i) {
                i += 1;
                match c {
                    '\\' => i += 1,
                    '"' | '\n' => break,
                    _ => {}
                }
            }
            i = i.min(chars.len());
            TokenKind::Str
        } else if c == '\\' {
            i += 1;
            while ch(i).is_some_and(|c| !c.is_whitespace()) {
                i += 1;
            }
            TokenKind::Escaped
        } else if c == '$' && ch(i + 1).is_some_and(is_ident_char) {
            i += 1;
            while ch(i).is_some_and(is_ident_char) {
                i += 1;
            }
            TokenKind::System
        } else if c == '`' && ch(i + 1).is_some_and(is_ident_start) {
            i += 1;
            while ch(i).is_some_and(is_ident_char) {
                i += 1;
            }
            TokenKind::Directive
        } else if is_ident_start(c) {
            while ch(i).is_some_and(is_ident_char) {
                i += 1;
            }
            TokenKind::Ident
        } else if c.is_ascii_digit() || (c == '\'' && ch(i + 1).is_some_and(|b| "sSbBoOdDhH".contains(b))) {
            while ch(i).is_some_and(|c| c.is_ascii_digit() || c == '_' || c == '.') {
                i += 1;
            }
            if ch(i) == Some('\'') {
                i += 1;
                if matches!(ch(i), Some('s' | 'S')) {
                    i += 1;
                }
                if ch(i).is_some_and(|c| "bBoOdDhH".contains(c)) {
                    i += 1;
                }
                while ch(i).is_some_and(|c| c.is_ascii_hexdigit() || "xXzZ?_".contains(c)) {
                    i += 1;
                }
            }
            TokenKind::Number
        } else {
            let rest = &source[byte_at(i)..];
            let len = OPERATORS
                .iter()
                .find(|op| rest.starts_with(*op))
                .map_or(1, |op| op.chars().count());
            i += len;
            TokenKind::Operator
        };

        let text = &source[byte_at(start)..byte_at(i)];
        tokens.push(Token {
            kind,
            text,
            pos: SourcePos::new(line, col),
        });
        for c in text.chars() {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
    }
    tokens
}

/// Feeds every token of `source` through `session`.
pub fn replay(source: &str, session: &mut Session<'_>) -> Result<(), InlineError> {
    for token in tokenize(source) {
        session.token(&token)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<&str> {
        tokenize(src)
            .into_iter()
            .filter(|t| !t.is_trivia())
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn splits_operators_and_numbers() {
        assert_eq!(
            texts("x <= {4'b10x1, a[3 +: 2]} >>> 1;"),
            vec!["x", "<=", "{", "4'b10x1", ",", "a", "[", "3", "+:", "2", "]", "}", ">>>", "1", ";"]
        );
    }

    #[test]
    fn identifiers_of_every_flavor() {
        assert_eq!(
            texts("\\covered$L1  = $time + `WIDTH; -> ev;"),
            vec!["\\covered$L1", "=", "$time", "+", "`WIDTH", ";", "->", "ev", ";"]
        );
    }

    #[test]
    fn tokens_cover_the_whole_text() {
        let src = "module m; /* a\n b */ wire w; // c\n\"s;\" endmodule\n";
        let joined: String = tokenize(src).iter().map(|t| t.text).collect();
        assert_eq!(joined, src);
    }

    #[test]
    fn positions_follow_lines() {
        let tokens = tokenize("a\n  bc d");
        let bc = tokens.iter().find(|t| t.text == "bc").unwrap();
        assert_eq!(bc.pos, SourcePos::new(2, 3));
        assert!(bc.covers(SourcePos::new(2, 4)));
        assert!(!bc.covers(SourcePos::new(2, 5)));
    }
}
