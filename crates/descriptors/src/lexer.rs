use std::{
    fmt,
    iter::{FusedIterator, Peekable},
    str::CharIndices,
};

use crate::{DescriptorError, PrimitiveKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    ArrayMarker,
    Primitive(PrimitiveKind),
    ClassStart,
    Terminator,
    GenericOpen,
    GenericClose,
    ParametersOpen,
    ParametersClose,
    Identifier(&'a str),
}
impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::ArrayMarker => f.write_str("'['"),
            TokenKind::Primitive(kind) => write!(f, "'{}'", kind.as_char()),
            TokenKind::ClassStart => f.write_str("'L'"),
            TokenKind::Terminator => f.write_str("';'"),
            TokenKind::GenericOpen => f.write_str("'<'"),
            TokenKind::GenericClose => f.write_str("'>'"),
            TokenKind::ParametersOpen => f.write_str("'('"),
            TokenKind::ParametersClose => f.write_str("')'"),
            TokenKind::Identifier(name) => write!(f, "identifier {:?}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// Byte offset of the token in the descriptor string.
    pub offset: usize,
}

/// Splits a descriptor string into tokens.
///
/// The only context the lexer keeps is whether the previous token was a
/// class start: the characters that follow it up to `;`, `<` or `>` form a
/// single identifier, so `Ljava/lang/Integer;` does not lex `I` as a
/// primitive. The lexer stops for good after the first error.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    in_class_name: bool,
    failed: bool,
}
impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            in_class_name: false,
            failed: false,
        }
    }

    fn lex_identifier(&mut self, start: usize) -> Token<'a> {
        let mut end = self.input.len();
        while let Some(&(offset, c)) = self.chars.peek() {
            if is_identifier_end(c) {
                end = offset;
                break;
            }
            self.chars.next();
        }

        Token {
            kind: TokenKind::Identifier(&self.input[start..end]),
            offset: start,
        }
    }
}
impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let &(offset, c) = self.chars.peek()?;

        if std::mem::take(&mut self.in_class_name) && !is_identifier_end(c) {
            return Some(Ok(self.lex_identifier(offset)));
        }
        self.chars.next();

        let kind = match c {
            '[' => TokenKind::ArrayMarker,
            'L' => {
                self.in_class_name = true;
                TokenKind::ClassStart
            }
            ';' => TokenKind::Terminator,
            '<' => TokenKind::GenericOpen,
            '>' => TokenKind::GenericClose,
            '(' => TokenKind::ParametersOpen,
            ')' => TokenKind::ParametersClose,
            c => match PrimitiveKind::from_char(c) {
                Some(kind) => TokenKind::Primitive(kind),
                None => {
                    self.failed = true;
                    return Some(Err(DescriptorError::Lex {
                        position: offset,
                        character: c,
                    }));
                }
            },
        };

        Some(Ok(Token { kind, offset }))
    }
}
impl FusedIterator for Lexer<'_> {}

fn is_identifier_end(c: char) -> bool {
    matches!(c, ';' | '<' | '>')
}
