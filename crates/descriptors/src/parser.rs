use crate::{
    DescriptorError, FieldDescriptor, FieldType, MethodDescriptor, PrimitiveKind, Result, Token,
    TokenKind,
};

// FieldDescriptor   := '['* (Primitive | ClassType)
// ClassType         := 'L' Identifier ('<' FieldDescriptor+ '>')? ';'
// MethodDescriptor  := '(' FieldDescriptor* ')' ReturnType
// ReturnType        := 'V' | FieldDescriptor

/// Generic parameter lists nested deeper than this are rejected, which bounds
/// the recursion of the parser.
pub const MAX_GENERIC_DEPTH: usize = 255;

pub struct Parser<'a, I> {
    tokens: I,
    lookahead: Option<Token<'a>>,
    depth: usize,
}
impl<'a, I> Parser<'a, I>
where
    I: Iterator<Item = Result<Token<'a>>>,
{
    pub fn new(tokens: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            lookahead: None,
            depth: 0,
        }
    }

    pub fn parse_field_descriptor(mut self) -> Result<FieldDescriptor> {
        let descriptor = self.parse_field()?;
        self.expect_end()?;

        Ok(descriptor)
    }

    pub fn parse_method_descriptor(mut self) -> Result<MethodDescriptor> {
        match self.next_token()? {
            Some(Token {
                kind: TokenKind::ParametersOpen,
                ..
            }) => {}
            _ => return Err(DescriptorError::MissingParameters),
        }

        let mut parameters = Vec::new();
        loop {
            match self.peek()? {
                Some(Token {
                    kind: TokenKind::ParametersClose,
                    ..
                }) => {
                    self.next_token()?;
                    break;
                }
                Some(_) => parameters.push(self.parse_field()?),
                None => return Err(DescriptorError::UnexpectedEndOfInput),
            }
        }

        if self.peek()?.is_none() {
            return Err(DescriptorError::MissingReturnType);
        }
        let return_type = self.parse_return_type()?;
        self.expect_end()?;

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    fn parse_return_type(&mut self) -> Result<FieldDescriptor> {
        match self.peek()? {
            Some(Token {
                kind: TokenKind::Primitive(PrimitiveKind::Void),
                ..
            }) => {
                self.next_token()?;
                Ok(FieldDescriptor::primitive(PrimitiveKind::Void))
            }
            _ => self.parse_field(),
        }
    }

    fn parse_field(&mut self) -> Result<FieldDescriptor> {
        let mut array_rank = 0;
        while let Some(Token {
            kind: TokenKind::ArrayMarker,
            ..
        }) = self.peek()?
        {
            self.next_token()?;
            array_rank += 1;
        }

        let token = self.expect_token()?;
        let field_type = match token.kind {
            TokenKind::Primitive(PrimitiveKind::Void) => {
                return Err(DescriptorError::InvalidVoidUsage {
                    position: token.offset,
                })
            }
            TokenKind::Primitive(kind) => FieldType::Primitive(kind),
            TokenKind::ClassStart => self.parse_class_type()?,
            _ => return Err(unexpected(token)),
        };

        Ok(FieldDescriptor {
            array_rank,
            field_type,
        })
    }

    // The class start marker has already been consumed.
    fn parse_class_type(&mut self) -> Result<FieldType> {
        let token = self.expect_token()?;
        let TokenKind::Identifier(class_name) = token.kind else {
            return Err(unexpected(token));
        };

        let mut generic_parameters = Vec::new();
        if let Some(Token {
            kind: TokenKind::GenericOpen,
            offset,
        }) = self.peek()?.copied()
        {
            self.next_token()?;
            if self.depth == MAX_GENERIC_DEPTH {
                return Err(DescriptorError::GenericsTooDeep { position: offset });
            }
            self.depth += 1;
            loop {
                match self.peek()? {
                    Some(Token {
                        kind: TokenKind::GenericClose,
                        ..
                    }) => {
                        self.next_token()?;
                        break;
                    }
                    Some(_) => generic_parameters.push(self.parse_field()?),
                    None => return Err(DescriptorError::UnexpectedEndOfInput),
                }
            }
            self.depth -= 1;

            if generic_parameters.is_empty() {
                return Err(DescriptorError::EmptyGenericParameters { position: offset });
            }
        }

        let token = self.expect_token()?;
        if token.kind != TokenKind::Terminator {
            return Err(unexpected(token));
        }

        Ok(FieldType::NonPrimitive {
            class_name: class_name.to_owned(),
            generic_parameters,
        })
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.next_token()? {
            Some(token) => Err(DescriptorError::TrailingTokens {
                position: token.offset,
            }),
            None => Ok(()),
        }
    }

    fn expect_token(&mut self) -> Result<Token<'a>> {
        self.next_token()?
            .ok_or(DescriptorError::UnexpectedEndOfInput)
    }

    fn peek(&mut self) -> Result<Option<&Token<'a>>> {
        if self.lookahead.is_none() {
            self.lookahead = self.tokens.next().transpose()?;
        }

        Ok(self.lookahead.as_ref())
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>> {
        match self.lookahead.take() {
            Some(token) => Ok(Some(token)),
            None => self.tokens.next().transpose(),
        }
    }
}

fn unexpected(token: Token<'_>) -> DescriptorError {
    DescriptorError::UnexpectedToken {
        position: token.offset,
        found: token.kind.to_string(),
    }
}

#[cfg(test)]
mod parse_field_descriptor_tests {
    use super::*;

    #[test]
    fn it_should_parse_a_primitive() {
        assert_eq!(
            FieldDescriptor::primitive(PrimitiveKind::Short),
            FieldDescriptor::parse("S").unwrap()
        );
    }

    #[test]
    fn it_should_count_array_markers() {
        let descriptor = FieldDescriptor::parse("[[[[Ljava/lang/Object;").unwrap();

        assert_eq!(4, descriptor.array_rank);
        assert_eq!(Some("java/lang/Object"), descriptor.class_name());
    }

    #[test]
    fn it_should_reject_void() {
        assert_eq!(
            Err(DescriptorError::InvalidVoidUsage { position: 0 }),
            FieldDescriptor::parse("V")
        );
    }

    #[test]
    fn it_should_reject_void_arrays() {
        assert_eq!(
            Err(DescriptorError::InvalidVoidUsage { position: 2 }),
            FieldDescriptor::parse("[[V")
        );
    }

    #[test]
    fn it_should_reject_void_generic_parameters() {
        assert_eq!(
            Err(DescriptorError::InvalidVoidUsage { position: 16 }),
            FieldDescriptor::parse("Ljava/util/List<V>;")
        );
    }

    #[test]
    fn it_should_fail_on_an_unterminated_class_name() {
        assert_eq!(
            Err(DescriptorError::UnexpectedEndOfInput),
            FieldDescriptor::parse("Ljava/lang/Object")
        );
    }

    #[test]
    fn it_should_fail_on_an_unterminated_generic_list() {
        assert_eq!(
            Err(DescriptorError::UnexpectedEndOfInput),
            FieldDescriptor::parse("Ljava/util/List<Ljava/lang/String;")
        );
    }

    #[test]
    fn it_should_fail_on_an_empty_generic_list() {
        assert_eq!(
            Err(DescriptorError::EmptyGenericParameters { position: 15 }),
            FieldDescriptor::parse("Ljava/util/List<>;")
        );
    }

    fn nested_generics(depth: usize) -> String {
        format!("{}I{}", "La<".repeat(depth), ">;".repeat(depth))
    }

    #[test]
    fn it_should_parse_generics_nested_up_to_the_limit() {
        let mut descriptor = FieldDescriptor::parse(&nested_generics(MAX_GENERIC_DEPTH)).unwrap();

        let mut depth = 0;
        while let [parameter] = descriptor.generic_parameters() {
            descriptor = parameter.clone();
            depth += 1;
        }
        assert_eq!(MAX_GENERIC_DEPTH, depth);
        assert_eq!(Some(PrimitiveKind::Int), descriptor.primitive_kind());
    }

    #[test]
    fn it_should_reject_generics_nested_past_the_limit() {
        assert_eq!(
            Err(DescriptorError::GenericsTooDeep {
                position: 3 * MAX_GENERIC_DEPTH + 2
            }),
            FieldDescriptor::parse(&nested_generics(4000))
        );
    }

    #[test]
    fn it_should_fail_on_a_missing_class_name() {
        assert!(matches!(
            FieldDescriptor::parse("L;"),
            Err(DescriptorError::UnexpectedToken { position: 1, .. })
        ));
    }

    #[test]
    fn it_should_fail_on_trailing_tokens() {
        assert_eq!(
            Err(DescriptorError::TrailingTokens { position: 1 }),
            FieldDescriptor::parse("II")
        );
    }

    #[test]
    fn it_should_fail_on_empty_input() {
        assert_eq!(
            Err(DescriptorError::UnexpectedEndOfInput),
            FieldDescriptor::parse("")
        );
    }

    #[test]
    fn it_should_surface_lex_errors() {
        assert_eq!(
            Err(DescriptorError::Lex {
                position: 1,
                character: 'Q'
            }),
            FieldDescriptor::parse("[Q")
        );
    }
}
