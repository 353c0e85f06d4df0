use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Unexpected character {character:?} at offset {position}")]
    Lex { position: usize, character: char },
    #[error("Expected a parameter list")]
    MissingParameters,
    #[error("Expected a return type after the parameter list")]
    MissingReturnType,
    #[error("Void is only allowed as a return type (offset {position})")]
    InvalidVoidUsage { position: usize },
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("Unexpected trailing input at offset {position}")]
    TrailingTokens { position: usize },
    #[error("Unexpected {found} at offset {position}")]
    UnexpectedToken { position: usize, found: String },
    #[error("Empty generic parameter list at offset {position}")]
    EmptyGenericParameters { position: usize },
    #[error("Generic parameters nested too deeply at offset {position}")]
    GenericsTooDeep { position: usize },
}
