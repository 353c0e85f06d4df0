// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.3

mod descriptor;
mod error;
pub mod lexer;
pub mod parser;

pub use descriptor::{FieldDescriptor, FieldType, MethodDescriptor, PrimitiveKind};
pub use error::DescriptorError;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

pub type Result<T, E = DescriptorError> = std::result::Result<T, E>;
