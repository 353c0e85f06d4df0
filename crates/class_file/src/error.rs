use std::io;

use bali_descriptors::DescriptorError;
use thiserror::Error;

use crate::constant_pool;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(io::Error),
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("Unsupported constant kind: {0}")]
    UnsupportedConstantKind(u8),
    #[error("Attribute {name} declared {declared} bytes but its decoder consumed {consumed}")]
    AttributeLengthMismatch {
        name: String,
        declared: u32,
        consumed: u64,
    },
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::Constant),
    #[error("Invalid modified UTF-8 string")]
    InvalidModifiedUtf8,
    #[error("Constant pool count {0} splits a two-slot constant")]
    InvalidConstantPoolCount(u16),
    #[error("Constant pool is full")]
    ConstantPoolOverflow,
    #[error("Length {0} does not fit in its field")]
    LengthOverflow(usize),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

impl From<io::Error> for ClassFileError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => ClassFileError::UnexpectedEndOfInput,
            _ => ClassFileError::IOError(error),
        }
    }
}
