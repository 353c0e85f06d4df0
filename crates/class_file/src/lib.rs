// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

#[macro_use]
pub mod constant_pool;
mod access_flags;
pub mod attributes;
mod class_file;
mod error;
mod parser;
mod writer;

pub use self::class_file::{ClassFile, FieldInfo, MethodInfo};
pub use access_flags::AccessFlags;
pub use attributes::{Attribute, AttributeRegistry, Attributes};
pub use constant_pool::{Constant, ConstantPool};
pub use error::ClassFileError;
pub use parser::Parser;
pub use writer::Writer;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;
