use std::{
    any::Any,
    cmp::Ordering,
    collections::HashMap,
    fmt,
    io::{self, Read, Seek},
};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{ClassFileError, ConstantPool, Result};

type Endian = BigEndian;

/// Decodes the payload of one attribute kind. The reader is positioned right
/// after the attribute's length; the second argument is the attribute's
/// `attribute_name_index`.
pub type AttributeDecoder = fn(&mut AttributeReader<'_>, u16) -> Result<Attribute>;

/// Attributes decoded by a decoder registered from outside this crate.
pub trait CustomAttribute: fmt::Debug + Send + Sync {
    fn name_index(&self) -> u16;

    fn as_any(&self) -> &dyn Any;

    /// Writes the payload, without the name index and length.
    fn write_info(&self, info: &mut Vec<u8>) -> io::Result<()>;
}

#[derive(Debug)]
pub enum Attribute {
    ConstantValue(ConstantValueAttribute),
    Code(CodeAttribute),
    Exceptions(ExceptionsAttribute),
    SourceFile(SourceFileAttribute),
    Signature(SignatureAttribute),
    LineNumberTable(LineNumberTableAttribute),
    BootstrapMethods(BootstrapMethodsAttribute),
    Synthetic { name_index: u16 },
    Deprecated { name_index: u16 },
    Unknown(UnknownAttribute),
    Custom(Box<dyn CustomAttribute>),
}
impl Attribute {
    pub fn name_index(&self) -> u16 {
        match self {
            Attribute::ConstantValue(a) => a.name_index,
            Attribute::Code(a) => a.name_index,
            Attribute::Exceptions(a) => a.name_index,
            Attribute::SourceFile(a) => a.name_index,
            Attribute::Signature(a) => a.name_index,
            Attribute::LineNumberTable(a) => a.name_index,
            Attribute::BootstrapMethods(a) => a.name_index,
            Attribute::Synthetic { name_index } | Attribute::Deprecated { name_index } => {
                *name_index
            }
            Attribute::Unknown(a) => a.name_index,
            Attribute::Custom(a) => a.name_index(),
        }
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.utf8(self.name_index())
    }
}

#[derive(Debug, Default)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0
            .iter()
            .find(|a| a.name(constant_pool).map_or(false, |n| n == name))
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn signature(&self) -> Option<&SignatureAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::Signature(signature) => Some(signature),
            _ => None,
        })
    }

    pub fn source_file(&self) -> Option<&SourceFileAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::SourceFile(source_file) => Some(source_file),
            _ => None,
        })
    }

    pub fn bootstrap_methods(&self) -> Option<&BootstrapMethodsAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::BootstrapMethods(bootstrap_methods) => Some(bootstrap_methods),
            _ => None,
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ConstantValueAttribute {
    pub name_index: u16,
    pub constant_value_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Debug)]
pub struct CodeAttribute {
    pub name_index: u16,
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ExceptionsAttribute {
    pub name_index: u16,
    pub exception_index_table: Vec<u16>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SourceFileAttribute {
    pub name_index: u16,
    pub source_file_index: u16,
}

/// Points at a `Utf8` constant holding a generic signature.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SignatureAttribute {
    pub name_index: u16,
    pub signature_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LineNumberTableEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LineNumberTableAttribute {
    pub name_index: u16,
    pub line_number_table: Vec<LineNumberTableEntry>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BootstrapMethod {
    pub bootstrap_method_ref: u16,
    pub bootstrap_arguments: Vec<u16>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BootstrapMethodsAttribute {
    pub name_index: u16,
    pub bootstrap_methods: Vec<BootstrapMethod>,
}

/// An attribute nobody registered a decoder for, kept verbatim.
#[derive(PartialEq, Eq, Clone)]
pub struct UnknownAttribute {
    pub name_index: u16,
    pub info: Vec<u8>,
}
impl fmt::Debug for UnknownAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnknownAttribute")
            .field("name_index", &self.name_index)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}

/// Maps attribute names to their decoders.
#[derive(Clone)]
pub struct AttributeRegistry {
    decoders: HashMap<String, AttributeDecoder>,
}
impl AttributeRegistry {
    /// A registry without any decoders; every attribute is kept verbatim.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers `decoder` for `name`, returning the decoder it replaces.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        decoder: AttributeDecoder,
    ) -> Option<AttributeDecoder> {
        self.decoders.insert(name.into(), decoder)
    }

    pub fn get(&self, name: &str) -> Option<AttributeDecoder> {
        self.decoders.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }
}
impl Default for AttributeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("ConstantValue", decode_constant_value);
        registry.register("Code", decode_code);
        registry.register("Exceptions", decode_exceptions);
        registry.register("SourceFile", decode_source_file);
        registry.register("Signature", decode_signature);
        registry.register("LineNumberTable", decode_line_number_table);
        registry.register("BootstrapMethods", decode_bootstrap_methods);
        registry.register("Synthetic", decode_synthetic);
        registry.register("Deprecated", decode_deprecated);
        registry
    }
}
impl fmt::Debug for AttributeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.decoders.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("AttributeRegistry")
            .field("decoders", &names)
            .finish()
    }
}

pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// A cursor over attribute data handed to every decoder, together with the
/// constant pool used to resolve attribute names.
pub struct AttributeReader<'a> {
    r: &'a mut dyn ReadSeek,
    constant_pool: &'a ConstantPool,
    registry: &'a AttributeRegistry,
}
impl<'a> AttributeReader<'a> {
    pub fn new(
        r: &'a mut dyn ReadSeek,
        constant_pool: &'a ConstantPool,
        registry: &'a AttributeRegistry,
    ) -> Self {
        Self {
            r,
            constant_pool,
            registry,
        }
    }

    pub fn constant_pool(&self) -> &'a ConstantPool {
        self.constant_pool
    }

    /// Reads an `attributes_count` followed by that many attributes.
    pub fn read_attributes(&mut self) -> Result<Attributes> {
        let attributes_count = self.read_u16()?;
        (0..attributes_count)
            .map(|_| self.read_attribute())
            .collect::<Result<Vec<_>>>()
            .map(Attributes)
    }

    pub fn read_attribute(&mut self) -> Result<Attribute> {
        let name_index = self.read_u16()?;
        let length = self.read_u32()?;
        let constant_pool = self.constant_pool;
        let name = constant_pool.utf8(name_index)?;

        self.decode(name, name_index, length)
    }

    /// Decodes a payload of `length` bytes. When the decoder for `name` reads
    /// less than that the rest is skipped; reading more is an error since the
    /// stream no longer lines up with the next record.
    pub fn decode(&mut self, name: &str, name_index: u16, length: u32) -> Result<Attribute> {
        let Some(decoder) = self.registry.get(name) else {
            log::debug!("Keeping unknown attribute {} ({} bytes)", name, length);
            let info = self.read_bytes(length as usize)?;
            return Ok(Attribute::Unknown(UnknownAttribute { name_index, info }));
        };

        let start = self.position()?;
        let attribute = decoder(self, name_index)?;
        let consumed = self.position()? - start;
        log::trace!("Decoded attribute {} ({} bytes)", name, consumed);

        match consumed.cmp(&u64::from(length)) {
            Ordering::Equal => Ok(attribute),
            Ordering::Less => {
                let padding = u64::from(length) - consumed;
                log::debug!("Skipping {} trailing bytes of attribute {}", padding, name);
                // The padding has to be present in the stream, not merely seekable.
                let skipped = io::copy(&mut (&mut *self.r).take(padding), &mut io::sink())?;
                if skipped < padding {
                    return Err(ClassFileError::UnexpectedEndOfInput);
                }
                Ok(attribute)
            }
            Ordering::Greater => Err(ClassFileError::AttributeLengthMismatch {
                name: name.to_owned(),
                declared: length,
                consumed,
            }),
        }
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.r.stream_position()?)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; length];
        self.r.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    pub fn read_u16_table(&mut self) -> Result<Vec<u16>> {
        let length = self.read_u16()?;
        let mut table = vec![0u16; length as usize];
        self.r.read_u16_into::<Endian>(&mut table)?;
        Ok(table)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }
}

fn decode_constant_value(r: &mut AttributeReader<'_>, name_index: u16) -> Result<Attribute> {
    let constant_value_index = r.read_u16()?;

    Ok(Attribute::ConstantValue(ConstantValueAttribute {
        name_index,
        constant_value_index,
    }))
}

fn decode_code(r: &mut AttributeReader<'_>, name_index: u16) -> Result<Attribute> {
    let max_stack = r.read_u16()?;
    let max_locals = r.read_u16()?;
    let code_length = r.read_u32()?;
    let code = r.read_bytes(code_length as usize)?;
    let exception_table_length = r.read_u16()?;
    let exception_table = (0..exception_table_length)
        .map(|_| decode_exception_table_entry(r))
        .collect::<Result<Vec<_>>>()?;
    let attributes = r.read_attributes()?;

    Ok(Attribute::Code(CodeAttribute {
        name_index,
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes,
    }))
}

fn decode_exception_table_entry(r: &mut AttributeReader<'_>) -> Result<ExceptionTableEntry> {
    let start_pc = r.read_u16()?;
    let end_pc = r.read_u16()?;
    let handler_pc = r.read_u16()?;
    let catch_type = r.read_u16()?;

    Ok(ExceptionTableEntry {
        start_pc,
        end_pc,
        handler_pc,
        catch_type,
    })
}

fn decode_exceptions(r: &mut AttributeReader<'_>, name_index: u16) -> Result<Attribute> {
    let exception_index_table = r.read_u16_table()?;

    Ok(Attribute::Exceptions(ExceptionsAttribute {
        name_index,
        exception_index_table,
    }))
}

fn decode_source_file(r: &mut AttributeReader<'_>, name_index: u16) -> Result<Attribute> {
    let source_file_index = r.read_u16()?;

    Ok(Attribute::SourceFile(SourceFileAttribute {
        name_index,
        source_file_index,
    }))
}

fn decode_signature(r: &mut AttributeReader<'_>, name_index: u16) -> Result<Attribute> {
    let signature_index = r.read_u16()?;

    Ok(Attribute::Signature(SignatureAttribute {
        name_index,
        signature_index,
    }))
}

fn decode_line_number_table(r: &mut AttributeReader<'_>, name_index: u16) -> Result<Attribute> {
    let length = r.read_u16()?;
    let line_number_table = (0..length)
        .map(|_| -> Result<LineNumberTableEntry> {
            Ok(LineNumberTableEntry {
                start_pc: r.read_u16()?,
                line_number: r.read_u16()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Attribute::LineNumberTable(LineNumberTableAttribute {
        name_index,
        line_number_table,
    }))
}

fn decode_bootstrap_methods(r: &mut AttributeReader<'_>, name_index: u16) -> Result<Attribute> {
    let num_bootstrap_methods = r.read_u16()?;
    let bootstrap_methods = (0..num_bootstrap_methods)
        .map(|_| -> Result<BootstrapMethod> {
            let bootstrap_method_ref = r.read_u16()?;
            let bootstrap_arguments = r.read_u16_table()?;
            Ok(BootstrapMethod {
                bootstrap_method_ref,
                bootstrap_arguments,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Attribute::BootstrapMethods(BootstrapMethodsAttribute {
        name_index,
        bootstrap_methods,
    }))
}

fn decode_synthetic(_: &mut AttributeReader<'_>, name_index: u16) -> Result<Attribute> {
    Ok(Attribute::Synthetic { name_index })
}

fn decode_deprecated(_: &mut AttributeReader<'_>, name_index: u16) -> Result<Attribute> {
    Ok(Attribute::Deprecated { name_index })
}
