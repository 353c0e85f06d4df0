use std::{convert::TryFrom, io::Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    attributes::{Attribute, Attributes, CodeAttribute},
    class_file::{FieldInfo, MethodInfo},
    constant_pool::{Constant, DynamicInfo, RefInfo},
    AccessFlags, ClassFile, ClassFileError, ConstantPool, Result,
};

type Endian = BigEndian;

/// Encodes class file structures; the inverse of [`crate::Parser`].
pub struct Writer<W> {
    w: W,
}
impl<W: Write> Writer<W> {
    pub fn new(w: W) -> Self {
        Self { w }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    pub fn write_class_file(&mut self, class_file: &ClassFile) -> Result<()> {
        self.write_u32(0xCAFEBABE)?;
        let (major, minor) = class_file.version;
        self.write_u16(minor)?;
        self.write_u16(major)?;

        self.write_constant_pool(&class_file.constant_pool)?;
        self.write_u16(class_file.access_flags.bits())?;
        self.write_u16(class_file.this_class)?;
        self.write_u16(class_file.super_class)?;

        self.write_length(class_file.interfaces.len())?;
        for interface in &class_file.interfaces {
            self.write_u16(*interface)?;
        }

        self.write_length(class_file.fields.len())?;
        for field in &class_file.fields {
            self.write_field_info(field)?;
        }

        self.write_length(class_file.methods.len())?;
        for method in &class_file.methods {
            self.write_method_info(method)?;
        }

        self.write_attributes(&class_file.attributes)
    }

    pub fn write_field_info(&mut self, field: &FieldInfo) -> Result<()> {
        self.write_member(
            field.access_flags,
            field.name_index,
            field.descriptor_index,
            &field.attributes,
        )
    }

    pub fn write_method_info(&mut self, method: &MethodInfo) -> Result<()> {
        self.write_member(
            method.access_flags,
            method.name_index,
            method.descriptor_index,
            &method.attributes,
        )
    }

    fn write_member(
        &mut self,
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
        attributes: &Attributes,
    ) -> Result<()> {
        self.write_u16(access_flags.bits())?;
        self.write_u16(name_index)?;
        self.write_u16(descriptor_index)?;
        self.write_attributes(attributes)
    }

    /// Writes `constant_pool_count` followed by every constant. Placeholder
    /// slots are implied by the preceding `Long` or `Double` and not written.
    pub fn write_constant_pool(&mut self, constant_pool: &ConstantPool) -> Result<()> {
        self.write_length(constant_pool.len() + 1)?;
        constant_pool
            .iter()
            .filter(|c| **c != Constant::Unusable)
            .try_for_each(|c| self.write_constant(c))
    }

    pub fn write_constant(&mut self, constant: &Constant) -> Result<()> {
        if *constant == Constant::Unusable {
            return Ok(());
        }
        self.write_u8(constant.kind().tag())?;

        match constant {
            Constant::Utf8(s) => {
                let bytes = cesu8::to_java_cesu8(s);
                self.write_length(bytes.len())?;
                self.w.write_all(&bytes)?;
            }
            Constant::Integer(i) => self.w.write_i32::<Endian>(*i)?,
            Constant::Float(f) => self.w.write_f32::<Endian>(*f)?,
            Constant::Long(l) => self.w.write_i64::<Endian>(*l)?,
            Constant::Double(d) => self.w.write_f64::<Endian>(*d)?,
            Constant::Class(c) => self.write_u16(c.name_index)?,
            Constant::String(s) => self.write_u16(s.string_index)?,
            Constant::FieldRef(r) | Constant::MethodRef(r) | Constant::InterfaceMethodRef(r) => {
                self.write_ref_info(r)?
            }
            Constant::NameAndType(n) => {
                self.write_u16(n.name_index)?;
                self.write_u16(n.descriptor_index)?;
            }
            Constant::MethodHandle(m) => {
                self.write_u8(m.reference_kind)?;
                self.write_u16(m.reference_index)?;
            }
            Constant::MethodType(m) => self.write_u16(m.descriptor_index)?,
            Constant::Dynamic(d) | Constant::InvokeDynamic(d) => self.write_dynamic_info(d)?,
            Constant::Module(m) => self.write_u16(m.name_index)?,
            Constant::Package(p) => self.write_u16(p.name_index)?,
            Constant::Unusable => {}
        }

        Ok(())
    }

    fn write_ref_info(&mut self, ref_info: &RefInfo) -> Result<()> {
        self.write_u16(ref_info.class_index)?;
        self.write_u16(ref_info.name_and_type_index)
    }

    fn write_dynamic_info(&mut self, dynamic_info: &DynamicInfo) -> Result<()> {
        self.write_u16(dynamic_info.bootstrap_method_attr_index)?;
        self.write_u16(dynamic_info.name_and_type_index)
    }

    pub fn write_attributes(&mut self, attributes: &Attributes) -> Result<()> {
        self.write_length(attributes.len())?;
        attributes.iter().try_for_each(|a| self.write_attribute(a))
    }

    /// Writes the name index, the length and the payload of `attribute`.
    pub fn write_attribute(&mut self, attribute: &Attribute) -> Result<()> {
        let mut info = Writer::new(Vec::<u8>::new());
        info.write_attribute_info(attribute)?;
        let info = info.into_inner();

        let length =
            u32::try_from(info.len()).map_err(|_| ClassFileError::LengthOverflow(info.len()))?;
        self.write_u16(attribute.name_index())?;
        self.write_u32(length)?;
        self.w.write_all(&info)?;
        Ok(())
    }

    fn write_attribute_info(&mut self, attribute: &Attribute) -> Result<()> {
        match attribute {
            Attribute::ConstantValue(a) => self.write_u16(a.constant_value_index),
            Attribute::Code(a) => self.write_code(a),
            Attribute::Exceptions(a) => self.write_u16_table(&a.exception_index_table),
            Attribute::SourceFile(a) => self.write_u16(a.source_file_index),
            Attribute::Signature(a) => self.write_u16(a.signature_index),
            Attribute::LineNumberTable(a) => {
                self.write_length(a.line_number_table.len())?;
                a.line_number_table.iter().try_for_each(|entry| {
                    self.write_u16(entry.start_pc)?;
                    self.write_u16(entry.line_number)
                })
            }
            Attribute::BootstrapMethods(a) => {
                self.write_length(a.bootstrap_methods.len())?;
                a.bootstrap_methods.iter().try_for_each(|method| {
                    self.write_u16(method.bootstrap_method_ref)?;
                    self.write_u16_table(&method.bootstrap_arguments)
                })
            }
            Attribute::Synthetic { .. } | Attribute::Deprecated { .. } => Ok(()),
            Attribute::Unknown(a) => Ok(self.w.write_all(&a.info)?),
            Attribute::Custom(a) => {
                let mut info = Vec::new();
                a.write_info(&mut info)?;
                Ok(self.w.write_all(&info)?)
            }
        }
    }

    fn write_code(&mut self, code: &CodeAttribute) -> Result<()> {
        self.write_u16(code.max_stack)?;
        self.write_u16(code.max_locals)?;
        let code_length = u32::try_from(code.code.len())
            .map_err(|_| ClassFileError::LengthOverflow(code.code.len()))?;
        self.write_u32(code_length)?;
        self.w.write_all(&code.code)?;

        self.write_length(code.exception_table.len())?;
        for entry in &code.exception_table {
            self.write_u16(entry.start_pc)?;
            self.write_u16(entry.end_pc)?;
            self.write_u16(entry.handler_pc)?;
            self.write_u16(entry.catch_type)?;
        }

        self.write_attributes(&code.attributes)
    }

    fn write_u16_table(&mut self, table: &[u16]) -> Result<()> {
        self.write_length(table.len())?;
        table.iter().try_for_each(|v| self.write_u16(*v))
    }

    // Table lengths and string lengths are stored as u16.
    fn write_length(&mut self, length: usize) -> Result<()> {
        let length = u16::try_from(length).map_err(|_| ClassFileError::LengthOverflow(length))?;
        self.write_u16(length)
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.w.write_u32::<Endian>(value)?)
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.w.write_u16::<Endian>(value)?)
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.w.write_u8(value)?)
    }
}
