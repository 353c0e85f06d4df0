use std::io::{Read, Seek, Write};

use bali_descriptors::{FieldDescriptor, MethodDescriptor};

use crate::{
    attributes::{Attribute, Attributes},
    constant_pool::ClassInfo,
    parser::Parser,
    writer::Writer,
    AccessFlags, ConstantPool, Result,
};

#[derive(Debug)]
pub struct ClassFile {
    /// (major, minor)
    pub version: (u16, u16),
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Attributes,
}
impl ClassFile {
    pub fn parse(bytes: impl Read + Seek) -> Result<ClassFile> {
        Parser::new(bytes).parse()
    }

    pub fn write(&self, w: impl Write) -> Result<()> {
        Writer::new(w).write_class_file(self)
    }

    pub fn super_class(&self) -> Result<Option<&str>> {
        // If the value of the super_class item is zero, then this class file must represent the class Object,
        // the only class or interface without a direct superclass.
        if self.super_class == 0 {
            return Ok(None);
        }

        // Otherwise the constant_pool entry at that index must be a CONSTANT_Class_info structure
        // representing the direct superclass of the class defined by this class file.
        self.class_at(self.super_class).map(Some)
    }

    pub fn class_name(&self) -> Result<&str> {
        // The value of the this_class item must be a valid index into the constant_pool table.
        // The constant_pool entry at that index must be a CONSTANT_Class_info structure
        // representing the class or interface defined by this class file.
        self.class_at(self.this_class)
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&index| self.class_at(index))
            .collect()
    }

    pub fn source_file(&self) -> Result<Option<&str>> {
        self.attributes
            .source_file()
            .map(|a| self.constant_pool.utf8(a.source_file_index))
            .transpose()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Result<&str> {
        self.constant_pool.utf8(field.name_index)
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Result<&str> {
        self.constant_pool.utf8(field.descriptor_index)
    }

    pub fn field_type(&self, field: &FieldInfo) -> Result<FieldDescriptor> {
        Ok(FieldDescriptor::parse(self.field_descriptor(field)?)?)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<&str> {
        self.constant_pool.utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<&str> {
        self.constant_pool.utf8(method.descriptor_index)
    }

    pub fn method_type(&self, method: &MethodInfo) -> Result<MethodDescriptor> {
        Ok(MethodDescriptor::parse(self.method_descriptor(method)?)?)
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|f| self.field_name(f).map_or(false, |n| n == name))
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| {
            self.method_name(m).map_or(false, |n| n == name)
                && self.method_descriptor(m).map_or(false, |d| d == descriptor)
        })
    }

    fn class_at(&self, index: u16) -> Result<&str> {
        let ClassInfo { name_index } = matches_cp_info!(self.constant_pool, index, Class)?;

        self.constant_pool.utf8(*name_index)
    }
}

#[derive(Debug)]
pub struct FieldInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
impl FieldInfo {
    pub fn new(
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
        attributes: Attributes,
    ) -> Self {
        Self {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        }
    }

    pub fn set_access_flags(&mut self, access_flags: AccessFlags) {
        self.access_flags = access_flags;
    }

    pub fn set_name_index(&mut self, name_index: u16) {
        self.name_index = name_index;
    }

    pub fn set_descriptor_index(&mut self, descriptor_index: u16) {
        self.descriptor_index = descriptor_index;
    }

    pub fn attribute(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.attributes.find_by_name(name, constant_pool)
    }

    /// Index of the generic signature, if the field has one.
    pub fn signature_index(&self) -> Option<u16> {
        self.attributes.signature().map(|s| s.signature_index)
    }
}

#[derive(Debug)]
pub struct MethodInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
impl MethodInfo {
    pub fn new(
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
        attributes: Attributes,
    ) -> Self {
        Self {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        }
    }

    pub fn set_access_flags(&mut self, access_flags: AccessFlags) {
        self.access_flags = access_flags;
    }

    pub fn set_name_index(&mut self, name_index: u16) {
        self.name_index = name_index;
    }

    pub fn set_descriptor_index(&mut self, descriptor_index: u16) {
        self.descriptor_index = descriptor_index;
    }

    pub fn attribute(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.attributes.find_by_name(name, constant_pool)
    }

    pub fn signature_index(&self) -> Option<u16> {
        self.attributes.signature().map(|s| s.signature_index)
    }

    pub fn code(&self) -> Option<&crate::attributes::CodeAttribute> {
        self.attributes.code()
    }
}
