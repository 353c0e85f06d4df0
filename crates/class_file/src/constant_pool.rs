use std::{convert::TryFrom, ops::Index};

use crate::{ClassFileError, Result};

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.resolve($index)? {
            $crate::constant_pool::Constant::$i(ref n) => Ok(n),
            c => Err($crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($i),
                c.clone(),
            )),
        }
    };
}

/// The constant pool of a class file. Index 0 is never valid; `Long` and
/// `Double` constants are followed by an `Unusable` slot so that 1-based
/// indices line up with the ones stored in the class file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConstantPool {
    constants: Vec<Constant>,
}
impl ConstantPool {
    pub fn new(constants: Vec<Constant>) -> Self {
        Self { constants }
    }

    /// Appends a constant and returns its index.
    pub fn push(&mut self, constant: Constant) -> Result<u16> {
        let slots = constant.slot_size();
        if self.constants.len() + slots > u16::MAX as usize - 1 {
            return Err(ClassFileError::ConstantPoolOverflow);
        }

        let index = self.constants.len() as u16 + 1;
        self.constants.push(constant);
        if slots == 2 {
            self.constants.push(Constant::Unusable);
        }

        Ok(index)
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.constants.get((index as usize).checked_sub(1)?)
    }

    /// Looks up the constant at `index`, rejecting index 0, indices past the
    /// end and the second slot of a `Long` or `Double`.
    pub fn resolve(&self, index: u16) -> Result<&Constant> {
        match self.get(index) {
            None | Some(Constant::Unusable) => Err(ClassFileError::InvalidConstantPoolIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        matches_cp_info!(self, index, Utf8).map(String::as_str)
    }

    /// Number of slots, including placeholders.
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// The value stored in the `constant_pool_count` item of a class file.
    /// Saturates at `u16::MAX` for pools too large to be written.
    pub fn count(&self) -> u16 {
        u16::try_from(self.constants.len() + 1).unwrap_or(u16::MAX)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constant> {
        self.constants.iter()
    }
}
/// # Panics
///
/// Panics if `index` is 0 or past the end of the pool. Use
/// [`ConstantPool::resolve`] for indices read from untrusted input.
impl Index<u16> for ConstantPool {
    type Output = Constant;

    fn index(&self, index: u16) -> &Self::Output {
        match self.get(index) {
            Some(constant) => constant,
            None => panic!("constant pool index {} out of bounds", index),
        }
    }
}
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = &'a Constant;
    type IntoIter = std::slice::Iter<'a, Constant>;

    fn into_iter(self) -> Self::IntoIter {
        self.constants.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConstantKind {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
    // Never appears in a class file.
    Unusable = 0,
}
impl ConstantKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Number of constant pool slots taken by constants of this kind.
    pub fn slot_size(self) -> usize {
        match self {
            ConstantKind::Long | ConstantKind::Double => 2,
            _ => 1,
        }
    }
}
impl TryFrom<u8> for ConstantKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(ConstantKind::Utf8),
            3 => Ok(ConstantKind::Integer),
            4 => Ok(ConstantKind::Float),
            5 => Ok(ConstantKind::Long),
            6 => Ok(ConstantKind::Double),
            7 => Ok(ConstantKind::Class),
            8 => Ok(ConstantKind::String),
            9 => Ok(ConstantKind::FieldRef),
            10 => Ok(ConstantKind::MethodRef),
            11 => Ok(ConstantKind::InterfaceMethodRef),
            12 => Ok(ConstantKind::NameAndType),
            15 => Ok(ConstantKind::MethodHandle),
            16 => Ok(ConstantKind::MethodType),
            17 => Ok(ConstantKind::Dynamic),
            18 => Ok(ConstantKind::InvokeDynamic),
            19 => Ok(ConstantKind::Module),
            20 => Ok(ConstantKind::Package),
            _ => Err(value),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ClassInfo),
    String(StringInfo),
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module(ModuleInfo),
    Package(PackageInfo),
    Unusable,
}
impl Constant {
    pub fn kind(&self) -> ConstantKind {
        match self {
            Constant::Utf8(_) => ConstantKind::Utf8,
            Constant::Integer(_) => ConstantKind::Integer,
            Constant::Float(_) => ConstantKind::Float,
            Constant::Long(_) => ConstantKind::Long,
            Constant::Double(_) => ConstantKind::Double,
            Constant::Class(_) => ConstantKind::Class,
            Constant::String(_) => ConstantKind::String,
            Constant::FieldRef(_) => ConstantKind::FieldRef,
            Constant::MethodRef(_) => ConstantKind::MethodRef,
            Constant::InterfaceMethodRef(_) => ConstantKind::InterfaceMethodRef,
            Constant::NameAndType(_) => ConstantKind::NameAndType,
            Constant::MethodHandle(_) => ConstantKind::MethodHandle,
            Constant::MethodType(_) => ConstantKind::MethodType,
            Constant::Dynamic(_) => ConstantKind::Dynamic,
            Constant::InvokeDynamic(_) => ConstantKind::InvokeDynamic,
            Constant::Module(_) => ConstantKind::Module,
            Constant::Package(_) => ConstantKind::Package,
            Constant::Unusable => ConstantKind::Unusable,
        }
    }

    pub fn slot_size(&self) -> usize {
        self.kind().slot_size()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ClassInfo {
    // The value of the name_index item must be a valid index into the constant_pool table.
    // The constant_pool entry at that index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StringInfo {
    pub string_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

/// Shared by `CONSTANT_Dynamic_info` and `CONSTANT_InvokeDynamic_info`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DynamicInfo {
    // Index into the bootstrap_methods array of the BootstrapMethods attribute, not the pool.
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ModuleInfo {
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PackageInfo {
    pub name_index: u16,
}


#[cfg(test)]
mod resolve_tests {
    use super::*;

    fn constant_pool() -> ConstantPool {
        ConstantPool::new(vec![
            Constant::Utf8("java/lang/Object".into()),
            Constant::Class(ClassInfo { name_index: 1 }),
            Constant::Long(-1),
            Constant::Unusable,
        ])
    }

    #[test]
    fn it_should_resolve_valid_indices() {
        assert_eq!(
            &Constant::Class(ClassInfo { name_index: 1 }),
            constant_pool().resolve(2).unwrap()
        );
    }

    #[test]
    fn it_should_reject_index_zero() {
        assert!(matches!(
            constant_pool().resolve(0),
            Err(ClassFileError::InvalidConstantPoolIndex(0))
        ));
    }

    #[test]
    fn it_should_reject_indices_past_the_end() {
        assert!(matches!(
            constant_pool().resolve(5),
            Err(ClassFileError::InvalidConstantPoolIndex(5))
        ));
    }

    #[test]
    fn it_should_reject_placeholder_slots() {
        assert!(matches!(
            constant_pool().resolve(4),
            Err(ClassFileError::InvalidConstantPoolIndex(4))
        ));
    }

    #[test]
    fn it_should_resolve_utf8_constants() {
        assert_eq!("java/lang/Object", constant_pool().utf8(1).unwrap());
    }

    #[test]
    fn it_should_fail_on_a_kind_mismatch() {
        assert!(matches!(
            constant_pool().utf8(2),
            Err(ClassFileError::UnexpectedConstantPoolEntry("Utf8", _))
        ));
    }
}

#[cfg(test)]
mod constant_kind_tests {
    use super::*;

    #[test]
    fn it_should_round_trip_every_tag() {
        for tag in 0..=u8::MAX {
            if let Ok(kind) = ConstantKind::try_from(tag) {
                assert_eq!(tag, kind.tag());
            }
        }
    }

    #[test]
    fn it_should_reject_unknown_tags() {
        for tag in [0, 2, 13, 14, 21, 255] {
            assert_eq!(Err(tag), ConstantKind::try_from(tag));
        }
    }
}
