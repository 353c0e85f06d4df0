use std::{
    convert::TryFrom,
    io::{BufReader, Read, Seek},
    sync::Arc,
};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    attributes::{AttributeReader, AttributeRegistry, Attributes},
    class_file::{FieldInfo, MethodInfo},
    constant_pool::{
        ClassInfo, Constant, ConstantKind, DynamicInfo, MethodHandleInfo, MethodTypeInfo,
        ModuleInfo, NameAndTypeInfo, PackageInfo, RefInfo, StringInfo,
    },
    AccessFlags, ClassFile, ClassFileError, ConstantPool, Result,
};

type Endian = BigEndian;

pub struct Parser<R> {
    r: BufReader<R>,
    registry: Arc<AttributeRegistry>,
}
impl<R: Read + Seek> Parser<R> {
    pub fn new(r: R) -> Self {
        Self::with_registry(r, Arc::new(AttributeRegistry::default()))
    }

    pub fn with_registry(r: R, registry: Arc<AttributeRegistry>) -> Self {
        Self {
            r: BufReader::new(r),
            registry,
        }
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        self.parse_magic_identifier()?;
        let version = self.parse_version()?;

        let constant_pool = self.parse_constant_pool()?;
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let this_class = self.read_u16()?;
        let super_class = self.read_u16()?;
        let interfaces_count = self.read_u16()?;

        let mut interfaces = vec![0u16; interfaces_count as usize];
        self.r.read_u16_into::<Endian>(&mut interfaces)?;

        let fields_count = self.read_u16()?;
        let fields = (0..fields_count)
            .map(|_| self.parse_field_info(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let methods_count = self.read_u16()?;
        let methods = (0..methods_count)
            .map(|_| self.parse_method_info(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let attributes = self.parse_attributes(&constant_pool)?;

        log::debug!(
            "Parsed class file version {}.{}: {} constants, {} fields, {} methods",
            version.0,
            version.1,
            constant_pool.len(),
            fields.len(),
            methods.len()
        );

        Ok(ClassFile {
            version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    pub fn parse_field_info(&mut self, constant_pool: &ConstantPool) -> Result<FieldInfo> {
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes = self.parse_attributes(constant_pool)?;

        Ok(FieldInfo::new(
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        ))
    }

    pub fn parse_method_info(&mut self, constant_pool: &ConstantPool) -> Result<MethodInfo> {
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes = self.parse_attributes(constant_pool)?;

        Ok(MethodInfo::new(
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        ))
    }

    fn parse_magic_identifier(&mut self) -> Result<()> {
        match self.read_u32()? {
            0xCAFEBABE => Ok(()),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;
        Ok((major, minor))
    }

    /// Reads `constant_pool_count` followed by the pool itself.
    pub fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.read_u16()?;
        self.parse_constant_pool_entries(constant_pool_count)
    }

    /// Reads the entries of a pool whose `constant_pool_count` is already known.
    /// Any error aborts the whole pool, since the indices of everything after
    /// a bad entry would be off.
    pub fn parse_constant_pool_entries(&mut self, constant_pool_count: u16) -> Result<ConstantPool> {
        let slots = (constant_pool_count as usize).saturating_sub(1);
        let mut constants = Vec::with_capacity(slots);
        while constants.len() < slots {
            let constant = self.parse_constant()?;
            log::trace!("#{} = {:?}", constants.len() + 1, constant);

            let slot_size = constant.slot_size();
            if constants.len() + slot_size > slots {
                return Err(ClassFileError::InvalidConstantPoolCount(constant_pool_count));
            }
            constants.push(constant);
            if slot_size == 2 {
                constants.push(Constant::Unusable);
            }
        }

        Ok(ConstantPool::new(constants))
    }

    pub fn parse_constant(&mut self) -> Result<Constant> {
        let tag = self.read_u8()?;
        let kind = ConstantKind::try_from(tag).map_err(ClassFileError::UnsupportedConstantKind)?;

        Ok(match kind {
            ConstantKind::Utf8 => self.parse_utf8()?,
            ConstantKind::Integer => Constant::Integer(self.read_i32()?),
            ConstantKind::Float => Constant::Float(self.r.read_f32::<Endian>()?),
            ConstantKind::Long => Constant::Long(self.r.read_i64::<Endian>()?),
            ConstantKind::Double => Constant::Double(self.r.read_f64::<Endian>()?),
            ConstantKind::Class => Constant::Class(ClassInfo {
                name_index: self.read_u16()?,
            }),
            ConstantKind::String => Constant::String(StringInfo {
                string_index: self.read_u16()?,
            }),
            ConstantKind::FieldRef => Constant::FieldRef(self.parse_ref_info()?),
            ConstantKind::MethodRef => Constant::MethodRef(self.parse_ref_info()?),
            ConstantKind::InterfaceMethodRef => {
                Constant::InterfaceMethodRef(self.parse_ref_info()?)
            }
            ConstantKind::NameAndType => self.parse_name_and_type_info()?,
            ConstantKind::MethodHandle => self.parse_method_handle()?,
            ConstantKind::MethodType => Constant::MethodType(MethodTypeInfo {
                descriptor_index: self.read_u16()?,
            }),
            ConstantKind::Dynamic => Constant::Dynamic(self.parse_dynamic_info()?),
            ConstantKind::InvokeDynamic => Constant::InvokeDynamic(self.parse_dynamic_info()?),
            ConstantKind::Module => Constant::Module(ModuleInfo {
                name_index: self.read_u16()?,
            }),
            ConstantKind::Package => Constant::Package(PackageInfo {
                name_index: self.read_u16()?,
            }),
            ConstantKind::Unusable => return Err(ClassFileError::UnsupportedConstantKind(tag)),
        })
    }

    // Class files store strings as modified UTF-8: NUL is encoded on two
    // bytes and supplementary characters as surrogate pairs.
    fn parse_utf8(&mut self) -> Result<Constant> {
        let length = self.read_u16()?;
        let mut bytes = vec![0u8; length as usize];
        self.r.read_exact(&mut bytes)?;

        let string =
            cesu8::from_java_cesu8(&bytes).map_err(|_| ClassFileError::InvalidModifiedUtf8)?;
        Ok(Constant::Utf8(string.into_owned()))
    }

    fn parse_name_and_type_info(&mut self) -> Result<Constant> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        Ok(Constant::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<Constant> {
        let reference_kind = self.read_u8()?;
        let reference_index = self.read_u16()?;

        Ok(Constant::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_dynamic_info(&mut self) -> Result<DynamicInfo> {
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    /// Reads `attributes_count` followed by the attributes, resolving their
    /// names through `constant_pool`.
    pub fn parse_attributes(&mut self, constant_pool: &ConstantPool) -> Result<Attributes> {
        AttributeReader::new(&mut self.r, constant_pool, &self.registry).read_attributes()
    }

    /// Current offset in the underlying stream.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.r.stream_position()?)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.r.read_i32::<Endian>()?)
    }
}
