use std::{
    fmt::{self, Write},
    str::FromStr,
};

use crate::{DescriptorError, Lexer, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Void,
}
impl PrimitiveKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(PrimitiveKind::Byte),
            'C' => Some(PrimitiveKind::Char),
            'D' => Some(PrimitiveKind::Double),
            'F' => Some(PrimitiveKind::Float),
            'I' => Some(PrimitiveKind::Int),
            'J' => Some(PrimitiveKind::Long),
            'S' => Some(PrimitiveKind::Short),
            'Z' => Some(PrimitiveKind::Boolean),
            'V' => Some(PrimitiveKind::Void),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Double => 'D',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Void => 'V',
        }
    }

    /// Long and double values take two local variable and operand stack slots.
    pub fn is_wide(self) -> bool {
        matches!(self, PrimitiveKind::Long | PrimitiveKind::Double)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Primitive(PrimitiveKind),
    NonPrimitive {
        // Internal form, e.g. `java/lang/Object`.
        class_name: String,
        generic_parameters: Vec<FieldDescriptor>,
    },
}

/// The type of a single value, wrapped in `array_rank` array dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub array_rank: usize,
    pub field_type: FieldType,
}
impl FieldDescriptor {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            array_rank: 0,
            field_type: FieldType::Primitive(kind),
        }
    }

    pub fn class(class_name: impl Into<String>) -> Self {
        Self {
            array_rank: 0,
            field_type: FieldType::NonPrimitive {
                class_name: class_name.into(),
                generic_parameters: Vec::new(),
            },
        }
    }

    pub fn with_array_rank(mut self, array_rank: usize) -> Self {
        self.array_rank = array_rank;
        self
    }

    pub fn with_generic_parameters(mut self, parameters: Vec<FieldDescriptor>) -> Self {
        if let FieldType::NonPrimitive {
            ref mut generic_parameters,
            ..
        } = self.field_type
        {
            *generic_parameters = parameters;
        }
        self
    }

    pub fn parse(descriptor: &str) -> crate::Result<Self> {
        Parser::new(Lexer::new(descriptor)).parse_field_descriptor()
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.field_type {
            FieldType::Primitive(kind) => Some(kind),
            FieldType::NonPrimitive { .. } => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match &self.field_type {
            FieldType::NonPrimitive { class_name, .. } => Some(class_name),
            FieldType::Primitive(_) => None,
        }
    }

    pub fn generic_parameters(&self) -> &[FieldDescriptor] {
        match &self.field_type {
            FieldType::NonPrimitive {
                generic_parameters, ..
            } => generic_parameters,
            FieldType::Primitive(_) => &[],
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_rank > 0
    }

    pub fn is_void(&self) -> bool {
        self.array_rank == 0 && self.primitive_kind() == Some(PrimitiveKind::Void)
    }
}
impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.array_rank {
            f.write_char('[')?;
        }

        match &self.field_type {
            FieldType::Primitive(kind) => f.write_char(kind.as_char()),
            FieldType::NonPrimitive {
                class_name,
                generic_parameters,
            } => {
                write!(f, "L{}", class_name)?;
                if !generic_parameters.is_empty() {
                    f.write_char('<')?;
                    for parameter in generic_parameters {
                        write!(f, "{}", parameter)?;
                    }
                    f.write_char('>')?;
                }
                f.write_char(';')
            }
        }
    }
}
impl FromStr for FieldDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldDescriptor>,
    pub return_type: FieldDescriptor,
}
impl MethodDescriptor {
    pub fn new(parameters: Vec<FieldDescriptor>, return_type: FieldDescriptor) -> Self {
        Self {
            parameters,
            return_type,
        }
    }

    pub fn parse(descriptor: &str) -> crate::Result<Self> {
        Parser::new(Lexer::new(descriptor)).parse_method_descriptor()
    }

    /// Number of local variable slots taken by the parameters, not counting `this`.
    pub fn parameter_slots(&self) -> usize {
        self.parameters
            .iter()
            .map(|p| match p.primitive_kind() {
                Some(kind) if p.array_rank == 0 && kind.is_wide() => 2,
                _ => 1,
            })
            .sum()
    }
}
impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('(')?;
        for parameter in &self.parameters {
            write!(f, "{}", parameter)?;
        }
        write!(f, "){}", self.return_type)
    }
}
impl FromStr for MethodDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
