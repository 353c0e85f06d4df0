use std::{io::Cursor, sync::Arc, thread};

use bali_class_file::{
    attributes::{CodeAttribute, SignatureAttribute, SourceFileAttribute, UnknownAttribute},
    constant_pool::ClassInfo,
    AccessFlags, Attribute, AttributeRegistry, Attributes, ClassFile, ClassFileError, Constant,
    ConstantPool, FieldInfo, MethodInfo, Parser,
};
use bali_descriptors::{FieldDescriptor, PrimitiveKind};

fn utf8(constant_pool: &mut ConstantPool, s: &str) -> u16 {
    constant_pool.push(Constant::Utf8(s.into())).unwrap()
}

fn class(constant_pool: &mut ConstantPool, name: &str) -> u16 {
    let name_index = utf8(constant_pool, name);
    constant_pool
        .push(Constant::Class(ClassInfo { name_index }))
        .unwrap()
}

fn code(name_index: u16, code: Vec<u8>) -> Attributes {
    Attributes(vec![Attribute::Code(CodeAttribute {
        name_index,
        max_stack: 1,
        max_locals: 2,
        code,
        exception_table: Vec::new(),
        attributes: Attributes::default(),
    })])
}

// package my;
//
// public class MyClass implements Runnable {
//     private final int myField = 0;
//     private List<String> names;
//
//     public MyClass() {}
//     public float add(int i) { ... }
// }
fn my_class() -> ClassFile {
    let mut constant_pool = ConstantPool::default();
    let this_class = class(&mut constant_pool, "my/MyClass");
    let super_class = class(&mut constant_pool, "java/lang/Object");
    let runnable = class(&mut constant_pool, "java/lang/Runnable");
    constant_pool.push(Constant::Long(1 << 40)).unwrap();
    let my_field = utf8(&mut constant_pool, "myField");
    let int = utf8(&mut constant_pool, "I");
    let names = utf8(&mut constant_pool, "names");
    let list = utf8(&mut constant_pool, "Ljava/util/List;");
    let signature = utf8(&mut constant_pool, "Signature");
    let list_of_strings = utf8(&mut constant_pool, "Ljava/util/List<Ljava/lang/String;>;");
    let init = utf8(&mut constant_pool, "<init>");
    let void = utf8(&mut constant_pool, "()V");
    let add = utf8(&mut constant_pool, "add");
    let int_to_float = utf8(&mut constant_pool, "(I)F");
    let code_name = utf8(&mut constant_pool, "Code");
    let source_file = utf8(&mut constant_pool, "SourceFile");
    let my_class_java = utf8(&mut constant_pool, "MyClass.java");
    let marker = utf8(&mut constant_pool, "com.vendor.Marker");

    ClassFile {
        version: (61, 0),
        constant_pool,
        access_flags: AccessFlags::PUBLIC | AccessFlags::SUPER,
        this_class,
        super_class,
        interfaces: vec![runnable],
        fields: vec![
            FieldInfo::new(
                AccessFlags::FINAL | AccessFlags::PRIVATE,
                my_field,
                int,
                Attributes::default(),
            ),
            FieldInfo::new(
                AccessFlags::PRIVATE,
                names,
                list,
                Attributes(vec![Attribute::Signature(SignatureAttribute {
                    name_index: signature,
                    signature_index: list_of_strings,
                })]),
            ),
        ],
        methods: vec![
            MethodInfo::new(
                AccessFlags::PUBLIC,
                init,
                void,
                code(code_name, vec![0x2a, 0xb7, 0x00, 0x01, 0xb1]),
            ),
            MethodInfo::new(
                AccessFlags::PUBLIC,
                add,
                int_to_float,
                code(code_name, vec![0x1b, 0x86, 0xae]),
            ),
        ],
        attributes: Attributes(vec![
            Attribute::SourceFile(SourceFileAttribute {
                name_index: source_file,
                source_file_index: my_class_java,
            }),
            Attribute::Unknown(UnknownAttribute {
                name_index: marker,
                info: vec![1, 2, 3],
            }),
        ]),
    }
}

fn my_class_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    my_class().write(&mut bytes).unwrap();
    bytes
}

fn with_class_file(f: impl FnOnce(ClassFile)) {
    let _ = pretty_env_logger::try_init();

    f(Parser::new(Cursor::new(my_class_bytes())).parse().unwrap());
}

#[test]
fn test_super_class() {
    with_class_file(|class_file| {
        assert_eq!(Some("java/lang/Object"), class_file.super_class().unwrap())
    });
}

#[test]
fn test_class_name() {
    with_class_file(|class_file| assert_eq!("my/MyClass", class_file.class_name().unwrap()));
}

#[test]
fn test_version() {
    with_class_file(|class_file| assert_eq!((61, 0), class_file.version));
}

#[test]
fn test_interfaces() {
    with_class_file(|class_file| {
        assert_eq!(
            vec!["java/lang/Runnable"],
            class_file.interface_names().unwrap()
        )
    });
}

#[test]
fn test_field_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "myField",
            class_file.field_name(&class_file.fields[0]).unwrap()
        )
    });
}

#[test]
fn test_int_field_type() {
    with_class_file(|class_file| {
        assert_eq!(
            "I",
            class_file.field_descriptor(&class_file.fields[0]).unwrap()
        );
        assert_eq!(
            FieldDescriptor::primitive(PrimitiveKind::Int),
            class_file.field_type(&class_file.fields[0]).unwrap()
        );
    });
}

#[test]
fn test_field_access_flags() {
    with_class_file(|class_file| {
        assert_eq!(
            AccessFlags::FINAL | AccessFlags::PRIVATE,
            class_file.fields[0].access_flags
        )
    });
}

#[test]
fn test_field_signature() {
    with_class_file(|class_file| {
        let field = class_file.find_field("names").unwrap();
        let signature = class_file
            .constant_pool
            .utf8(field.signature_index().unwrap())
            .unwrap();
        let descriptor = FieldDescriptor::parse(signature).unwrap();

        assert_eq!(Some("java/util/List"), descriptor.class_name());
        assert_eq!(
            &[FieldDescriptor::class("java/lang/String")],
            descriptor.generic_parameters()
        );
    });
}

#[test]
fn test_constructor_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "<init>",
            class_file.method_name(&class_file.methods[0]).unwrap()
        )
    });
}

#[test]
fn test_constructor_descriptor() {
    with_class_file(|class_file| {
        assert_eq!(
            "()V",
            class_file
                .method_descriptor(&class_file.methods[0])
                .unwrap()
        )
    });
}

#[test]
fn test_method_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "add",
            class_file.method_name(&class_file.methods[1]).unwrap()
        )
    });
}

#[test]
fn test_method_descriptor() {
    with_class_file(|class_file| {
        assert_eq!(
            "(I)F",
            class_file
                .method_descriptor(&class_file.methods[1])
                .unwrap()
        );

        let method_type = class_file.method_type(&class_file.methods[1]).unwrap();
        assert_eq!(
            vec![FieldDescriptor::primitive(PrimitiveKind::Int)],
            method_type.parameters
        );
        assert_eq!(
            FieldDescriptor::primitive(PrimitiveKind::Float),
            method_type.return_type
        );
    });
}

#[test]
fn test_method_access_flags() {
    with_class_file(|class_file| {
        assert_eq!(AccessFlags::PUBLIC, class_file.methods[1].access_flags)
    });
}

#[test]
fn test_code_attribute() {
    with_class_file(|class_file| {
        let method = class_file.find_method("add", "(I)F").unwrap();
        let code = method.code().unwrap();

        assert_eq!(vec![0x1b, 0x86, 0xae], code.code);
        assert_eq!(2, code.max_locals);
    });
}

#[test]
fn test_source_file() {
    with_class_file(|class_file| {
        assert_eq!(Some("MyClass.java"), class_file.source_file().unwrap())
    });
}

#[test]
fn test_unknown_attributes_are_kept() {
    with_class_file(|class_file| {
        let marker = class_file
            .attributes
            .find_by_name("com.vendor.Marker", &class_file.constant_pool)
            .unwrap();

        assert!(matches!(marker, Attribute::Unknown(a) if a.info == vec![1, 2, 3]));
    });
}

#[test]
fn test_long_constants_take_two_slots() {
    with_class_file(|class_file| {
        let constant_pool = &class_file.constant_pool;
        let long_index = (1..=constant_pool.len() as u16)
            .find(|&i| matches!(constant_pool[i], Constant::Long(_)))
            .unwrap();

        assert_eq!(Constant::Long(1 << 40), constant_pool[long_index]);
        assert!(matches!(
            constant_pool.resolve(long_index + 1),
            Err(ClassFileError::InvalidConstantPoolIndex(_))
        ));
        assert_eq!("myField", constant_pool.utf8(long_index + 2).unwrap());
    });
}

#[test]
fn test_writing_a_parsed_class_file_reproduces_its_bytes() {
    let bytes = my_class_bytes();
    let class_file = ClassFile::parse(Cursor::new(&bytes)).unwrap();

    let mut written = Vec::new();
    class_file.write(&mut written).unwrap();

    assert_eq!(bytes, written);
}

#[test]
fn test_empty_registry_keeps_attributes_opaque() {
    let bytes = my_class_bytes();
    let class_file =
        Parser::with_registry(Cursor::new(&bytes), Arc::new(AttributeRegistry::empty()))
            .parse()
            .unwrap();

    assert!(class_file.methods[0].code().is_none());
    assert!(matches!(
        class_file.methods[0].attribute("Code", &class_file.constant_pool),
        Some(Attribute::Unknown(_))
    ));

    let mut written = Vec::new();
    class_file.write(&mut written).unwrap();
    assert_eq!(bytes, written);
}

#[test]
fn test_parsing_on_several_threads_with_a_shared_registry() {
    let bytes = Arc::new(my_class_bytes());
    let registry = Arc::new(AttributeRegistry::default());

    let handles = (0..4)
        .map(|_| {
            let bytes = Arc::clone(&bytes);
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let class_file = Parser::with_registry(Cursor::new(&bytes[..]), registry)
                    .parse()
                    .unwrap();
                class_file.class_name().unwrap().to_owned()
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        assert_eq!("my/MyClass", handle.join().unwrap());
    }
}

#[test]
fn test_truncated_class_file() {
    let bytes = my_class_bytes();

    assert!(matches!(
        ClassFile::parse(Cursor::new(&bytes[..bytes.len() - 1])),
        Err(ClassFileError::UnexpectedEndOfInput)
    ));
}

#[test]
fn test_java_lang_object_has_no_super_class() {
    let mut constant_pool = ConstantPool::default();
    let this_class = class(&mut constant_pool, "java/lang/Object");
    let class_file = ClassFile {
        version: (52, 0),
        constant_pool,
        access_flags: AccessFlags::PUBLIC,
        this_class,
        super_class: 0,
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
        attributes: Attributes::default(),
    };

    let mut bytes = Vec::new();
    class_file.write(&mut bytes).unwrap();
    let class_file = ClassFile::parse(Cursor::new(bytes)).unwrap();

    assert_eq!(None, class_file.super_class().unwrap());
}

#[test]
fn test_unsupported_constant_kind_aborts_parsing() {
    let mut bytes = my_class_bytes();
    // The first constant's tag directly follows the magic, version and count.
    bytes[10] = 0x02;

    assert!(matches!(
        ClassFile::parse(Cursor::new(bytes)),
        Err(ClassFileError::UnsupportedConstantKind(0x02))
    ));
}
