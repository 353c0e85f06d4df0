// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

pub use bali_class_file as class_file;
pub use bali_descriptors as descriptors;
