pub mod fs;
pub mod mmap;
