pub mod file_entry;
pub mod operation;
pub mod suggestion;
pub mod tree;
