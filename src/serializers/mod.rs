//! Structures for serializing and deserializing.

mod import;

mod vmf;
pub use vmf::VmfSerializer;
