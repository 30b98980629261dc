pub mod buffer;
pub mod cache;
