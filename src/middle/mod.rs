//! Middle-end module - frames and static links handed to code generation

pub mod frame;
