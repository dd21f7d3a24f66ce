//! 分割标签水平切片的操作.

mod core;
mod iter;

pub use core::LabelSlice;
