//! shelf-core library exports

pub mod catalog;
pub mod dispatch;
pub mod featured;
