#![doc = include_str!("../README.md")]

pub mod transform;

mod core;
pub use self::core::*;
