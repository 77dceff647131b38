//! The transform passes shipped with the crate. Each one implements the
//! [`TransformPass`](crate::TransformPass) contract and is registered
//! into a pass manager or task graph under its stable identifier.

mod constfold;
mod dce;
mod lowering;

pub use self::{constfold::ConstantFolding, dce::DeadCodeElimination, lowering::IrLowering};
