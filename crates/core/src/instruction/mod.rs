pub mod codec;
#[allow(clippy::module_inception)]
pub mod instruction;
