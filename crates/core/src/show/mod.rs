#[allow(clippy::module_inception)]
pub mod show;
pub mod show_compiler;
pub mod show_manager;
