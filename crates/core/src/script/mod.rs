pub mod parser;
pub mod section;
