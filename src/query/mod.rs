pub mod ast;
pub mod parser;
pub mod finder;
pub mod cache;
pub mod matcher;
pub mod relation;
