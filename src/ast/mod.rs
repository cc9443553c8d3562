//! Abstract syntax tree and its JSON dump.

pub mod nodes;
pub mod printer;

pub use nodes::*;
