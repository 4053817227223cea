pub mod layout;
pub mod merge;
pub mod optimizer;
pub mod reader;
pub mod writer;
