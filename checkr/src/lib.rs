// Library interface for checkr modules
// This allows tests and the binary to import modules

pub mod archive;
pub mod comments;
pub mod llm;
pub mod parser;
pub mod pipeline;
pub mod similarity;
