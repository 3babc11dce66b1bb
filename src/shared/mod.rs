pub mod cli;
pub mod context;
