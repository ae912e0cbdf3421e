pub mod scanner;
pub mod sources;
