// Shared utilities

pub mod text;
