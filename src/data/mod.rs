pub mod candidate;
pub mod export;
pub mod loader;
pub mod validate;
