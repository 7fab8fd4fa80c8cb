pub mod builder;
pub mod process;
pub mod store;
