/// Native module contains implementations of core traits
/// that talk to the local machine directly: child processes,
/// compiler toolchains, build workspaces and an SQLite file.
pub mod process;
pub mod slots;
pub mod store;
pub mod toolchain;
