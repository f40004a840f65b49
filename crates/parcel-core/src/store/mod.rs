// # Entry Store Implementations
//
// This module provides implementations of the EntryStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileEntryStore;
pub use memory::MemoryEntryStore;
