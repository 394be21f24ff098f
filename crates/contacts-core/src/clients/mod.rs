// # Built-in Clients
//
// Client implementations that ship with the core library. Network-backed
// clients live in their own crates (e.g. `contacts-gateway-http`).

pub mod memory;

pub use memory::{MemoryClientFactory, MemoryDirectory, MemoryUser};
