// Adapters binding the engine's ports to real backends.

pub mod aws;
pub mod memory;
pub mod s3;
