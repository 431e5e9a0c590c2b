pub mod adapter;
pub mod clock;
pub mod engine;
pub mod errors;
pub mod vendor_client;
pub mod yieldlab;
