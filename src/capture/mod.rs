//! Capture database access.

pub mod schema;
pub mod store;

#[cfg(test)]
pub mod fixture;

pub use schema::CaptureSchema;
pub use store::CaptureStore;
