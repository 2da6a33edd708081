//! Database boundary.
//!
//! [`MapStore`] is implemented by [`PostgresMapStore`] (production) and
//! [`InMemoryMapStore`] (fixture-backed, for tests/dev).

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryMapStore;
pub use postgres::PostgresMapStore;
pub use r#trait::{DatabaseStatus, MapStore};
