//! TCP connection and connection pool (spec §4.3, §4.4).

pub mod connection;
pub mod pool;

pub use connection::{Connection, ConnectionEvent};
pub use pool::ConnectionPool;
