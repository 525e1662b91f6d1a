//! Database schema, connection setup and seeding

pub mod init;
pub mod seed;

pub use init::*;
pub use seed::*;
