pub mod connection;
pub mod couch;
pub mod error;
pub mod traits;

pub use connection::*;
pub use couch::*;
pub use error::*;
pub use traits::*;
