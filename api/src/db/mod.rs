pub mod connection;
pub mod errors;
pub mod queries;


pub use connection::*;
pub use errors::*;
