pub mod reviews;
pub mod sync;
pub mod users;
pub mod venues;
