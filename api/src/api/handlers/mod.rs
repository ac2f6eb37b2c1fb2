// HTTP handlers only deal with HTTP concerns:
// 1. Extract parameters from the request
// 2. Resolve the caller and check route-level authorization
// 3. Call domain logic
// 4. Turn the domain result into a response

pub mod curators;
pub mod permissions;
pub mod profiles;
pub mod reviews;
pub mod sync;
pub mod venues;

pub use curators::{add_curator_handler, list_curators_handler, remove_curator_handler};
pub use permissions::permissions_handler;
pub use profiles::{get_profile_handler, update_profile_handler};
pub use reviews::{create_review_handler, list_reviews_handler};
pub use sync::{sync_action_handler, sync_status_handler};
pub use venues::{
    create_venue_handler, delete_venue_handler, get_venue_handler, list_venues_handler,
    update_venue_handler, verify_venue_handler,
};
