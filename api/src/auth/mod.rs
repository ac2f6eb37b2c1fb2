pub mod caller;

pub use caller::{require_blog_owner, Caller, CALLER_HEADER};
