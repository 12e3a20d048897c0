//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services validate input and orchestrate database and storage calls.

mod account;
mod message;
mod timeline;
mod tweet;

pub use account::{AccountService, LoginOutcome, Profile, ProfileForm};
pub use message::MessageService;
pub use timeline::TimelineService;
pub use tweet::{ImageUpload, MAX_IMAGE_UPLOAD_BYTES, Thread, TweetService};
