pub mod service;
pub mod summary;

pub use service::{MessagingService, UserMessages};
pub use summary::summarize_contacts;
