//! Business services.
//!
//! Each service owns a handle to the document store and implements one
//! slice of the API. Handlers stay thin and delegate here.

pub mod catalog;
pub mod feed;
pub mod feedback;
pub mod identity;
pub mod rating;
pub mod retry;
pub mod social;

pub use catalog::CatalogService;
pub use feed::FeedService;
pub use feedback::FeedbackService;
pub use identity::IdentityService;
pub use rating::RatingService;
pub use social::SocialService;
