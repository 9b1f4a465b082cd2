pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{FeedGateway, FeedSubscription, PostUpdate};
pub use application::services::{FeedSession, FeedSnapshot, MutationStatus};
pub use domain::entities::Post;
pub use shared::{AppError, FeedConfig};
