pub mod feed_service;
pub mod mutation_service;
pub mod pagination;
pub mod ranking_service;

pub use feed_service::{FeedSession, FeedSnapshot};
pub use mutation_service::{MutationCoordinator, MutationStatus};
pub use pagination::PaginationController;
pub use ranking_service::{RankingService, relevancy_score};
