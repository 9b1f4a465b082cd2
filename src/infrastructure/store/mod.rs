pub mod feed_store;

pub use feed_store::{FeedStore, MergeOutcome};
