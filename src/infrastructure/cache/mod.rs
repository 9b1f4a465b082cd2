pub mod score_cache;

pub use score_cache::ScoreCache;
