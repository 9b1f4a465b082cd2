pub mod fingerprint;

pub use fingerprint::ScoreFingerprint;
