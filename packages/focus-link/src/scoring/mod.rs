pub mod scorer;
pub mod types;

pub use scorer::SessionScorer;
pub use types::{
    ScorerPhase, ScoringConfig, ScoringWindow, SessionScore, DEFAULT_ATTENTION_THRESHOLD,
    DEFAULT_GOOD_SIGNAL_THRESHOLD, DEFAULT_WINDOW,
};
