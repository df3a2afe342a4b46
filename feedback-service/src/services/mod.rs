pub mod evaluator;
pub mod normalizer;
pub mod prompt;
pub mod providers;
pub mod text;

pub use evaluator::FeedbackEvaluator;
