pub mod github;
pub use github::NormalizedEvent;
