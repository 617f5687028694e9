// Interview sessions: question generation, lifecycle transitions, response
// scoring, and stale-session cleanup.

pub mod cursor;
pub mod generation;
pub mod handlers;
pub mod lifecycle;
pub mod prompts;
pub mod responses;
pub mod sweeper;
