//! Scheduled background tasks
//!
//! Currently one task: the quote feed health probe that recovers the
//! live feed after the mock fallback latch trips.

mod feed_health;

pub use feed_health::FeedHealthScheduler;
