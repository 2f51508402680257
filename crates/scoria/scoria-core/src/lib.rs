//! `scoria-core`: the shared replay log and its producers.
//!
//! The server's single point of serialization lives here. [`SharedLog`] pairs
//! the on-disk data file with the mutex that every reader and writer must
//! hold; [`TimestampTicker`] is the periodic producer that interleaves
//! timestamp lines with client traffic.

mod shared_log;
mod ticker;

pub use shared_log::SharedLog;
pub use ticker::TimestampTicker;
