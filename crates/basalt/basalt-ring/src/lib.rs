//! `basalt-ring`: fixed-slot record ring with offset addressing.
//!
//! This crate provides the storage core for the line store: a ring of `N`
//! slots holding variable-length records, where inserting into a full ring
//! evicts the oldest record and hands its ownership back to the caller.
//!
//! # Core Components
//!
//! - [`Record`]: one owned newline-terminated line
//! - [`RecordRing`]: the fixed-capacity FIFO ring
//! - [`RING_SLOTS`]: the default slot count
//!
//! # Addressing
//!
//! Live records form a virtual byte stream: the payloads of all live slots
//! concatenated in age order, oldest first. A position in that stream maps to
//! exactly one `(record, byte-in-record)` pair while the position is below the
//! total live byte count.
//!
//! ```text
//!            out                      in
//!             │                        │
//!   ┌─────┬───▼───┬───────┬───────┬────▼────┬─────┐
//!   │  -  │ "b\n" │ "cc\n"│ "d\n" │    -    │  -  │
//!   └─────┴───────┴───────┴───────┴─────────┴─────┘
//!   stream:  b \n   c c \n  d \n
//!   offset:  0 1    2 3 4   5 6        (total = 7)
//! ```

mod record;
mod ring;

pub use record::Record;
pub use ring::{RING_SLOTS, RecordRing};
