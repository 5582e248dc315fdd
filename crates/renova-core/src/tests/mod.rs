//! Test infrastructure for falsification testing.
//!
//! Each test tries to break one property of the engine:
//!
//! | Category | ID Range | Description |
//! |----------|----------|-------------|
//! | A | F001-F012 | Subscription counting and watch lifecycle |
//! | B | F013-F030 | Deletion sequence per strategy |
//! | C | F031-F036 | End-to-end upgrade scenarios |
//! | P | - | Property tests over random subscription histories |

pub mod harness;
pub mod scenarios;

pub use harness::TestHarness;
pub use mocks::{FakeAdapter, Journal, RecordingExit, SpyWatcher};
