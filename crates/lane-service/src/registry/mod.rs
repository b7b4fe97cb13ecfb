//! Lane state, pairing codes, and device lock-ins.
//!
//! Everything here is plain synchronous data owned by the gateway actor;
//! no locks, no I/O.

pub mod lanes;
pub mod lock_in;
pub mod pairing_code;

pub use lanes::LaneRegistry;
pub use lock_in::{check_against_lane, DeviceLockIn, LockInStore};
pub use pairing_code::{generate_code, CodeSource, RandomCodeSource};

#[cfg(any(test, feature = "test-utils"))]
pub use pairing_code::ScriptedCodeSource;
