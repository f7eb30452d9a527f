//! Per-user conversation state with a sliding inactivity window.
//!
//! The store owns every entry; collaborators only ever look sessions up by
//! owner key and receive snapshots back. Expiry is lazy (evict-on-read) with
//! a periodic sweep as the backstop against abandoned sessions.

mod clock;
mod store;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{ConversationState, SessionStore, MAIN_MENU};
pub use sweeper::{SessionSweeper, SweeperHandle};
