// ── Connection health ──
//
// Connect/disconnect state machine and the reconnection policy it drives.

mod reconnect;
mod tracker;

pub use reconnect::ReconnectScheduler;
pub use tracker::{ConnectionHealthTracker, ConnectionRecord};
