// ── State store ──
//
// Owns the current `RootState`, applies the reducer serially, and
// publishes every change to synchronous subscribers and `watch` streams.

mod dispatcher;
mod stream;

pub(crate) use dispatcher::lock;
pub use dispatcher::{StateChange, Store, SubscriptionId};
pub use stream::{StateStream, StateWatchStream};
