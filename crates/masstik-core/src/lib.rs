// masstik-core: Unidirectional state store and update orchestration for MassTik.

pub mod action;
pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod reconcile;
pub mod reducer;
pub mod servers_text;
pub mod state;
pub mod store;
pub mod updater;
pub mod version_check;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::Action;
pub use app::App;
pub use config::{DEFAULT_PORT, Settings};
pub use error::UpdateError;
pub use orchestrator::{RunHandle, RunPhase, UpdateOrchestrator};
pub use reconcile::{Keyed, KeyedList, ListChange, ReconcileError, reconcile};
pub use reducer::reduce;
pub use state::RootState;
pub use store::{StateChange, StateStream, StateWatchStream, Store, SubscriptionId};
pub use updater::{AppUpdater, ProgressReporter, UpdateRequest, Updater, VersionInfo};
pub use version_check::{VersionCheckOutcome, VersionChecker};
pub use view::{CommandState, DisplayModel, MainView, ServerItem, project};

// Re-export model types at the crate root for ergonomics.
pub use model::{RunId, Server, ServerId, ServerStatus, UpdateMode, UpdateOutcome};
