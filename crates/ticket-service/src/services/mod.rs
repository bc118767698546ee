//! Business logic services
//!
//! The `LifecycleController` owns every ticket state transition. Watchers,
//! the archiver and the feedback collector are driven by it; the dispatcher
//! translates platform interactions into controller calls.

pub mod context;
pub mod dispatch;
pub mod error;
pub mod feedback;
pub mod interactions;
pub mod lifecycle;
pub mod notices;
pub mod setup;
pub mod transcript;
pub mod watcher;

// Re-export all services for convenience
pub use context::{ServiceContext, ServiceContextBuilder};
pub use dispatch::InteractionDispatcher;
pub use error::{ServiceError, ServiceResult};
pub use feedback::FeedbackCollector;
pub use interactions::{CustomId, InteractionKind, InteractionRegistry, Registration};
pub use lifecycle::{ClaimOutcome, CloseOutcome, LifecycleController, NewTicket};
pub use setup::SetupService;
pub use transcript::{format_duration, render_transcript, Transcript, TranscriptArchiver};
pub use watcher::{evaluate, WatchDecision, WatchThresholds, WatcherRegistry};
