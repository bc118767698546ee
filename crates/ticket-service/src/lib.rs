//! # ticket-service
//!
//! Application layer: the ticket lifecycle controller, per-ticket inactivity
//! watchers, transcript archival, feedback collection, and the interaction
//! dispatcher that routes platform events to them.

pub mod dto;
pub mod services;

pub use services::{
    ClaimOutcome, CloseOutcome, FeedbackCollector, InteractionDispatcher, InteractionRegistry,
    LifecycleController, NewTicket, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult, SetupService, TranscriptArchiver, WatcherRegistry,
};
