//! Ports - interfaces the domain needs from infrastructure

mod platform;
mod repositories;

pub use platform::{ChatPlatform, Clock, PlatformResult, SystemClock, ACTIVITY_SCAN};
pub use repositories::{RepoResult, SettingsRepository, TicketRepository};
