//! Data transfer objects for API requests and responses
//!
//! This module provides:
//! - Request DTOs with validation for forwarded interactions
//! - Response DTOs for serializing API outputs
//! - Mappers for converting domain entities to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{
    ButtonInteraction, CommandInteraction, FeedbackRequest, Interaction, ModalSubmitInteraction,
    SelectInteraction, TicketDetailsRequest, TicketSetupRequest,
};

pub use responses::{
    ApiResponse, FeedbackResponse, HealthResponse, InteractionReply, ModalField, PanelOption,
    PanelResponse, SettingsResponse, TicketResponse,
};
