//! Interaction dispatcher
//!
//! Entry point for forwarded platform interactions. Parses custom ids,
//! enforces interaction expiry, routes to the controller and setup service,
//! and turns user-facing refusals into ephemeral replies.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use ticket_core::{DomainError, Snowflake, TicketType};

use crate::dto::{
    ButtonInteraction, CommandInteraction, Interaction, InteractionReply, ModalField,
    ModalSubmitInteraction, PanelResponse, SelectInteraction, SettingsResponse,
};

use super::error::{ServiceError, ServiceResult};
use super::interactions::{CustomId, InteractionKind};
use super::lifecycle::{ClaimOutcome, CloseOutcome, LifecycleController, NewTicket};
use super::setup::SetupService;

/// Name of the setup slash command
pub const SETUP_COMMAND: &str = "ticket-setup";

pub struct InteractionDispatcher {
    controller: Arc<LifecycleController>,
    setup: SetupService,
}

impl InteractionDispatcher {
    pub fn new(controller: Arc<LifecycleController>) -> Self {
        let setup = SetupService::new(controller.context().clone());
        Self { controller, setup }
    }

    pub fn controller(&self) -> &Arc<LifecycleController> {
        &self.controller
    }

    pub fn setup(&self) -> &SetupService {
        &self.setup
    }

    /// Handle one interaction
    ///
    /// Rejections come back as `Ok` ephemeral replies; anything else that
    /// fails is returned as an error for the transport to map.
    #[instrument(skip(self, interaction), fields(kind = interaction.kind(), user_id = %interaction.user_id()))]
    pub async fn dispatch(&self, interaction: Interaction) -> ServiceResult<InteractionReply> {
        match self.route(interaction).await {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_rejection() => {
                debug!(error = %e, "Interaction rejected");
                Ok(InteractionReply::ephemeral(e.user_message()))
            }
            Err(e) => {
                warn!(error = %e, "Interaction failed");
                Err(e)
            }
        }
    }

    async fn route(&self, interaction: Interaction) -> ServiceResult<InteractionReply> {
        self.check_fresh(&interaction)?;

        match interaction {
            Interaction::Command(command) => self.on_command(command).await,
            Interaction::Select(select) => self.on_select(select).await,
            Interaction::ModalSubmit(modal) => self.on_details(modal).await,
            Interaction::Button(button) => self.on_button(button).await,
        }
    }

    /// Reject interactions older than the interaction timeout
    fn check_fresh(&self, interaction: &Interaction) -> ServiceResult<()> {
        let ctx = self.controller.context();
        match interaction.issued_at() {
            Some(issued_at) if ctx.now() - issued_at > ctx.interaction_timeout() => {
                Err(DomainError::InteractionExpired.into())
            }
            _ => Ok(()),
        }
    }

    async fn on_command(&self, command: CommandInteraction) -> ServiceResult<InteractionReply> {
        if command.name != SETUP_COMMAND {
            return Err(DomainError::UnknownInteraction(command.name).into());
        }

        let settings = self
            .setup
            .configure(
                command.guild_id,
                command.user_id,
                command.member_permissions,
                command.options,
            )
            .await?;

        Ok(InteractionReply::Setup {
            content: "✅ Ticket system has been set up!".to_string(),
            settings: SettingsResponse::from(&settings),
            panel: PanelResponse::ticket_panel(CustomId::Create.to_string()),
        })
    }

    async fn on_select(&self, select: SelectInteraction) -> ServiceResult<InteractionReply> {
        if select.custom_id.parse::<CustomId>()? != CustomId::Create {
            return Err(DomainError::UnknownInteraction(select.custom_id).into());
        }
        let ticket_type: TicketType = select
            .values
            .first()
            .ok_or_else(|| ServiceError::validation("No ticket type selected"))?
            .parse()?;

        self.controller
            .ensure_no_open_ticket(select.guild_id, select.user_id)
            .await?;

        if ticket_type.requires_details() {
            self.setup
                .remember_selection(select.guild_id, select.user_id, ticket_type);
            return Ok(InteractionReply::Modal {
                custom_id: CustomId::Details(ticket_type).to_string(),
                title: format!("{} Details", ticket_type.title()),
                fields: ModalField::details_form(ticket_type),
            });
        }

        self.open(NewTicket {
            guild_id: select.guild_id,
            user_id: select.user_id,
            username: select.username,
            ticket_type,
            reason: None,
            description: None,
        })
        .await
    }

    async fn on_details(&self, modal: ModalSubmitInteraction) -> ServiceResult<InteractionReply> {
        let CustomId::Details(ticket_type) = modal.custom_id.parse::<CustomId>()? else {
            return Err(DomainError::UnknownInteraction(modal.custom_id).into());
        };
        let details = modal.details();

        self.setup
            .take_selection(modal.guild_id, modal.user_id, ticket_type)?;

        self.open(NewTicket {
            guild_id: modal.guild_id,
            user_id: modal.user_id,
            username: modal.username,
            ticket_type,
            reason: Some(details.reason),
            description: Some(details.description),
        })
        .await
    }

    async fn open(&self, request: NewTicket) -> ServiceResult<InteractionReply> {
        let ticket_type = request.ticket_type;
        let ticket = self.controller.create(request).await?;
        Ok(InteractionReply::ephemeral(format!(
            "✅ {} ticket created: {}",
            ticket_type.title(),
            ticket.id.mention_channel()
        )))
    }

    async fn on_button(&self, button: ButtonInteraction) -> ServiceResult<InteractionReply> {
        let custom_id = button.custom_id.parse::<CustomId>()?;

        match custom_id {
            CustomId::Claim(ticket_id) => {
                self.check_route(InteractionKind::Claim, ticket_id, button.user_id)?;
                match self.controller.claim(ticket_id, button.user_id).await? {
                    ClaimOutcome::Claimed(_) => {
                        Ok(InteractionReply::ephemeral("✅ You have claimed this ticket"))
                    }
                    ClaimOutcome::AlreadyClaimed(ticket) => {
                        let by = ticket
                            .claimed_by
                            .map(|id| id.mention_user())
                            .unwrap_or_else(|| "someone else".to_string());
                        Ok(InteractionReply::ephemeral(format!(
                            "ℹ️ This ticket has already been claimed by {by}"
                        )))
                    }
                }
            }
            CustomId::Close(ticket_id) => {
                self.check_route(InteractionKind::Close, ticket_id, button.user_id)?;
                match self
                    .controller
                    .close(ticket_id, button.user_id, false)
                    .await?
                {
                    CloseOutcome::Closed(_) => {
                        Ok(InteractionReply::ephemeral("✅ Ticket closed successfully"))
                    }
                    CloseOutcome::AlreadyClosed(_) => {
                        Ok(InteractionReply::ephemeral("ℹ️ This ticket is already closed"))
                    }
                }
            }
            CustomId::Feedback(ticket_id, rating) => {
                let comment = button.feedback().comment;
                self.controller
                    .submit_feedback(ticket_id, button.user_id, rating, comment)
                    .await?;
                Ok(InteractionReply::ephemeral(format!(
                    "Thank you for your {} star feedback!",
                    rating.value()
                )))
            }
            CustomId::Create | CustomId::Details(_) => {
                Err(DomainError::UnknownInteraction(button.custom_id).into())
            }
        }
    }

    /// Registry lookup for claim and close buttons
    ///
    /// A missing key defers to the store, which rejects terminal or unknown
    /// tickets itself.
    fn check_route(
        &self,
        kind: InteractionKind,
        ticket_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<()> {
        let now = self.controller.context().now();
        match self
            .controller
            .interactions()
            .resolve(kind, ticket_id, user_id, now)
        {
            Ok(_) | Err(DomainError::UnknownInteraction(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
