//! Agent card provider — extension hook for card discovery.
//!
//! The public card is served unauthenticated; the extended card (when
//! configured) may demand that the host HTTP layer authenticated the
//! caller first.

use async_trait::async_trait;

use crate::error::{A2AError, A2AResult};
use crate::types::AgentCard;

/// Source of the agent's public and extended cards.
#[async_trait]
pub trait CardProvider: Send + Sync {
    /// The public agent card.
    async fn card(&self) -> A2AResult<AgentCard>;

    /// The extended agent card, when one is configured.
    ///
    /// `authenticated` reflects the host HTTP layer's verdict for this
    /// request; providers may reject unauthenticated access.
    async fn extended_card(&self, authenticated: bool) -> A2AResult<AgentCard>;
}

/// A provider serving fixed cards from memory.
pub struct StaticCardProvider {
    card: AgentCard,
    extended: Option<AgentCard>,
    require_auth_for_extended: bool,
}

impl StaticCardProvider {
    /// A provider with only a public card.
    pub fn new(card: AgentCard) -> Self {
        Self {
            card,
            extended: None,
            require_auth_for_extended: false,
        }
    }

    /// Attach an extended card.
    pub fn with_extended_card(mut self, extended: AgentCard, require_auth: bool) -> Self {
        self.extended = Some(extended);
        self.require_auth_for_extended = require_auth;
        self
    }
}

#[async_trait]
impl CardProvider for StaticCardProvider {
    async fn card(&self) -> A2AResult<AgentCard> {
        Ok(self.card.clone())
    }

    async fn extended_card(&self, authenticated: bool) -> A2AResult<AgentCard> {
        let Some(extended) = &self.extended else {
            return Err(A2AError::extended_agent_card_not_configured(
                "no extended agent card is configured",
            ));
        };
        if self.require_auth_for_extended && !authenticated {
            return Err(A2AError::authentication_required(
                "the extended agent card requires authentication",
            ));
        }
        Ok(extended.clone())
    }
}
