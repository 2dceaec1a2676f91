//! Live consensus tally over approval reactions.
//!
//! The tally is recomputed from the transport's current reaction state on
//! every call, never incrementally maintained, which is what makes it
//! safe to re-run on each reaction event.

use serenity::all::{ChannelId, Context as SerenityContext, GuildId, MessageId, ReactionType, UserId};

use crate::approval::roles::{self, Capability};
use crate::config::Config;
use crate::error::Error;

/// Which capabilities the current reactors satisfy, and by whom.
/// Ephemeral: derived from reaction state, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApprovalState {
    pub opplysar_approvers: Vec<UserId>,
    pub rettskrivar_approvers: Vec<UserId>,
}

impl ApprovalState {
    /// Fold resolved reactors into the two accumulators. A `Both` member
    /// counts for both capabilities.
    pub fn from_reactors(reactors: impl IntoIterator<Item = (UserId, Capability)>) -> Self {
        let mut state = ApprovalState::default();
        for (user_id, capability) in reactors {
            if capability.has_opplysar() {
                state.opplysar_approvers.push(user_id);
            }
            if capability.has_rettskrivar() {
                state.rettskrivar_approvers.push(user_id);
            }
        }
        state
    }

    pub fn has_opplysar_approval(&self) -> bool {
        !self.opplysar_approvers.is_empty()
    }

    pub fn has_rettskrivar_approval(&self) -> bool {
        !self.rettskrivar_approvers.is_empty()
    }

    pub fn is_fully_approved(&self) -> bool {
        self.has_opplysar_approval() && self.has_rettskrivar_approval()
    }

    /// Progress lines for the approval-queue embed.
    pub fn summary(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if self.has_opplysar_approval() {
            parts.push(format!(
                "🧘‍♀️ Opplysar-godkjenning: {}",
                mention_list(&self.opplysar_approvers)
            ));
        } else {
            parts.push("⏳ Opplysar-godkjenning: ventar".to_string());
        }
        if self.has_rettskrivar_approval() {
            parts.push(format!(
                "📝 Rettskrivar-godkjenning: {}",
                mention_list(&self.rettskrivar_approvers)
            ));
        } else {
            parts.push("⏳ Rettskrivar-godkjenning: ventar".to_string());
        }
        parts.join("\n")
    }
}

fn mention_list(users: &[UserId]) -> String {
    users
        .iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Enumerate every user who attached `emoji` to the message, drop bot
/// accounts, resolve each to a capability and fold. Pure in the reaction
/// state: two calls with no intervening reactions yield identical states.
pub async fn tally(
    ctx: &SerenityContext,
    config: &Config,
    guild_id: GuildId,
    channel_id: ChannelId,
    message_id: MessageId,
    emoji: &str,
) -> Result<ApprovalState, Error> {
    let users = channel_id
        .reaction_users(
            &ctx.http,
            message_id,
            ReactionType::Unicode(emoji.to_string()),
            Some(100),
            None,
        )
        .await?;

    let mut reactors = Vec::with_capacity(users.len());
    for user in users.into_iter().filter(|u| !u.bot) {
        let capability = roles::resolve_capability(ctx, config, guild_id, user.id).await;
        reactors.push((user.id, capability));
    }

    Ok(ApprovalState::from_reactors(reactors))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u64) -> UserId {
        UserId::new(n)
    }

    #[test]
    fn partitions_reactors_by_capability() {
        let state = ApprovalState::from_reactors([
            (uid(1), Capability::Opplysar),
            (uid(2), Capability::None),
            (uid(3), Capability::Rettskrivar),
        ]);

        assert_eq!(state.opplysar_approvers, vec![uid(1)]);
        assert_eq!(state.rettskrivar_approvers, vec![uid(3)]);
        assert!(state.is_fully_approved());
    }

    #[test]
    fn single_both_reactor_satisfies_both_capabilities() {
        let state = ApprovalState::from_reactors([(uid(7), Capability::Both)]);

        assert!(state.has_opplysar_approval());
        assert!(state.has_rettskrivar_approval());
        assert!(state.is_fully_approved());
        assert_eq!(state.opplysar_approvers, vec![uid(7)]);
        assert_eq!(state.rettskrivar_approvers, vec![uid(7)]);
    }

    #[test]
    fn partial_approval_is_not_full() {
        let state = ApprovalState::from_reactors([
            (uid(1), Capability::Opplysar),
            (uid(2), Capability::Opplysar),
        ]);

        assert!(state.has_opplysar_approval());
        assert!(!state.has_rettskrivar_approval());
        assert!(!state.is_fully_approved());
    }

    #[test]
    fn recomputation_is_deterministic() {
        let reactors = [
            (uid(1), Capability::Opplysar),
            (uid(2), Capability::Both),
            (uid(3), Capability::None),
        ];

        let first = ApprovalState::from_reactors(reactors);
        let second = ApprovalState::from_reactors(reactors);
        assert_eq!(first, second);
    }

    #[test]
    fn summary_shows_waiting_and_granted_stages() {
        let partial = ApprovalState::from_reactors([(uid(5), Capability::Opplysar)]);
        let summary = partial.summary();
        assert!(summary.contains("Opplysar-godkjenning: <@5>"));
        assert!(summary.contains("Rettskrivar-godkjenning: ventar"));

        let empty = ApprovalState::default();
        assert_eq!(
            empty.summary(),
            "⏳ Opplysar-godkjenning: ventar\n⏳ Rettskrivar-godkjenning: ventar"
        );
    }
}
