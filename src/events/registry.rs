//! Emoji → handler wiring, built once at startup from config and
//! carried in [`crate::Data`]; the dispatcher owns no global state.

use std::collections::HashMap;

use crate::config::Config;

/// The reaction-driven features the dispatcher can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    /// Submit the reacted-to message as a daily-question candidate.
    Question,
    /// Approval vote in one of the two moderation queues.
    Approve,
    /// Rejection vote in the question queue.
    Reject,
    /// Flag a message for containing an incorrect word.
    ReportWord,
    /// Starboard star.
    Star,
}

#[derive(Debug, Clone)]
pub struct ReactionEntry {
    pub kind: ReactionKind,
    pub description: &'static str,
    /// Requires the opplysar role; others are silently ignored.
    pub admin_only: bool,
    /// Also dispatched on reaction removal.
    pub handles_remove: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReactionRegistry {
    entries: HashMap<String, ReactionEntry>,
}

impl ReactionRegistry {
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::default();
        registry.register(
            config.starboard.emoji.clone(),
            ReactionEntry {
                kind: ReactionKind::Star,
                description: "Legg til ei melding på stjernebrettet",
                admin_only: false,
                handles_remove: true,
            },
        );
        registry.register(
            config.reactions.question.clone(),
            ReactionEntry {
                kind: ReactionKind::Question,
                description: "Spør eit spørsmål",
                admin_only: false,
                handles_remove: false,
            },
        );
        registry.register(
            config.reactions.report.clone(),
            ReactionEntry {
                kind: ReactionKind::ReportWord,
                description: "Rapporter eit feil ord",
                admin_only: false,
                handles_remove: false,
            },
        );
        registry.register(
            config.reactions.approve.clone(),
            ReactionEntry {
                kind: ReactionKind::Approve,
                description: "Godkjenn eit spørsmål eller ord",
                admin_only: true,
                handles_remove: false,
            },
        );
        registry.register(
            config.reactions.reject.clone(),
            ReactionEntry {
                kind: ReactionKind::Reject,
                description: "Avvis eit spørsmål eller ord",
                admin_only: true,
                handles_remove: false,
            },
        );
        registry
    }

    fn register(&mut self, emoji: String, entry: ReactionEntry) {
        self.entries.insert(emoji, entry);
    }

    pub fn get(&self, emoji: &str) -> Option<&ReactionEntry> {
        self.entries.get(emoji)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ReactionRegistry {
        let mut r = ReactionRegistry::default();
        r.register(
            "⭐".into(),
            ReactionEntry {
                kind: ReactionKind::Star,
                description: "star",
                admin_only: false,
                handles_remove: true,
            },
        );
        r.register(
            "👍".into(),
            ReactionEntry {
                kind: ReactionKind::Approve,
                description: "approve",
                admin_only: true,
                handles_remove: false,
            },
        );
        r
    }

    #[test]
    fn looks_up_registered_emojis() {
        let r = registry();
        assert_eq!(r.get("⭐").map(|e| e.kind), Some(ReactionKind::Star));
        assert_eq!(r.get("👍").map(|e| e.kind), Some(ReactionKind::Approve));
        assert!(r.get("🎉").is_none());
    }

    #[test]
    fn approve_is_admin_gated_and_star_handles_removal() {
        let r = registry();
        assert!(r.get("👍").unwrap().admin_only);
        assert!(!r.get("⭐").unwrap().admin_only);
        assert!(r.get("⭐").unwrap().handles_remove);
    }
}
