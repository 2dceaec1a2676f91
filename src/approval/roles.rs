//! Role-based capability resolution for the approval workflows.

use serenity::all::{Context as SerenityContext, GuildId, RoleId, UserId};
use tracing::warn;

use crate::config::Config;

/// What a member is allowed to approve. `Opplysar` gates question
/// approval and the first banned-word stage; `Rettskrivar` gates the
/// second banned-word stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    None,
    Opplysar,
    Rettskrivar,
    Both,
}

impl Capability {
    pub fn has_opplysar(self) -> bool {
        matches!(self, Capability::Opplysar | Capability::Both)
    }

    pub fn has_rettskrivar(self) -> bool {
        matches!(self, Capability::Rettskrivar | Capability::Both)
    }
}

/// Intersect a member's role list against the two configured role IDs.
/// An unconfigured role ID never matches.
pub fn capability_from_roles(
    member_roles: &[RoleId],
    opplysar_role: Option<RoleId>,
    rettskrivar_role: Option<RoleId>,
) -> Capability {
    let has_opplysar = opplysar_role.is_some_and(|id| member_roles.contains(&id));
    let has_rettskrivar = rettskrivar_role.is_some_and(|id| member_roles.contains(&id));

    match (has_opplysar, has_rettskrivar) {
        (true, true) => Capability::Both,
        (true, false) => Capability::Opplysar,
        (false, true) => Capability::Rettskrivar,
        (false, false) => Capability::None,
    }
}

/// Fetch the member and resolve their capability. A failed lookup
/// resolves to `None`: a resolver failure must never count as approval.
pub async fn resolve_capability(
    ctx: &SerenityContext,
    config: &Config,
    guild_id: GuildId,
    user_id: UserId,
) -> Capability {
    let member = match guild_id.member(&ctx.http, user_id).await {
        Ok(member) => member,
        Err(e) => {
            warn!(guild = %guild_id, user = %user_id, error = %e, "Member lookup failed, resolving to no capability");
            return Capability::None;
        }
    };

    capability_from_roles(
        &member.roles,
        config.approval.opplysar_role_id,
        config.banned_words.rettskrivar_role_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPPLYSAR: RoleId = RoleId::new(100);
    const RETTSKRIVAR: RoleId = RoleId::new(200);

    fn resolve(roles: &[u64]) -> Capability {
        let roles: Vec<RoleId> = roles.iter().map(|&id| RoleId::new(id)).collect();
        capability_from_roles(&roles, Some(OPPLYSAR), Some(RETTSKRIVAR))
    }

    #[test]
    fn resolves_single_and_combined_capabilities() {
        assert_eq!(resolve(&[]), Capability::None);
        assert_eq!(resolve(&[1, 2, 3]), Capability::None);
        assert_eq!(resolve(&[100]), Capability::Opplysar);
        assert_eq!(resolve(&[200]), Capability::Rettskrivar);
        assert_eq!(resolve(&[1, 100, 200]), Capability::Both);
    }

    #[test]
    fn unconfigured_roles_never_match() {
        let roles = vec![RoleId::new(100), RoleId::new(200)];
        assert_eq!(capability_from_roles(&roles, None, None), Capability::None);
        assert_eq!(
            capability_from_roles(&roles, Some(OPPLYSAR), None),
            Capability::Opplysar
        );
    }

    #[test]
    fn capability_predicates() {
        assert!(Capability::Both.has_opplysar());
        assert!(Capability::Both.has_rettskrivar());
        assert!(Capability::Opplysar.has_opplysar());
        assert!(!Capability::Opplysar.has_rettskrivar());
        assert!(!Capability::None.has_opplysar());
    }
}
