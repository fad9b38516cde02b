//! Authorized role policy.
//!
//! Access is granted to guild members holding any one of a configured set of
//! role identifiers. Membership in several roles is an OR, never an AND.

use guild_gate_core::RoleId;
use std::collections::HashSet;

/// The set of guild roles that grant access to the protected backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorizedRoles {
    roles: HashSet<RoleId>,
}

impl AuthorizedRoles {
    /// Creates a policy from the given role identifiers.
    #[must_use]
    pub fn new(roles: impl IntoIterator<Item = RoleId>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }

    /// Returns true if any of the member's roles is authorized.
    #[must_use]
    pub fn permits(&self, member_roles: &[RoleId]) -> bool {
        member_roles.iter().any(|role| self.roles.contains(role))
    }

    /// Returns true if no role is authorized, which denies everyone.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns the number of authorized roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Iterates over the authorized roles in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleId> {
        self.roles.iter()
    }
}

impl FromIterator<RoleId> for AuthorizedRoles {
    fn from_iter<I: IntoIterator<Item = RoleId>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: &str) -> RoleId {
        id.parse().expect("valid role id")
    }

    fn policy() -> AuthorizedRoles {
        AuthorizedRoles::new([role("933382711148695673"), role("1049504039211118652")])
    }

    #[test]
    fn empty_policy_denies_everyone() {
        let roles = AuthorizedRoles::default();
        assert!(roles.is_empty());
        assert!(!roles.permits(&[role("1")]));
    }

    #[test]
    fn single_matching_role_is_enough() {
        assert!(policy().permits(&[role("1049504039211118652")]));
    }

    #[test]
    fn matching_role_among_others() {
        let member = vec![role("1"), role("2"), role("933382711148695673"), role("3")];
        assert!(policy().permits(&member));
    }

    #[test]
    fn many_disjoint_roles_are_denied() {
        let member: Vec<RoleId> = (1..50).map(|n| role(&n.to_string())).collect();
        assert!(!policy().permits(&member));
    }

    #[test]
    fn member_without_roles_is_denied() {
        assert!(!policy().permits(&[]));
    }

    #[test]
    fn order_does_not_matter() {
        let a = vec![role("7"), role("933382711148695673")];
        let b = vec![role("933382711148695673"), role("7")];
        assert_eq!(policy().permits(&a), policy().permits(&b));
    }

    #[test]
    fn duplicate_roles_collapse() {
        let roles = AuthorizedRoles::new([role("5"), role("5")]);
        assert_eq!(roles.len(), 1);
    }
}
