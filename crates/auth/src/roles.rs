use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tenantgate_core::DomainError;

/// Role tag of a principal within its tenant.
///
/// The four roles form a total order, highest first:
/// `owner > admin > supervisor > operator`. [`Role::rank`] is the single rank
/// table; ordering and dominance are both derived from it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Supervisor,
    #[serde(alias = "operador")]
    Operator,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Admin, Role::Supervisor, Role::Operator];

    pub const fn rank(self) -> u8 {
        match self {
            Role::Owner => 4,
            Role::Admin => 3,
            Role::Supervisor => 2,
            Role::Operator => 1,
        }
    }

    /// `true` iff `self` is at least as privileged as `need`.
    pub const fn dominates(self, need: Role) -> bool {
        self.rank() >= need.rank()
    }

    /// Roles that can be granted through an invitation or a role update.
    /// `owner` is only ever obtained by registering a company.
    pub const fn is_assignable(self) -> bool {
        !matches!(self, Role::Owner)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Operator => "operator",
        }
    }
}

/// Free-function form of [`Role::dominates`].
pub const fn dominates(have: Role, need: Role) -> bool {
    have.dominates(need)
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "supervisor" => Ok(Role::Supervisor),
            // legacy storage tag
            "operator" | "operador" => Ok(Role::Operator),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    #[test]
    fn hierarchy_matches_fixed_ranking() {
        assert!(dominates(Role::Owner, Role::Admin));
        assert!(dominates(Role::Admin, Role::Supervisor));
        assert!(dominates(Role::Supervisor, Role::Operator));
        assert!(!dominates(Role::Operator, Role::Supervisor));
        assert!(!dominates(Role::Admin, Role::Owner));
    }

    #[test]
    fn owner_is_not_assignable() {
        let assignable: Vec<_> = Role::ALL.into_iter().filter(|r| r.is_assignable()).collect();
        assert_eq!(assignable, vec![Role::Admin, Role::Supervisor, Role::Operator]);
    }

    #[test]
    fn parses_canonical_and_legacy_tags() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("operador".parse::<Role>().unwrap(), Role::Operator);
        assert!("superuser".parse::<Role>().is_err());

        let legacy: Role = serde_json::from_str("\"operador\"").unwrap();
        assert_eq!(legacy, Role::Operator);
        assert_eq!(serde_json::to_string(&legacy).unwrap(), "\"operator\"");
    }

    proptest! {
        #[test]
        fn dominance_follows_rank(a in any_role(), b in any_role()) {
            prop_assert_eq!(dominates(a, b), a.rank() >= b.rank());
        }

        #[test]
        fn dominance_is_reflexive(r in any_role()) {
            prop_assert!(dominates(r, r));
        }

        #[test]
        fn every_pair_is_comparable(a in any_role(), b in any_role()) {
            prop_assert!(dominates(a, b) || dominates(b, a));
        }

        #[test]
        fn dominance_is_transitive(a in any_role(), b in any_role(), c in any_role()) {
            if dominates(a, b) && dominates(b, c) {
                prop_assert!(dominates(a, c));
            }
        }

        #[test]
        fn display_parses_back(r in any_role()) {
            prop_assert_eq!(r.to_string().parse::<Role>().unwrap(), r);
        }
    }
}
