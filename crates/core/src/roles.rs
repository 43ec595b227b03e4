//! Role hierarchy and permission check.
//!
//! Roles form a strict total order `user < operator < admin`. Role strings
//! that do not name a known role (e.g. a hand-edited database row carried into
//! a token) rank below every known role, so they are denied everywhere.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ParseEnumError;

pub const ROLE_USER: &str = "user";
pub const ROLE_OPERATOR: &str = "operator";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Operator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Operator, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => ROLE_USER,
            Role::Operator => ROLE_OPERATOR,
            Role::Admin => ROLE_ADMIN,
        }
    }

    /// Position in the hierarchy. Zero is reserved for unrecognised roles.
    pub fn rank(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Operator => 2,
            Role::Admin => 3,
        }
    }

    /// `true` iff this role ranks at or above `required`.
    pub fn has_permission(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_USER => Ok(Role::User),
            ROLE_OPERATOR => Ok(Role::Operator),
            ROLE_ADMIN => Ok(Role::Admin),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// Rank of a raw role string; unknown strings rank 0.
pub fn rank_of(role: &str) -> u8 {
    role.parse::<Role>().map(Role::rank).unwrap_or(0)
}

/// Permission check over a raw role string as carried in an access token.
pub fn permits(actual: &str, required: Role) -> bool {
    rank_of(actual) >= required.rank()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_table() {
        // (actual, required, expected)
        let cases = [
            (Role::User, Role::User, true),
            (Role::User, Role::Operator, false),
            (Role::User, Role::Admin, false),
            (Role::Operator, Role::User, true),
            (Role::Operator, Role::Operator, true),
            (Role::Operator, Role::Admin, false),
            (Role::Admin, Role::User, true),
            (Role::Admin, Role::Operator, true),
            (Role::Admin, Role::Admin, true),
        ];
        for (actual, required, expected) in cases {
            assert_eq!(
                actual.has_permission(required),
                expected,
                "{actual}.has_permission({required})"
            );
            assert_eq!(permits(actual.as_str(), required), expected);
        }
    }

    #[test]
    fn unknown_role_is_denied_everywhere() {
        for required in Role::ALL {
            assert!(!permits("superuser", required));
            assert!(!permits("", required));
            assert!(!permits("Admin", required), "role names are case-sensitive");
        }
        assert_eq!(rank_of("root"), 0);
    }

    #[test]
    fn parse_and_display_agree() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        let err = "owner".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role: \"owner\"");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Role::Operator).unwrap();
        assert_eq!(json, "\"operator\"");
    }
}
