//! Staff Role Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 员工角色 (由外部认证层提供)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Admin,
    Waiter,
    Chef,
    Cashier,
}

impl StaffRole {
    pub const ALL: [StaffRole; 4] = [
        StaffRole::Admin,
        StaffRole::Waiter,
        StaffRole::Chef,
        StaffRole::Cashier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "ADMIN",
            StaffRole::Waiter => "WAITER",
            StaffRole::Chef => "CHEF",
            StaffRole::Cashier => "CASHIER",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown staff role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for StaffRole {
    type Err = UnknownRole;

    /// Case-insensitive: the auth layer is not consistent about casing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(StaffRole::Admin),
            "WAITER" => Ok(StaffRole::Waiter),
            "CHEF" => Ok(StaffRole::Chef),
            "CASHIER" => Ok(StaffRole::Cashier),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("waiter".parse::<StaffRole>(), Ok(StaffRole::Waiter));
        assert_eq!(" Chef ".parse::<StaffRole>(), Ok(StaffRole::Chef));
        assert!("authenticated".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_serde_screaming_case() {
        let json = serde_json::to_string(&StaffRole::Cashier).unwrap();
        assert_eq!(json, "\"CASHIER\"");
        let role: StaffRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, StaffRole::Admin);
    }
}
