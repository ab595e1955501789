//! Login accounts.
//!
//! An account is a person who can sign in on behalf of an owner. The account
//! that registers a business becomes its `owner`; further accounts (managers,
//! staff) are attached to the same owner id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salonbook_core::{DomainError, DomainResult, OwnerId, UserId};

use crate::{password, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub owner_id: OwnerId,
    /// Lowercased; unique across all owners.
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

impl Account {
    /// Register a new business: fresh owner id, `owner` role.
    pub fn register(input: NewAccount, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::for_owner(OwnerId::new(), input, vec![Role::OWNER], now)
    }

    /// Create an account attached to an existing owner.
    pub fn for_owner(
        owner_id: OwnerId,
        input: NewAccount,
        roles: Vec<Role>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let email = normalize_email(&input.email)?;
        let password_hash = password::hash_password(&input.password)
            .map_err(|e| DomainError::validation(e.to_string()))?;
        let display_name = input
            .display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Ok(Self {
            id: UserId::new(),
            owner_id,
            email,
            display_name,
            password_hash,
            roles,
            status: AccountStatus::Active,
            created_at: now,
        })
    }

    pub fn can_sign_in(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        self.can_sign_in() && password::verify_password(candidate, &self.password_hash)
    }
}

pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(DomainError::validation("email is not valid")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "hunter2hunter2".to_string(),
            display_name: None,
        }
    }

    #[test]
    fn register_creates_owner_account() {
        let acc = Account::register(input("  Mai@Salon.VN "), Utc::now()).unwrap();
        assert_eq!(acc.email, "mai@salon.vn");
        assert_eq!(acc.display_name, "mai");
        assert_eq!(acc.roles, vec![Role::OWNER]);
        assert!(acc.check_password("hunter2hunter2"));
        assert!(!acc.check_password("nope-nope"));
    }

    #[test]
    fn suspended_accounts_cannot_sign_in() {
        let mut acc = Account::register(input("a@b.co"), Utc::now()).unwrap();
        acc.status = AccountStatus::Suspended;
        assert!(!acc.check_password("hunter2hunter2"));
    }

    #[test]
    fn rejects_bad_email() {
        assert!(Account::register(input("no-at-sign"), Utc::now()).is_err());
        assert!(Account::register(input("x@localhost"), Utc::now()).is_err());
    }
}
