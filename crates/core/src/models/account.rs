//! Test identities

use crate::types::Language;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Username / password pair
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// An authenticated identity used by both the fetcher and the UI driver.
///
/// Fresh accounts are never deleted from the backend; they are recorded
/// in the ledger with a cleanup tag instead.
#[derive(Clone, Serialize, Deserialize)]
pub struct TestAccount {
    pub username: String,
    pub password: String,
    pub user_id: i64,
    pub token: String,
    pub language: Language,
    /// Shared seeded account (read-only checks only)
    pub seeded: bool,
}

impl TestAccount {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

impl fmt::Debug for TestAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestAccount")
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("language", &self.language)
            .field("seeded", &self.seeded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_secrets() {
        let account = TestAccount {
            username: "qa12345678".into(),
            password: "s3cretPass".into(),
            user_id: 42,
            token: "tok-abc".into(),
            language: Language::Ms,
            seeded: false,
        };
        let dbg = format!("{:?} {:?}", account, account.credentials());
        assert!(dbg.contains("qa12345678"));
        assert!(!dbg.contains("s3cretPass"));
        assert!(!dbg.contains("tok-abc"));
    }
}
