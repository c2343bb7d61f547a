//! SQLite-backed account persistence

use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::Account;

/// Account store, keyed by email
pub struct AccountStore {
    conn: Arc<Mutex<Connection>>,
}

impl AccountStore {
    /// Open (or create) the database at `path` and initialize the schema
    pub fn open(path: &str) -> SqliteResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> SqliteResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SqliteResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();

        // email is the primary key: the UNIQUE constraint, not the engine's
        // pre-check, is what makes concurrent registration safe.
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                email TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                fullname TEXT,
                avatar TEXT,
                dob TEXT,
                is_verified INTEGER NOT NULL DEFAULT 0,
                verification_code TEXT,
                verification_code_expires_at TEXT,
                password_reset_token TEXT,
                password_reset_token_expires_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Insert a new account. Fails with a constraint violation if the email
    /// is already registered; see [`is_unique_violation`].
    pub fn insert(&self, account: &Account) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO accounts (email, password_hash, fullname, avatar, dob, is_verified,
                                   verification_code, verification_code_expires_at,
                                   password_reset_token, password_reset_token_expires_at,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                account.email,
                account.password_hash,
                account.fullname,
                account.avatar,
                account.dob,
                account.is_verified as i32,
                account.verification_code,
                account.verification_code_expires_at,
                account.password_reset_token,
                account.password_reset_token_expires_at,
                account.created_at,
                account.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Find account by email
    pub fn find_by_email(&self, email: &str) -> SqliteResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT email, password_hash, fullname, avatar, dob, is_verified,
                    verification_code, verification_code_expires_at,
                    password_reset_token, password_reset_token_expires_at,
                    created_at, updated_at
             FROM accounts WHERE email = ?1",
        )?;

        let mut rows = stmt.query(params![email])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Account {
                email: row.get(0)?,
                password_hash: row.get(1)?,
                fullname: row.get(2)?,
                avatar: row.get(3)?,
                dob: row.get(4)?,
                is_verified: row.get::<_, i32>(5)? != 0,
                verification_code: row.get(6)?,
                verification_code_expires_at: row.get(7)?,
                password_reset_token: row.get(8)?,
                password_reset_token_expires_at: row.get(9)?,
                created_at: row.get(10)?,
                updated_at: row.get(11)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Flip the account to verified and clear the pending code pair
    pub fn mark_verified(&self, email: &str) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE accounts
             SET is_verified = 1,
                 verification_code = NULL,
                 verification_code_expires_at = NULL,
                 updated_at = ?1
             WHERE email = ?2",
            params![now, email],
        )?;
        Ok(())
    }

    /// Store a pending password-reset token and its expiry
    pub fn set_reset_token(&self, email: &str, token: &str, expires_at: &str) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE accounts
             SET password_reset_token = ?1,
                 password_reset_token_expires_at = ?2,
                 updated_at = ?3
             WHERE email = ?4",
            params![token, expires_at, now, email],
        )?;
        Ok(())
    }

    /// Replace the password hash and clear the reset-token pair
    pub fn update_password(&self, email: &str, password_hash: &str) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE accounts
             SET password_hash = ?1,
                 password_reset_token = NULL,
                 password_reset_token_expires_at = NULL,
                 updated_at = ?2
             WHERE email = ?3",
            params![password_hash, now, email],
        )?;
        Ok(())
    }

    /// Backdate or adjust a pending verification code's expiry (test hook)
    #[cfg(test)]
    pub(crate) fn set_verification_expiry(
        &self,
        email: &str,
        expires_at: &str,
    ) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE accounts SET verification_code_expires_at = ?1 WHERE email = ?2",
            params![expires_at, email],
        )?;
        Ok(())
    }

    /// Number of stored accounts (for tests and health reporting)
    pub fn count(&self) -> SqliteResult<u64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))
    }
}

impl Clone for AccountStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// True when an insert failed because the email is already registered
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str) -> Account {
        let now = chrono::Utc::now().to_rfc3339();
        Account {
            email: email.to_string(),
            password_hash: "hash123".to_string(),
            fullname: Some("Test User".to_string()),
            avatar: None,
            dob: None,
            is_verified: false,
            verification_code: Some("482913".to_string()),
            verification_code_expires_at: Some(now.clone()),
            password_reset_token: None,
            password_reset_token_expires_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let store = AccountStore::in_memory().unwrap();
        store.insert(&account("test@example.com")).unwrap();

        let found = store.find_by_email("test@example.com").unwrap().unwrap();
        assert_eq!(found.fullname.as_deref(), Some("Test User"));
        assert!(!found.is_verified);
        assert_eq!(found.verification_code.as_deref(), Some("482913"));

        assert!(store.find_by_email("other@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_a_constraint_violation() {
        let store = AccountStore::in_memory().unwrap();
        store.insert(&account("dup@example.com")).unwrap();

        let err = store.insert(&account("dup@example.com")).unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_mark_verified_clears_code_pair() {
        let store = AccountStore::in_memory().unwrap();
        store.insert(&account("verify@example.com")).unwrap();
        store.mark_verified("verify@example.com").unwrap();

        let found = store.find_by_email("verify@example.com").unwrap().unwrap();
        assert!(found.is_verified);
        assert!(found.verification_code.is_none());
        assert!(found.verification_code_expires_at.is_none());
    }

    #[test]
    fn test_update_password_clears_reset_pair() {
        let store = AccountStore::in_memory().unwrap();
        store.insert(&account("reset@example.com")).unwrap();
        store
            .set_reset_token("reset@example.com", "tok", "2099-01-01T00:00:00+00:00")
            .unwrap();

        let found = store.find_by_email("reset@example.com").unwrap().unwrap();
        assert_eq!(found.password_reset_token.as_deref(), Some("tok"));

        store.update_password("reset@example.com", "newhash").unwrap();
        let found = store.find_by_email("reset@example.com").unwrap().unwrap();
        assert_eq!(found.password_hash, "newhash");
        assert!(found.password_reset_token.is_none());
        assert!(found.password_reset_token_expires_at.is_none());
    }

    #[test]
    fn test_updates_touch_updated_at() {
        let store = AccountStore::in_memory().unwrap();
        let mut initial = account("touch@example.com");
        initial.updated_at = "2000-01-01T00:00:00+00:00".to_string();
        store.insert(&initial).unwrap();

        store.mark_verified("touch@example.com").unwrap();
        let found = store.find_by_email("touch@example.com").unwrap().unwrap();
        assert_ne!(found.updated_at, initial.updated_at);
    }
}
