//! Admin accounts

use digipath_common::api::{verify_password, verify_unknown_account};
use digipath_common::models::AdminUser;
use digipath_common::Error;
use sqlx::Row;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{rows, Result, Store};

const BAD_CREDENTIALS: &str = "Invalid email or password";

impl Store {
    /// Check email and password, returning the account on success
    ///
    /// Unknown email and wrong password fail identically, and both pay for
    /// one Argon2 verification.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AdminUser> {
        let row = sqlx::query("SELECT * FROM admin_users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            debug!("Login attempt for unknown account");
            let password = password.to_string();
            tokio::task::spawn_blocking(move || verify_unknown_account(&password))
                .await
                .map_err(|e| Error::Internal(format!("Password check panicked: {}", e)))?;
            return Err(Error::Unauthorized(BAD_CREDENTIALS.to_string()));
        };

        let admin = rows::admin(&row)?;
        let stored_hash: String = row.try_get("password_hash")?;
        let password = password.to_string();

        // CPU-bound, run off the async workers
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| Error::Internal(format!("Password check panicked: {}", e)))?;

        if !valid {
            warn!("Failed login for {}", admin.email);
            return Err(Error::Unauthorized(BAD_CREDENTIALS.to_string()));
        }
        Ok(admin)
    }

    pub async fn find_admin(&self, id: Uuid) -> Result<Option<AdminUser>> {
        sqlx::query("SELECT * FROM admin_users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| rows::admin(&row))
            .transpose()
    }
}
