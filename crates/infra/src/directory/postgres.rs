//! Postgres-backed directory.
//!
//! Expected schema (migrations are owned elsewhere):
//!
//! ```sql
//! companies(id uuid pk, name text, slug text unique, email text null, domain text null,
//!           logo_url text null, is_active bool, created_at timestamptz, updated_at timestamptz)
//! user_profiles(id uuid pk, email text, first_name text null, last_name text null,
//!               avatar_url text null, role text, company_id uuid null references companies,
//!               is_active bool, last_login_at timestamptz null, created_at timestamptz)
//! user_invitations(id uuid pk, company_id uuid references companies, invited_by uuid,
//!                  email text, role text, invitation_token text unique, message text null,
//!                  created_at timestamptz, expires_at timestamptz, accepted_at timestamptz null)
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |---|---|
//! | Database, unique violation (`23505`) | `Conflict` |
//! | Database, foreign key / check violation | `Integrity` |
//! | Row decoding failures | `Integrity` |
//! | Everything else (pool, I/O, TLS) | `Unavailable` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use tenantgate_auth::ports::{InvitationStore, ProfileStore, StoreError, TenantStore};
use tenantgate_auth::{
    Company, CompanyPatch, Invitation, InvitationToken, MemberUpdate, ProfilePatch, Role,
    UserProfile,
};
use tenantgate_core::{EmailAddress, InvitationId, Slug, TenantId, UserId};

const PROFILE_COLUMNS: &str = "id, email, first_name, last_name, avatar_url, role, company_id, \
     is_active, last_login_at, created_at";
const COMPANY_COLUMNS: &str =
    "id, name, slug, email, domain, logo_url, is_active, created_at, updated_at";
const INVITATION_COLUMNS: &str = "id, company_id, invited_by, email, role, invitation_token, \
     message, created_at, expires_at, accepted_at";

/// Profiles, companies and invitations in one Postgres database.
///
/// Conditional writes run as single conditional statements or inside one
/// transaction, so concurrent requests observe them atomically.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: Arc<PgPool>,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect with the default pool settings.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    async fn begin(&self, operation: &str) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl ProfileStore for PostgresDirectory {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn profile(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("profile", e))?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn active_member_by_email(
        &self,
        tenant_id: TenantId,
        email: &EmailAddress,
    ) -> Result<Option<UserProfile>, StoreError> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles \
             WHERE company_id = $1 AND lower(email) = $2 AND is_active LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(email.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("active_member_by_email", e))?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn members(&self, tenant_id: TenantId) -> Result<Vec<UserProfile>, StoreError> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles \
             WHERE company_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("members", e))?;
        rows.iter().map(profile_from_row).collect()
    }

    async fn update_details(
        &self,
        id: UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<UserProfile>, StoreError> {
        let (set_avatar, avatar) = split_nullable(&patch.avatar_url);
        let sql = format!(
            "UPDATE user_profiles SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                avatar_url = CASE WHEN $4 THEN $5 ELSE avatar_url END \
             WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(patch.first_name.as_deref())
            .bind(patch.last_name.as_deref())
            .bind(set_avatar)
            .bind(avatar)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_details", e))?;
        row.as_ref().map(profile_from_row).transpose()
    }

    #[instrument(skip(self, update), fields(user_id = %id, tenant_id = %tenant_id), err)]
    async fn update_membership(
        &self,
        id: UserId,
        tenant_id: TenantId,
        update: &MemberUpdate,
    ) -> Result<Option<UserProfile>, StoreError> {
        let sql = format!(
            "UPDATE user_profiles SET \
                role = COALESCE($3, role), \
                is_active = COALESCE($4, is_active) \
             WHERE id = $1 AND company_id = $2 RETURNING {PROFILE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .bind(update.role.as_ref().map(Role::as_str))
            .bind(update.is_active)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_membership", e))?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE user_profiles SET last_login_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("record_login", e))?;
        Ok(())
    }
}

#[async_trait]
impl TenantStore for PostgresDirectory {
    async fn company(&self, id: TenantId) -> Result<Option<Company>, StoreError> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("company", e))?;
        row.as_ref().map(company_from_row).transpose()
    }

    #[instrument(skip(self, company), fields(tenant_id = %company.id, owner = %owner), err)]
    async fn create_with_owner(&self, company: Company, owner: UserId) -> Result<Company, StoreError> {
        let mut tx = self.begin("create_with_owner").await?;

        sqlx::query(
            "INSERT INTO companies (id, name, slug, email, domain, logo_url, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(company.id.as_uuid())
        .bind(&company.name)
        .bind(company.slug.as_str())
        .bind(company.email.as_deref())
        .bind(company.domain.as_deref())
        .bind(company.logo_url.as_deref())
        .bind(company.is_active)
        .bind(company.created_at)
        .bind(company.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_with_owner", e))?;

        let promoted = sqlx::query(
            "UPDATE user_profiles SET company_id = $2, role = $3, is_active = TRUE WHERE id = $1",
        )
        .bind(owner.as_uuid())
        .bind(company.id.as_uuid())
        .bind(Role::Owner.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_with_owner", e))?;

        if promoted.rows_affected() != 1 {
            // Dropping the transaction rolls the company insert back.
            return Err(StoreError::Integrity(format!("profile {owner} missing")));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_with_owner", e))?;
        Ok(company)
    }

    async fn update_company(
        &self,
        id: TenantId,
        patch: &CompanyPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Company>, StoreError> {
        let (set_email, email) = split_nullable(&patch.email);
        let (set_domain, domain) = split_nullable(&patch.domain);
        let (set_logo, logo) = split_nullable(&patch.logo_url);
        let sql = format!(
            "UPDATE companies SET \
                name = COALESCE($2, name), \
                email = CASE WHEN $3 THEN $4 ELSE email END, \
                domain = CASE WHEN $5 THEN $6 ELSE domain END, \
                logo_url = CASE WHEN $7 THEN $8 ELSE logo_url END, \
                updated_at = $9 \
             WHERE id = $1 RETURNING {COMPANY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(patch.name.as_deref())
            .bind(set_email)
            .bind(email)
            .bind(set_domain)
            .bind(domain)
            .bind(set_logo)
            .bind(logo)
            .bind(now)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_company", e))?;
        row.as_ref().map(company_from_row).transpose()
    }

    async fn set_company_active(
        &self,
        id: TenantId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Company>, StoreError> {
        let sql = format!(
            "UPDATE companies SET is_active = $2, updated_at = $3 WHERE id = $1 RETURNING {COMPANY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(active)
            .bind(now)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_company_active", e))?;
        row.as_ref().map(company_from_row).transpose()
    }
}

#[async_trait]
impl InvitationStore for PostgresDirectory {
    /// Serializes inserts per `(tenant, email)` with a transaction-scoped
    /// advisory lock, then checks for a pending row before inserting.
    #[instrument(skip(self, invitation), fields(tenant_id = %invitation.tenant_id, invitation_id = %invitation.id), err)]
    async fn insert_pending(
        &self,
        invitation: Invitation,
        now: DateTime<Utc>,
    ) -> Result<Invitation, StoreError> {
        let mut tx = self.begin("insert_pending").await?;
        let slot = format!("invite:{}:{}", invitation.tenant_id, invitation.email);

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(&slot)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_pending", e))?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_invitations \
             WHERE company_id = $1 AND lower(email) = $2 AND accepted_at IS NULL AND expires_at > $3)",
        )
        .bind(invitation.tenant_id.as_uuid())
        .bind(invitation.email.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_pending", e))?;

        if taken {
            return Err(StoreError::Conflict(format!(
                "pending invitation exists for {}",
                invitation.email
            )));
        }

        sqlx::query(
            "INSERT INTO user_invitations \
             (id, company_id, invited_by, email, role, invitation_token, message, created_at, expires_at, accepted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL)",
        )
        .bind(invitation.id.as_uuid())
        .bind(invitation.tenant_id.as_uuid())
        .bind(invitation.invited_by.as_uuid())
        .bind(invitation.email.as_str())
        .bind(invitation.role.as_str())
        .bind(invitation.token.as_str())
        .bind(invitation.message.as_deref())
        .bind(invitation.created_at)
        .bind(invitation.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_pending", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert_pending", e))?;
        Ok(invitation)
    }

    async fn invitation(&self, id: InvitationId) -> Result<Option<Invitation>, StoreError> {
        let sql = format!("SELECT {INVITATION_COLUMNS} FROM user_invitations WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("invitation", e))?;
        row.as_ref().map(invitation_from_row).transpose()
    }

    async fn invitation_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
        let sql =
            format!("SELECT {INVITATION_COLUMNS} FROM user_invitations WHERE invitation_token = $1");
        let row = sqlx::query(&sql)
            .bind(token)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("invitation_by_token", e))?;
        row.as_ref().map(invitation_from_row).transpose()
    }

    async fn pending_for_tenant(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, StoreError> {
        let sql = format!(
            "SELECT {INVITATION_COLUMNS} FROM user_invitations \
             WHERE company_id = $1 AND accepted_at IS NULL AND expires_at > $2 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(now)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("pending_for_tenant", e))?;
        rows.iter().map(invitation_from_row).collect()
    }

    /// The invitation row is claimed with a conditional update; the profile
    /// move runs in the same transaction and aborts it if the profile is gone.
    #[instrument(skip(self, token), fields(user_id = %account), err)]
    async fn accept_pending(
        &self,
        token: &str,
        account: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Invitation>, StoreError> {
        let mut tx = self.begin("accept_pending").await?;

        let sql = format!(
            "UPDATE user_invitations SET accepted_at = $2 \
             WHERE invitation_token = $1 AND accepted_at IS NULL AND expires_at > $2 \
             RETURNING {INVITATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("accept_pending", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let invitation = invitation_from_row(&row)?;

        let moved = sqlx::query(
            "UPDATE user_profiles SET company_id = $2, role = $3, is_active = TRUE WHERE id = $1",
        )
        .bind(account.as_uuid())
        .bind(invitation.tenant_id.as_uuid())
        .bind(invitation.role.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("accept_pending", e))?;

        if moved.rows_affected() != 1 {
            return Err(StoreError::Integrity(format!("profile {account} missing")));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("accept_pending", e))?;
        Ok(Some(invitation))
    }

    async fn expire(
        &self,
        id: InvitationId,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE user_invitations SET expires_at = $3 \
             WHERE id = $1 AND company_id = $2 AND accepted_at IS NULL AND expires_at > $3",
        )
        .bind(id.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("expire", e))?;
        Ok(())
    }
}

/// `Option<Option<_>>` patch field as (write it?, value), so "clear" and
/// "leave untouched" stay distinct once bound.
fn split_nullable(field: &Option<Option<String>>) -> (bool, Option<String>) {
    match field {
        Some(value) => (true, value.clone()),
        None => (false, None),
    }
}

fn profile_from_row(row: &PgRow) -> Result<UserProfile, StoreError> {
    let role: String = row.try_get("role").map_err(decode_error)?;
    let company_id: Option<uuid::Uuid> = row.try_get("company_id").map_err(decode_error)?;
    Ok(UserProfile {
        id: UserId::from_uuid(row.try_get("id").map_err(decode_error)?),
        email: row.try_get("email").map_err(decode_error)?,
        first_name: row.try_get("first_name").map_err(decode_error)?,
        last_name: row.try_get("last_name").map_err(decode_error)?,
        avatar_url: row.try_get("avatar_url").map_err(decode_error)?,
        role: parse_role(&role)?,
        tenant_id: company_id.map(TenantId::from_uuid),
        is_active: row.try_get("is_active").map_err(decode_error)?,
        last_login_at: row.try_get("last_login_at").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn company_from_row(row: &PgRow) -> Result<Company, StoreError> {
    let slug: String = row.try_get("slug").map_err(decode_error)?;
    Ok(Company {
        id: TenantId::from_uuid(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        slug: Slug::parse(&slug).map_err(|e| StoreError::Integrity(e.to_string()))?,
        email: row.try_get("email").map_err(decode_error)?,
        domain: row.try_get("domain").map_err(decode_error)?,
        logo_url: row.try_get("logo_url").map_err(decode_error)?,
        is_active: row.try_get("is_active").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    })
}

fn invitation_from_row(row: &PgRow) -> Result<Invitation, StoreError> {
    let role: String = row.try_get("role").map_err(decode_error)?;
    let email: String = row.try_get("email").map_err(decode_error)?;
    let token: String = row.try_get("invitation_token").map_err(decode_error)?;
    Ok(Invitation {
        id: InvitationId::from_uuid(row.try_get("id").map_err(decode_error)?),
        tenant_id: TenantId::from_uuid(row.try_get("company_id").map_err(decode_error)?),
        invited_by: UserId::from_uuid(row.try_get("invited_by").map_err(decode_error)?),
        email: EmailAddress::parse(&email).map_err(|e| StoreError::Integrity(e.to_string()))?,
        role: parse_role(&role)?,
        token: InvitationToken::from_string(token),
        message: row.try_get("message").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        expires_at: row.try_get("expires_at").map_err(decode_error)?,
        accepted_at: row.try_get("accepted_at").map_err(decode_error)?,
    })
}

fn parse_role(raw: &str) -> Result<Role, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Integrity(format!("unknown role tag {raw:?}")))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Integrity(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            if db_err.is_unique_violation() {
                StoreError::Conflict(msg)
            } else if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                StoreError::Integrity(msg)
            } else {
                StoreError::Unavailable(msg)
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_) => {
            StoreError::Integrity(format!("decode error in {operation}: {err}"))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_patch_fields_split_into_flag_and_value() {
        assert_eq!(split_nullable(&None), (false, None));
        assert_eq!(split_nullable(&Some(None)), (true, None));
        assert_eq!(
            split_nullable(&Some(Some("https://x.io/a.png".into()))),
            (true, Some("https://x.io/a.png".to_string()))
        );
    }

    #[test]
    fn legacy_role_tag_decodes() {
        assert_eq!(parse_role("operador").unwrap(), Role::Operator);
        assert!(matches!(parse_role("root"), Err(StoreError::Integrity(_))));
    }

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx_error("profile", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }
}
