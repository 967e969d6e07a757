use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use pactum_core::{
    CollaboratorRole, ContractError, ContractIndex, ContractMetadata, Invitation,
    InvitationStatus, InvitationStore, Profile, Result, UserDirectory,
};

pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS contracts (
            contract_id UUID PRIMARY KEY,
            title TEXT NOT NULL,
            creator_id TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS permissions (
            contract_id UUID NOT NULL,
            user_id TEXT NOT NULL,
            role TEXT NOT NULL,
            PRIMARY KEY (contract_id, user_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS invitations (
            invitation_id UUID PRIMARY KEY,
            contract_id UUID NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(storage_error)?;
    }
    Ok(())
}

fn storage_error(err: sqlx::Error) -> ContractError {
    ContractError::Storage(err.to_string())
}

#[derive(Clone)]
pub struct PgContractIndex {
    pool: PgPool,
}

impl PgContractIndex {
    pub fn new(pool: PgPool) -> Self {
        PgContractIndex { pool }
    }

    async fn upsert_permission(
        &self,
        contract_id: Uuid,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions (contract_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (contract_id, user_id)
            DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(contract_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl ContractIndex for PgContractIndex {
    async fn contract_created(&self, metadata: &ContractMetadata) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contracts (contract_id, title, creator_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (contract_id)
            DO UPDATE SET title = EXCLUDED.title, status = EXCLUDED.status
            "#,
        )
        .bind(metadata.id)
        .bind(&metadata.title)
        .bind(&metadata.creator_id)
        .bind(metadata.status.as_str())
        .bind(metadata.creation_date)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn contract_updated(&self, metadata: &ContractMetadata) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE contracts
            SET title = $2, status = $3
            WHERE contract_id = $1
            "#,
        )
        .bind(metadata.id)
        .bind(&metadata.title)
        .bind(metadata.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn contract_deleted(&self, contract_id: Uuid) -> Result<()> {
        for statement in [
            "DELETE FROM contracts WHERE contract_id = $1",
            "DELETE FROM permissions WHERE contract_id = $1",
            "DELETE FROM invitations WHERE contract_id = $1",
        ] {
            sqlx::query(statement)
                .bind(contract_id)
                .execute(&self.pool)
                .await
                .map_err(storage_error)?;
        }
        Ok(())
    }

    async fn permission_granted(
        &self,
        contract_id: Uuid,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<()> {
        self.upsert_permission(contract_id, user_id, role).await
    }

    async fn permission_updated(
        &self,
        contract_id: Uuid,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<()> {
        self.upsert_permission(contract_id, user_id, role).await
    }

    async fn permission_revoked(&self, contract_id: Uuid, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM permissions
            WHERE contract_id = $1 AND user_id = $2
            "#,
        )
        .bind(contract_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn contract_ids_for_creator(&self, creator_id: &str) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT contract_id
            FROM contracts
            WHERE creator_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter()
            .map(|row| row.try_get("contract_id").map_err(storage_error))
            .collect()
    }

    async fn contract_ids_for_collaborator(&self, user_id: &str) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT c.contract_id
            FROM contracts c
            JOIN permissions p ON p.contract_id = c.contract_id
            WHERE p.user_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter()
            .map(|row| row.try_get("contract_id").map_err(storage_error))
            .collect()
    }
}

#[derive(Clone)]
pub struct PgInvitationStore {
    pool: PgPool,
}

impl PgInvitationStore {
    pub fn new(pool: PgPool) -> Self {
        PgInvitationStore { pool }
    }

    fn row_to_invitation(row: &sqlx::postgres::PgRow) -> Result<Invitation> {
        let role: String = row.try_get("role").map_err(storage_error)?;
        let status: String = row.try_get("status").map_err(storage_error)?;
        Ok(Invitation {
            id: row.try_get("invitation_id").map_err(storage_error)?,
            contract_id: row.try_get("contract_id").map_err(storage_error)?,
            email: row.try_get("email").map_err(storage_error)?,
            role: CollaboratorRole::parse(&role)?,
            status: InvitationStatus::parse(&status)?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(storage_error)?,
        })
    }
}

#[async_trait]
impl InvitationStore for PgInvitationStore {
    async fn put(&self, invitation: &Invitation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invitations (invitation_id, contract_id, email, role, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (invitation_id)
            DO UPDATE SET role = EXCLUDED.role, status = EXCLUDED.status
            "#,
        )
        .bind(invitation.id)
        .bind(invitation.contract_id)
        .bind(&invitation.email)
        .bind(invitation.role.as_str())
        .bind(invitation.status.as_str())
        .bind(invitation.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get(&self, invitation_id: Uuid) -> Result<Option<Invitation>> {
        let row = sqlx::query(
            r#"
            SELECT invitation_id, contract_id, email, role, status, created_at
            FROM invitations
            WHERE invitation_id = $1
            "#,
        )
        .bind(invitation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(|row| Self::row_to_invitation(&row)).transpose()
    }

    async fn list_for_contract(&self, contract_id: Uuid) -> Result<Vec<Invitation>> {
        let rows = sqlx::query(
            r#"
            SELECT invitation_id, contract_id, email, role, status, created_at
            FROM invitations
            WHERE contract_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(Self::row_to_invitation).collect()
    }

    async fn mark_accepted(&self, invitation_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE invitations
            SET status = $2
            WHERE invitation_id = $1
            "#,
        )
        .bind(invitation_id)
        .bind(InvitationStatus::Accepted.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}

// The users table belongs to the external account system; this directory
// only reads it.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        PgUserDirectory { pool }
    }

    fn row_to_profile(row: &sqlx::postgres::PgRow) -> anyhow::Result<Profile> {
        Ok(Profile {
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
        })
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn lookup_by_id(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, name, email
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_profile(&row)).transpose()
    }

    async fn lookup_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, name, email
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_profile(&row)).transpose()
    }
}
