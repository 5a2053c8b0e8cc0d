use std::sync::Arc;

use dualstore_core::commerce::{CreateUser, Deletion, UpdateUser, User};
use dualstore_core::migration::validation::compare_users;
use dualstore_core::migration::{MigrationConfig, Result};
use dualstore_core::storage::{MirrorStore, UserRecord, UserRepository};

use super::{absent_as_none, require};
use crate::orchestrator::{DualReader, DualWriter, ReadOperation, WriteOperation};

const ENTITY: &str = "User";

/// User operations across both stores.
pub struct UserAdapter<P, S> {
    primary: Arc<P>,
    secondary: Arc<S>,
    writer: DualWriter,
    reader: DualReader,
}

impl<P, S> UserAdapter<P, S>
where
    P: UserRepository,
    S: UserRepository + MirrorStore<UserRecord>,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>, config: Arc<MigrationConfig>) -> Self {
        Self {
            primary,
            secondary,
            writer: DualWriter::new(Arc::clone(&config), ENTITY),
            reader: DualReader::new(config, ENTITY),
        }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let op = ReadOperation::new(
            id,
            move || self.primary.find_by_id(id),
            move || self.secondary.find_by_id(id),
        );
        self.reader
            .execute(op, compare_users, "find_by_id")
            .await
            .into_result()
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let op = ReadOperation::new(
            username,
            move || self.primary.find_by_username(username),
            move || self.secondary.find_by_username(username),
        );
        self.reader
            .execute(op, compare_users, "find_by_username")
            .await
            .into_result()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let op = ReadOperation::new(
            email,
            move || self.primary.find_by_email(email),
            move || self.secondary.find_by_email(email),
        );
        self.reader
            .execute(op, compare_users, "find_by_email")
            .await
            .into_result()
    }

    /// Creates the user, deleting it from the primary again if the mirror
    /// write fails.
    pub async fn create(&self, request: &CreateUser) -> Result<User> {
        let op = WriteOperation::new(
            move || self.primary.create(request),
            move |user: User| self.secondary.put_record(UserRecord::from_user(&user)),
        )
        .with_secondary_only(move || self.secondary.create(request))
        .with_rollback(move |user: User| self.primary.delete(user.id));

        self.writer
            .execute(op, "create")
            .await
            .into_result()
            .map_err(Into::into)
    }

    pub async fn update(&self, id: i64, patch: &UpdateUser) -> Result<Option<User>> {
        let op = WriteOperation::new(
            move || async move {
                self.primary
                    .update(id, patch)
                    .await
                    .and_then(|updated| require(ENTITY, id, updated))
            },
            move |user: User| self.secondary.put_record(UserRecord::from_user(&user)),
        )
        .with_secondary_only(move || async move {
            self.secondary
                .update(id, patch)
                .await
                .and_then(|updated| require(ENTITY, id, updated))
        });

        absent_as_none(self.writer.execute(op, "update").await.into_result())
    }

    pub async fn upgrade_to_seller(&self, id: i64) -> Result<Option<User>> {
        let op = WriteOperation::new(
            move || async move {
                self.primary
                    .upgrade_to_seller(id)
                    .await
                    .and_then(|upgraded| require(ENTITY, id, upgraded))
            },
            move |user: User| self.secondary.put_record(UserRecord::from_user(&user)),
        )
        .with_secondary_only(move || async move {
            self.secondary
                .upgrade_to_seller(id)
                .await
                .and_then(|upgraded| require(ENTITY, id, upgraded))
        });

        absent_as_none(
            self.writer
                .execute(op, "upgrade_to_seller")
                .await
                .into_result(),
        )
    }

    pub async fn promote_to_super_admin(&self, id: i64) -> Result<Option<User>> {
        let op = WriteOperation::new(
            move || async move {
                self.primary
                    .promote_to_super_admin(id)
                    .await
                    .and_then(|promoted| require(ENTITY, id, promoted))
            },
            move |user: User| self.secondary.put_record(UserRecord::from_user(&user)),
        )
        .with_secondary_only(move || async move {
            self.secondary
                .promote_to_super_admin(id)
                .await
                .and_then(|promoted| require(ENTITY, id, promoted))
        });

        absent_as_none(
            self.writer
                .execute(op, "promote_to_super_admin")
                .await
                .into_result(),
        )
    }

    pub async fn demote_from_super_admin(&self, id: i64) -> Result<Option<User>> {
        let op = WriteOperation::new(
            move || async move {
                self.primary
                    .demote_from_super_admin(id)
                    .await
                    .and_then(|demoted| require(ENTITY, id, demoted))
            },
            move |user: User| self.secondary.put_record(UserRecord::from_user(&user)),
        )
        .with_secondary_only(move || async move {
            self.secondary
                .demote_from_super_admin(id)
                .await
                .and_then(|demoted| require(ENTITY, id, demoted))
        });

        absent_as_none(
            self.writer
                .execute(op, "demote_from_super_admin")
                .await
                .into_result(),
        )
    }

    /// Deletes from the primary, then from the secondary if the primary had
    /// the user.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let op = WriteOperation::new(
            move || async move {
                let deleted = self.primary.delete(id).await;
                deleted.map(|deleted| Deletion::new(id, deleted))
            },
            move |deletion: Deletion| async move {
                if deletion.deleted {
                    let deleted = self.secondary.delete(id).await;
                    deleted.map(|deleted| Deletion::new(id, deleted))
                } else {
                    Ok(deletion)
                }
            },
        )
        .with_secondary_only(move || async move {
            let deleted = self.secondary.delete(id).await;
            deleted.map(|deleted| Deletion::new(id, deleted))
        });

        let deletion = self.writer.execute(op, "delete").await.into_result()?;
        Ok(deletion.deleted)
    }
}
