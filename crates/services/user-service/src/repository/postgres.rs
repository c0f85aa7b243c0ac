//! PostgreSQL user repository backed by SeaORM.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, QueryOrder, Set,
};

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use super::{with_deadline, UserRepository};
use common::{AppError, AppResult, OptionExt};
use domain::{NewUser, User, UserChanges, UserId};

/// Relational implementation of UserRepository.
///
/// Identity comes from the table's `BIGSERIAL` column; email uniqueness is
/// enforced by the schema.
pub struct PostgresUserStore {
    db: DatabaseConnection,
}

impl PostgresUserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: UserId) -> AppResult<user::Model> {
        UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .ok_or_not_found()
    }
}

#[async_trait]
impl UserRepository for PostgresUserStore {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        with_deadline("users.create", async move {
            let active_model = ActiveModel {
                id: NotSet,
                name: Set(new_user.name),
                email: Set(new_user.email),
            };

            let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
            Ok(User::from(model))
        })
        .await
    }

    async fn get_by_id(&self, id: UserId) -> AppResult<User> {
        with_deadline("users.get", async move {
            let model = self.find_model(id).await?;
            Ok(User::from(model))
        })
        .await
    }

    async fn get_all(&self) -> AppResult<Vec<User>> {
        with_deadline("users.list", async move {
            let models = UserEntity::find()
                .order_by_asc(user::Column::Id)
                .all(&self.db)
                .await
                .map_err(AppError::from)?;

            Ok(models.into_iter().map(User::from).collect())
        })
        .await
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> AppResult<User> {
        with_deadline("users.update", async move {
            // Confirm the row exists before touching it
            let existing = self.find_model(id).await?;
            if changes.is_empty() {
                return Ok(User::from(existing));
            }

            let mut active: ActiveModel = existing.into();
            if let Some(name) = changes.name {
                active.name = Set(name);
            }
            if let Some(email) = changes.email {
                active.email = Set(email);
            }

            // The row can vanish between the read and the write
            let model = active.update(&self.db).await.map_err(|e| match e {
                DbErr::RecordNotUpdated => AppError::NotFound,
                other => AppError::from(other),
            })?;
            Ok(User::from(model))
        })
        .await
    }

    async fn delete(&self, id: UserId) -> AppResult<()> {
        with_deadline("users.delete", async move {
            let result = UserEntity::delete_by_id(id)
                .exec(&self.db)
                .await
                .map_err(AppError::from)?;

            if result.rows_affected == 0 {
                return Err(AppError::NotFound);
            }

            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;

    fn ann() -> user::Model {
        user::Model {
            id: 1,
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_maps_missing_row_to_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let store = PostgresUserStore::new(db);

        let result = store.get_by_id(42).await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_create_returns_engine_assigned_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ann()]])
            .into_connection();
        let store = PostgresUserStore::new(db);

        let user = store
            .create(NewUser {
                name: "Ann".to_string(),
                email: "ann@x.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.email, "ann@x.com");
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let store = PostgresUserStore::new(db);

        let result = store
            .update(
                7,
                UserChanges {
                    name: Some("Annie".to_string()),
                    email: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_merges_present_fields() {
        let annie = user::Model {
            name: "Annie".to_string(),
            ..ann()
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ann()], vec![annie]])
            .into_connection();
        let store = PostgresUserStore::new(db);

        let user = store
            .update(
                1,
                UserChanges {
                    name: Some("Annie".to_string()),
                    email: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(user.name, "Annie");
        assert_eq!(user.email, "ann@x.com");
    }

    #[tokio::test]
    async fn test_update_of_row_deleted_mid_flight_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ann()], Vec::<user::Model>::new()])
            .into_connection();
        let store = PostgresUserStore::new(db);

        let result = store
            .update(
                1,
                UserChanges {
                    name: None,
                    email: Some("annie@x.com".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_with_no_affected_rows_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let store = PostgresUserStore::new(db);

        let result = store.delete(3).await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_all_on_empty_table_is_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let store = PostgresUserStore::new(db);

        let users = store.get_all().await.unwrap();

        assert!(users.is_empty());
    }
}
