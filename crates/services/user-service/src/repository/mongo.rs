//! MongoDB user repository.
//!
//! The public integer id is stored as an ordinary `id` field, allocated from
//! an atomic counter document and protected by a unique index. The native
//! `_id` is never exposed and never queried.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use super::{with_deadline, UserRepository};
use common::{AppError, AppResult, OptionExt};
use domain::{NewUser, User, UserChanges, UserId};

/// Collection holding user documents
pub const USERS_COLLECTION: &str = "users";

/// Collection holding id sequences
pub const COUNTERS_COLLECTION: &str = "counters";

/// Counter document key for user ids
const USER_SEQUENCE: &str = "users";

/// Stored shape of a user document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    id: i64,
    name: String,
    email: String,
}

impl From<UserDocument> for User {
    fn from(document: UserDocument) -> Self {
        User {
            id: document.id,
            name: document.name,
            email: document.email,
        }
    }
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Counter {
    seq: i64,
}

/// Document-store implementation of UserRepository.
pub struct MongoUserStore {
    users: Collection<UserDocument>,
    counters: Collection<Counter>,
}

impl MongoUserStore {
    /// Bind to the collections of `database` and make sure the id index exists.
    pub async fn new(database: &Database) -> AppResult<Self> {
        let store = Self {
            users: database.collection(USERS_COLLECTION),
            counters: database.collection(COUNTERS_COLLECTION),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        with_deadline("users.ensure_indexes", async move {
            let index = IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("users_id_unique".to_string())
                        .unique(true)
                        .build(),
                )
                .build();
            self.users.create_index(index).await?;
            tracing::debug!("MongoDB user id index ensured");
            Ok(())
        })
        .await
    }

    /// Atomically allocate the next user id (starts at 1).
    async fn next_id(&self) -> AppResult<UserId> {
        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": USER_SEQUENCE },
                doc! { "$inc": { "seq": 1_i64 } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::internal("user id counter missing after upsert"))?;

        Ok(counter.seq)
    }

    async fn find_document(&self, id: UserId) -> AppResult<UserDocument> {
        self.users
            .find_one(doc! { "id": id })
            .await?
            .ok_or_not_found()
    }
}

/// Build the `$set` body for a partial update.
fn set_document(changes: UserChanges) -> Document {
    let mut set = Document::new();
    if let Some(name) = changes.name {
        set.insert("name", name);
    }
    if let Some(email) = changes.email {
        set.insert("email", email);
    }
    set
}

#[async_trait]
impl UserRepository for MongoUserStore {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        with_deadline("users.create", async move {
            let id = self.next_id().await?;
            let user = User::from_new(id, new_user);

            self.users.insert_one(UserDocument::from(&user)).await?;
            Ok(user)
        })
        .await
    }

    async fn get_by_id(&self, id: UserId) -> AppResult<User> {
        with_deadline("users.get", async move {
            let document = self.find_document(id).await?;
            Ok(User::from(document))
        })
        .await
    }

    async fn get_all(&self) -> AppResult<Vec<User>> {
        with_deadline("users.list", async move {
            let documents: Vec<UserDocument> = self
                .users
                .find(doc! {})
                .sort(doc! { "id": 1 })
                .await?
                .try_collect()
                .await?;

            Ok(documents.into_iter().map(User::from).collect())
        })
        .await
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> AppResult<User> {
        with_deadline("users.update", async move {
            // An empty $set is rejected by the server
            if changes.is_empty() {
                return self.find_document(id).await.map(User::from);
            }

            let updated = self
                .users
                .find_one_and_update(doc! { "id": id }, doc! { "$set": set_document(changes) })
                .return_document(ReturnDocument::After)
                .await?
                .ok_or_not_found()?;

            Ok(User::from(updated))
        })
        .await
    }

    async fn delete(&self, id: UserId) -> AppResult<()> {
        with_deadline("users.delete", async move {
            let result = self.users.delete_one(doc! { "id": id }).await?;
            if result.deleted_count == 0 {
                return Err(AppError::NotFound);
            }
            Ok(())
        })
        .await
    }
}
