//! Behavioural tests for the in-memory repository through the service layer.

use std::collections::BTreeSet;
use std::sync::Arc;

use common::AppError;
use domain::{CreateUserRequest, UpdateUserRequest};
use user_service_lib::repository::{MemoryUserStore, UserRepository};
use user_service_lib::service::{UserManager, UserService};

fn service() -> UserManager {
    UserManager::new(Arc::new(MemoryUserStore::new()))
}

#[tokio::test]
async fn test_create_then_rename() {
    let service = service();

    let ann = service
        .create_user(CreateUserRequest::new("Ann", "ann@example.com"))
        .await
        .unwrap();
    assert_eq!(ann.id, 1);

    let renamed = service
        .update_user(
            ann.id,
            UpdateUserRequest {
                name: Some("Annie".to_string()),
                email: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(renamed.name, "Annie");
    assert_eq!(renamed.email, "ann@example.com");
    assert_eq!(service.get_user(ann.id).await.unwrap(), renamed);
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let service = service();

    assert!(matches!(service.get_user(9).await, Err(AppError::NotFound)));
    assert!(matches!(service.delete_user(9).await, Err(AppError::NotFound)));
    assert!(matches!(
        service.update_user(9, UpdateUserRequest::default()).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_empty_update_returns_current_record() {
    let service = service();
    let user = service
        .create_user(CreateUserRequest::new("Bob", "bob@example.com"))
        .await
        .unwrap();

    let unchanged = service
        .update_user(user.id, UpdateUserRequest::default())
        .await
        .unwrap();

    assert_eq!(unchanged, user);
}

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() {
    let service = service();
    let first = service
        .create_user(CreateUserRequest::new("A", "a@example.com"))
        .await
        .unwrap();
    service.delete_user(first.id).await.unwrap();

    let second = service
        .create_user(CreateUserRequest::new("B", "b@example.com"))
        .await
        .unwrap();

    assert_eq!(second.id, 2);
    assert_eq!(service.list_users().await.unwrap(), vec![second]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_ids() {
    let store = Arc::new(MemoryUserStore::new());

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let request =
                    CreateUserRequest::new(format!("user{}", i), format!("user{}@example.com", i));
                store.create(request.validate().unwrap()).await.unwrap().id
            })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }

    assert_eq!(ids, (1..=100).collect::<BTreeSet<i64>>());
    assert_eq!(store.get_all().await.unwrap().len(), 100);
}
