//! Contract tests for the user repository.
//!
//! These tests exercise the `UserRepository` trait the way consumers
//! do, using an in-memory double plus the generated mockall mock. No
//! database connection is required.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use mockall::predicate::eq;

use ecommerce_app::domain::{CreateUser, UpdateUser, User};
use ecommerce_app::errors::{AppError, AppResult, OptionExt};
use ecommerce_app::infra::{MockUserRepository, UserRepository};
use ecommerce_app::types::{Paginated, PaginationParams};

// =============================================================================
// In-memory repository double
// =============================================================================

/// In-memory stand-in honoring the same contract as the real store:
/// ids assigned on creation, email and phone number unique.
#[derive(Default)]
struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
    next_id: AtomicI64,
}

impl InMemoryUserRepository {
    fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().any(|u| u.email == email))
    }

    async fn exists_by_phone_number(&self, phone_number: &str) -> AppResult<bool> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().any(|u| u.phone_number == phone_number))
    }

    async fn create(&self, data: CreateUser) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email == data.email || u.phone_number == data.phone_number)
        {
            return Err(AppError::conflict("User"));
        }

        let now = Utc::now();
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            first_name: data.first_name,
            last_name: data.last_name,
            email: data.email,
            phone_number: data.phone_number,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, data: UpdateUser) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound)?;
        user.apply_update(data);
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn list_paginated(&self, params: &PaginationParams) -> AppResult<(Vec<User>, u64)> {
        let users = self.users.lock().unwrap();
        let total = users.len() as u64;
        let page = users
            .iter()
            .skip(params.offset() as usize)
            .take(params.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.users.lock().unwrap().len() as u64)
    }
}

fn alice() -> CreateUser {
    CreateUser {
        first_name: "Alice".to_string(),
        last_name: "Example".to_string(),
        email: "a@x.com".to_string(),
        phone_number: "555-0001".to_string(),
    }
}

// =============================================================================
// Contract behavior
// =============================================================================

#[tokio::test]
async fn absent_email_yields_empty_result_and_false_existence() {
    let repo = InMemoryUserRepository::new();

    assert!(repo.find_by_email("ghost@x.com").await.unwrap().is_none());
    assert!(!repo.exists_by_email("ghost@x.com").await.unwrap());
}

#[tokio::test]
async fn inserted_user_is_found_and_reported_existing() {
    let repo = InMemoryUserRepository::new();

    let created = repo.create(alice()).await.unwrap();

    assert!(repo.exists_by_email("a@x.com").await.unwrap());
    assert!(!repo.exists_by_email("b@x.com").await.unwrap());
    assert!(repo.exists_by_phone_number("555-0001").await.unwrap());
    assert!(!repo.exists_by_phone_number("555-0002").await.unwrap());

    let found = repo.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(found, created);
}

#[tokio::test]
async fn store_assigns_distinct_ids() {
    let repo = InMemoryUserRepository::new();

    let first = repo.create(alice()).await.unwrap();
    let second = repo
        .create(CreateUser {
            email: "b@x.com".to_string(),
            phone_number: "555-0002".to_string(),
            ..alice()
        })
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn duplicate_email_or_phone_is_a_conflict() {
    let repo = InMemoryUserRepository::new();
    repo.create(alice()).await.unwrap();

    let same_email = repo
        .create(CreateUser {
            phone_number: "555-0009".to_string(),
            ..alice()
        })
        .await;
    assert!(matches!(same_email, Err(AppError::Conflict(_))));

    let same_phone = repo
        .create(CreateUser {
            email: "c@x.com".to_string(),
            ..alice()
        })
        .await;
    assert!(matches!(same_phone, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn consumers_turn_missing_lookups_into_not_found() {
    let repo = InMemoryUserRepository::new();

    let result = repo
        .find_by_email("ghost@x.com")
        .await
        .unwrap()
        .ok_or_not_found();

    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn deleting_a_user_removes_it_from_lookups() {
    let repo = InMemoryUserRepository::new();
    let created = repo.create(alice()).await.unwrap();

    repo.delete(created.id).await.unwrap();

    assert!(!repo.exists_by_email("a@x.com").await.unwrap());
    assert!(matches!(
        repo.delete(created.id).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn pagination_wraps_into_page_metadata() {
    let repo = InMemoryUserRepository::new();
    for i in 0..5 {
        repo.create(CreateUser {
            email: format!("user{}@x.com", i),
            phone_number: format!("555-010{}", i),
            ..alice()
        })
        .await
        .unwrap();
    }

    let params = PaginationParams {
        page: 1,
        per_page: 2,
    };
    let (users, total) = repo.list_paginated(&params).await.unwrap();
    let page = Paginated::new(users, params.page, params.per_page, total);

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.meta.total, 5);
    assert_eq!(page.meta.total_pages, 3);
}

// =============================================================================
// Generated mock (dependency-injection seam)
// =============================================================================

#[tokio::test]
async fn mock_repository_satisfies_expectations() {
    let mut repo = MockUserRepository::new();
    repo.expect_exists_by_email()
        .with(eq("a@x.com"))
        .times(1)
        .returning(|_| Ok(true));
    repo.expect_find_by_email()
        .with(eq("ghost@x.com"))
        .returning(|_| Ok(None));

    assert!(repo.exists_by_email("a@x.com").await.unwrap());
    assert!(repo.find_by_email("ghost@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn mock_repository_propagates_storage_failures() {
    let mut repo = MockUserRepository::new();
    repo.expect_exists_by_phone_number()
        .returning(|_| Err(AppError::internal("connection lost")));

    let result = repo.exists_by_phone_number("555-0001").await;
    assert!(matches!(result, Err(AppError::Internal(_))));
}
