//! Unit of Work pattern implementation.
//!
//! Centralizes access to the user repository and manages database
//! transactions (begin, commit, rollback) so multi-step operations
//! stay atomic. One transaction wraps one logical operation; read
//! concurrency is left to the storage engine.

use async_trait::async_trait;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use std::sync::Arc;
use validator::Validate;

use super::repositories::entities::user::{self, ActiveModel, Entity as UserEntity};
use super::repositories::{map_unique_violation, validation_error, UserRepository, UserStore};
use crate::domain::{CreateUser, UpdateUser, User};
use crate::errors::{AppError, AppResult};

/// Unit of Work trait for dependency injection.
///
/// Provides centralized access to the repository and transaction
/// management. This trait is not mockable directly due to generic
/// methods; for testing, mock `UserRepository` or use integration
/// tests.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Get user repository
    fn users(&self) -> Arc<dyn UserRepository>;

    /// Execute a closure within a transaction.
    ///
    /// The transaction is automatically committed on success or rolled
    /// back on error. Uses ReadCommitted isolation.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(
                TransactionContext<'a>,
            ) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;

    /// Execute a closure within a transaction with serializable isolation.
    ///
    /// Use this for operations requiring the strongest consistency
    /// guarantees.
    async fn transaction_serializable<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(
                TransactionContext<'a>,
            ) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
///
/// All repository operations performed through this context are part
/// of the same database transaction. The context borrows the
/// transaction to ensure proper lifetime management.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    /// Create a new transaction context
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Get user repository for this transaction
    pub fn users(&self) -> TxUserRepository<'_> {
        TxUserRepository::new(self.txn)
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
}

impl Persistence {
    /// Create new UnitOfWork instance
    pub fn new(db: DatabaseConnection) -> Self {
        let user_repo = Arc::new(UserStore::new(db.clone()));
        Self { db, user_repo }
    }

    /// Internal transaction execution with configurable isolation level
    async fn execute_transaction<F, T>(&self, isolation: IsolationLevel, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(
                TransactionContext<'a>,
            ) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(isolation), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(
                TransactionContext<'a>,
            ) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        // ReadCommitted balances consistency and throughput
        self.execute_transaction(IsolationLevel::ReadCommitted, f)
            .await
    }

    async fn transaction_serializable<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(
                TransactionContext<'a>,
            ) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        self.execute_transaction(IsolationLevel::Serializable, f)
            .await
    }
}

/// Transaction-aware user repository.
///
/// Executes all operations within the provided transaction. Uses a
/// borrowed reference so the transaction outlives repository
/// operations.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUserRepository<'a> {
    /// Create new transaction-aware repository
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .one(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    /// Find user by email address
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    /// Check whether a user with the given email exists
    pub async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let matches = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .count(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(matches > 0)
    }

    /// Check whether a user with the given phone number exists
    pub async fn exists_by_phone_number(&self, phone_number: &str) -> AppResult<bool> {
        let matches = UserEntity::find()
            .filter(user::Column::PhoneNumber.eq(phone_number))
            .count(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(matches > 0)
    }

    /// Create a new user
    pub async fn create(&self, data: CreateUser) -> AppResult<User> {
        data.validate().map_err(|e| validation_error(&e))?;

        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: NotSet,
            first_name: Set(data.first_name),
            last_name: Set(data.last_name),
            email: Set(data.email),
            phone_number: Set(data.phone_number),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(self.txn)
            .await
            .map_err(AppError::from)
            .map_err(map_unique_violation)?;

        Ok(User::from(model))
    }

    /// Update profile fields of an existing user
    pub async fn update(&self, id: i64, data: UpdateUser) -> AppResult<User> {
        if data.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }
        data.validate().map_err(|e| validation_error(&e))?;

        let model = UserEntity::find_by_id(id)
            .one(self.txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();

        if let Some(first_name) = data.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = data.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(email) = data.email {
            active.email = Set(email);
        }
        if let Some(phone_number) = data.phone_number {
            active.phone_number = Set(phone_number);
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active
            .update(self.txn)
            .await
            .map_err(AppError::from)
            .map_err(map_unique_violation)?;

        Ok(User::from(model))
    }

    /// Delete user by ID
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = UserEntity::delete_by_id(id)
            .exec(self.txn)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    /// List all users
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .all(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(User::from).collect())
    }
}

/// Simpler API for executing transactional operations.
///
/// This helper macro reduces boilerplate when using transactions.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        btreemap! { "num_items" => Into::<Value>::into(n) }
    }

    fn ok_exec() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }
    }

    #[tokio::test]
    async fn users_accessor_exposes_the_shared_store() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![count_row(1)]])
            .into_connection();

        let uow = Persistence::new(db);
        let exists = uow.users().exists_by_email("a@x.com").await.unwrap();

        assert!(exists);
    }

    #[tokio::test]
    async fn transaction_commits_on_success() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // existence count inside the transaction
            .append_query_results(vec![vec![count_row(1)]])
            // commit
            .append_exec_results(vec![ok_exec()])
            .into_connection();

        let uow = Persistence::new(db);
        let exists = crate::with_transaction!(uow, |ctx| {
            ctx.users().exists_by_email("a@x.com").await
        })
        .unwrap();

        assert!(exists);
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // rollback
            .append_exec_results(vec![ok_exec()])
            .into_connection();

        let uow = Persistence::new(db);
        let result: AppResult<()> = uow
            .transaction(|_ctx| Box::pin(async move { Err(AppError::NotFound) }))
            .await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
