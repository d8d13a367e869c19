//! User repository: domain lookups plus the generic CRUD set.
//!
//! `UserStore` composes the base repository traits for the generic
//! operations and adds the user-specific queries (lookup by email,
//! existence checks by email and phone number).

use async_trait::async_trait;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr};
use validator::Validate;

use super::base::{DeleteRepository, ReadRepository, WriteRepository};
use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::domain::{CreateUser, UpdateUser, User};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Lookup methods treat absence as a valid empty result, never as an
/// error. Existence checks are side-effect free.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;

    /// Find user by email address
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Check whether a user with the given email exists
    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;

    /// Check whether a user with the given phone number exists
    async fn exists_by_phone_number(&self, phone_number: &str) -> AppResult<bool>;

    /// Create a new user; the store assigns the identifier
    async fn create(&self, data: CreateUser) -> AppResult<User>;

    /// Update profile fields of an existing user
    async fn update(&self, id: i64, data: UpdateUser) -> AppResult<User>;

    /// Delete user by ID
    async fn delete(&self, id: i64) -> AppResult<()>;

    /// List all users
    async fn list(&self) -> AppResult<Vec<User>>;

    /// List one page of users together with the total count
    async fn list_paginated(&self, params: &PaginationParams) -> AppResult<(Vec<User>, u64)>;

    /// Count all users
    async fn count(&self) -> AppResult<u64>;
}

/// Concrete implementation of UserRepository backed by SeaORM
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl ReadRepository<UserEntity, user::Model> for UserStore {
    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl WriteRepository<UserEntity, user::Model, ActiveModel> for UserStore {
    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl DeleteRepository<UserEntity> for UserStore {
    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let result = ReadRepository::find_by_id(self, id).await?;
        Ok(result.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let matches = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(matches > 0)
    }

    async fn exists_by_phone_number(&self, phone_number: &str) -> AppResult<bool> {
        let matches = UserEntity::find()
            .filter(user::Column::PhoneNumber.eq(phone_number))
            .count(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(matches > 0)
    }

    async fn create(&self, data: CreateUser) -> AppResult<User> {
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

        let model = WriteRepository::insert(self, active_model)
            .await
            .map_err(map_unique_violation)?;

        Ok(User::from(model))
    }

    async fn update(&self, id: i64, data: UpdateUser) -> AppResult<User> {
        if data.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }
        data.validate().map_err(|e| validation_error(&e))?;

        let model = ReadRepository::find_by_id(self, id)
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

        let model = WriteRepository::update(self, active)
            .await
            .map_err(map_unique_violation)?;

        Ok(User::from(model))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let rows_affected = DeleteRepository::delete_by_id(self, id).await?;

        if rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let models = ReadRepository::find_all(self).await?;
        Ok(models.into_iter().map(User::from).collect())
    }

    async fn list_paginated(&self, params: &PaginationParams) -> AppResult<(Vec<User>, u64)> {
        let (models, total) = ReadRepository::find_paginated(self, params).await?;
        Ok((models.into_iter().map(User::from).collect(), total))
    }

    async fn count(&self) -> AppResult<u64> {
        ReadRepository::count(self).await
    }
}

/// True when the error reports a violated unique constraint
fn is_unique_violation(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }

    // Fallback for drivers that surface the raw Postgres error text
    let msg = err.to_string().to_lowercase();
    msg.contains("23505") || msg.contains("duplicate key") || msg.contains("unique constraint")
}

pub(crate) fn map_unique_violation(err: AppError) -> AppError {
    match err {
        AppError::Database(db_err) if is_unique_violation(&db_err) => AppError::conflict("User"),
        other => other,
    }
}

/// Convert validation errors into a single user-friendly AppError
pub(crate) fn validation_error(errors: &validator::ValidationErrors) -> AppError {
    let message = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(", ");

    AppError::validation(message)
}
