//! User repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use tracing::info;
use uuid::Uuid;

use crate::entities::users;

/// Profile returned by Google after a successful sign-in.
#[derive(Debug, Clone)]
pub struct GoogleUserInput {
    /// Stable Google account identifier (`sub`).
    pub subject: String,
    /// Verified email address.
    pub email: String,
    /// Display name.
    pub full_name: Option<String>,
    /// Profile picture URL.
    pub avatar_url: Option<String>,
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
    }

    /// Finds a user by Google account identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_google_subject(
        &self,
        subject: &str,
    ) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::GoogleSubject.eq(subject))
            .one(&self.db)
            .await
    }

    /// Creates or refreshes the account behind a Google sign-in.
    ///
    /// Matches on the Google subject first, then links an existing account
    /// with the same email, and otherwise creates a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn upsert_google_user(&self, input: GoogleUserInput) -> Result<users::Model, DbErr> {
        let now = chrono::Utc::now().into();

        let existing = match self.find_by_google_subject(&input.subject).await? {
            Some(user) => Some(user),
            None => self.find_by_email(&input.email).await?,
        };

        if let Some(user) = existing {
            let mut active: users::ActiveModel = user.into();
            active.email = Set(input.email);
            active.google_subject = Set(Some(input.subject));
            active.full_name = Set(input.full_name);
            active.avatar_url = Set(input.avatar_url);
            active.updated_at = Set(now);
            return active.update(&self.db).await;
        }

        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(input.email),
            full_name: Set(input.full_name),
            google_subject: Set(Some(input.subject)),
            avatar_url: Set(input.avatar_url),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let user = user.insert(&self.db).await?;
        info!(user_id = %user.id, "Created user from Google sign-in");
        Ok(user)
    }
}
