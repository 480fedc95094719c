use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, Role, User},
    repositories::user::UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    teachers: Vec<i64>,
    next_id: i64,
}

/// An in-process [`UserRepository`] for development without PostgreSQL.
///
/// Contents are lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryUserRepository {
    /// Creates a new, empty `InMemoryUserRepository`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of users that have a teacher profile.
    pub async fn teacher_ids(&self) -> Vec<i64> {
        self.tables.read().await.teachers.clone()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(email).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&new_user.email) {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        tables.next_id += 1;
        let user = User {
            id: tables.next_id,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            full_name: new_user.full_name,
            phone: new_user.phone,
        };

        if user.role == Role::Teacher {
            tables.teachers.push(user.id);
        }
        tables.users.insert(user.email.clone(), user.clone());

        tracing::info!("✅ User created with ID: {}", user.id);
        Ok(user)
    }

    async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::Internal(format!("no user with id {}", user_id)))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}
