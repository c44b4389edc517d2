use crate::{
    auth::{AuthService, TokenResponse},
    db::DbPool,
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub mobile: Option<String>,
    pub city: Option<String>,
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Self-service profile fields. Deliberately has no `role`: role changes go
/// through [`UserService::update_user`] behind the USER.update permission.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub mobile: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub mobile: Option<String>,
    pub city: Option<String>,
    #[validate(length(min = 1))]
    pub role: Option<String>,
}

/// User shape returned by the API; no password hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub city: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            mobile: model.mobile,
            city: model.city,
            role: model.role,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub token: TokenResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    auth_service: Arc<AuthService>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth_service: Arc<AuthService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            auth_service,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(self.db_pool.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "User with email {} already exists",
                request.email
            )));
        }

        let password_hash = self.auth_service.hash_password(&request.password)?;

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            first_name: Set(request.first_name),
            last_name: Set(request.last_name),
            email: Set(request.email),
            password_hash: Set(password_hash),
            mobile: Set(request.mobile),
            city: Set(request.city),
            role: Set(request.role),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db_pool.as_ref())
        .await?;

        info!(user_id = %created.id, "User registered");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::UserRegistered(created.id)).await {
                warn!(error = %e, "Failed to send user registered event");
            }
        }

        Ok(created.into())
    }

    /// Verifies the password and issues an access token carrying the role.
    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;

        let invalid = || ServiceError::Unauthorized("Invalid email or password".to_string());

        let user = UserEntity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(invalid)?;

        if !self
            .auth_service
            .verify_password(&request.password, &user.password_hash)?
        {
            return Err(invalid());
        }

        let token = self.auth_service.generate_token(&user)?;
        info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            user: user.into(),
            token,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> Result<UserResponse, ServiceError> {
        UserEntity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| ServiceError::NotFound(format!("User {id} not found")))
    }

    /// Paginated listing with an optional name/email search.
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<UserListResponse, ServiceError> {
        let mut query = UserEntity::find().order_by_asc(user::Column::LastName);

        if let Some(term) = search.filter(|t| !t.is_empty()) {
            let pattern = format!("%{term}%");
            query = query.filter(
                Condition::any()
                    .add(user::Column::FirstName.like(pattern.clone()))
                    .add(user::Column::LastName.like(pattern.clone()))
                    .add(user::Column::Email.like(pattern)),
            );
        }

        let paginator = query.paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(UserListResponse {
            users: users.into_iter().map(UserResponse::from).collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        self.update_user(
            id,
            UpdateUserRequest {
                first_name: request.first_name,
                last_name: request.last_name,
                mobile: request.mobile,
                city: request.city,
                role: None,
            },
        )
        .await
    }

    #[instrument(skip(self, request))]
    pub async fn update_user(
        &self,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let user = UserEntity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {id} not found")))?;

        let mut active: user::ActiveModel = user.into();
        if let Some(first_name) = request.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = request.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(mobile) = request.mobile {
            active.mobile = Set(Some(mobile));
        }
        if let Some(city) = request.city {
            active.city = Set(Some(city));
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }

        let updated = active.update(self.db_pool.as_ref()).await?;
        info!(user_id = %id, "User updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let user = UserEntity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {id} not found")))?;

        UserEntity::delete_by_id(user.id)
            .exec(self.db_pool.as_ref())
            .await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}
