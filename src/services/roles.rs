use crate::{
    auth::PermissionSet,
    db::DbPool,
    entities::role::{self, Entity as RoleEntity},
    errors::ServiceError,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Role name is required"))]
    pub name: String,
    /// Map of resource to granted actions, e.g. `{"ORDER": ["read"]}`
    pub permissions: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub permissions: serde_json::Value,
}

#[derive(Clone)]
pub struct RoleService {
    db_pool: Arc<DbPool>,
}

impl RoleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// The permissions map shape is validated up front so authorization
    /// never has to deal with malformed grants.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_role(&self, request: CreateRoleRequest) -> Result<role::Model, ServiceError> {
        request.validate()?;
        PermissionSet::from_json(&request.permissions)?;

        let existing = RoleEntity::find()
            .filter(role::Column::Name.eq(request.name.clone()))
            .one(self.db_pool.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Role {} already exists",
                request.name
            )));
        }

        let created = role::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            permissions: Set(request.permissions),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await?;

        info!(role_id = %created.id, "Role created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_role(&self, id: Uuid) -> Result<role::Model, ServiceError> {
        RoleEntity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role {id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn list_roles(&self) -> Result<Vec<role::Model>, ServiceError> {
        RoleEntity::find()
            .order_by_asc(role::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, request))]
    pub async fn update_role(
        &self,
        id: Uuid,
        request: UpdateRoleRequest,
    ) -> Result<role::Model, ServiceError> {
        PermissionSet::from_json(&request.permissions)?;

        let role = self.get_role(id).await?;
        let mut active: role::ActiveModel = role.into();
        active.permissions = Set(request.permissions);

        let updated = active.update(self.db_pool.as_ref()).await?;
        info!(role_id = %id, "Role permissions updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_role(&self, id: Uuid) -> Result<(), ServiceError> {
        let role = self.get_role(id).await?;
        RoleEntity::delete_by_id(role.id)
            .exec(self.db_pool.as_ref())
            .await?;
        info!(role_id = %id, "Role deleted");
        Ok(())
    }
}
