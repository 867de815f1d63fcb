use crate::entity::user;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use selfstudy_core::domain::{Role, Scope, UserId};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
}

/// 为 `None` 的字段保持不变。
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub city: Option<Option<String>>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<UserRecord>;
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    async fn list(&self, scope: Scope) -> Result<Vec<UserRecord>>;
    async fn update(&self, user_id: UserId, changes: UserChanges) -> Result<Option<UserRecord>>;
    async fn delete(&self, user_id: UserId) -> Result<bool>;
}

#[derive(Clone)]
pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn map_role(code: i16) -> Result<Role> {
        match code {
            0 => Ok(Role::Student),
            1 => Ok(Role::Teacher),
            2 => Ok(Role::Admin),
            _ => Err(anyhow!("invalid users.role code from database: {code}")),
        }
    }

    fn map_role_code(role: Role) -> i16 {
        match role {
            Role::Student => 0,
            Role::Teacher => 1,
            Role::Admin => 2,
        }
    }

    fn map_model(model: user::Model) -> Result<UserRecord> {
        Ok(UserRecord {
            id: UserId::new(model.id),
            email: model.email,
            password_hash: model.password_hash,
            role: Self::map_role(model.role)?,
            first_name: model.first_name,
            last_name: model.last_name,
            city: model.city,
        })
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<UserRecord> {
        let active_model = user::ActiveModel {
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            role: Set(Self::map_role_code(new_user.role)),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            city: Set(new_user.city),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await?;
        Self::map_model(model)
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        let model = user::Entity::find_by_id(user_id.value())
            .one(&self.db)
            .await?;

        model.map(Self::map_model).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;

        model.map(Self::map_model).transpose()
    }

    async fn list(&self, scope: Scope) -> Result<Vec<UserRecord>> {
        let query = match scope {
            Scope::All => user::Entity::find(),
            Scope::Account(user_id) => {
                user::Entity::find().filter(user::Column::Id.eq(user_id.value()))
            }
            Scope::OwnedBy(_) | Scope::Empty => return Ok(Vec::new()),
        };

        let models = query.order_by_asc(user::Column::Id).all(&self.db).await?;
        let mut users = models
            .into_iter()
            .map(Self::map_model)
            .collect::<Result<Vec<_>>>()?;

        // 按角色名降序（teacher、student、admin），稳定排序保持 id 升序。
        users.sort_by(|a, b| b.role.as_str().cmp(a.role.as_str()));
        Ok(users)
    }

    async fn update(&self, user_id: UserId, changes: UserChanges) -> Result<Option<UserRecord>> {
        let Some(model) = user::Entity::find_by_id(user_id.value())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut active_model: user::ActiveModel = model.into();
        if let Some(email) = changes.email {
            active_model.email = Set(email);
        }
        if let Some(role) = changes.role {
            active_model.role = Set(Self::map_role_code(role));
        }
        if let Some(first_name) = changes.first_name {
            active_model.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active_model.last_name = Set(last_name);
        }
        if let Some(city) = changes.city {
            active_model.city = Set(city);
        }

        let updated = active_model.update(&self.db).await?;
        Self::map_model(updated).map(Some)
    }

    async fn delete(&self, user_id: UserId) -> Result<bool> {
        let result = user::Entity::delete_by_id(user_id.value())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
