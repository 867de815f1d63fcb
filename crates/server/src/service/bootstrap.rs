use anyhow::Context;
use selfstudy_core::domain::Role;
use tracing::info;

use crate::{
    auth::hash_password,
    config::BootstrapAdmin,
    repository::{NewUser, UserChanges, UserRepository},
};

/// 确保配置的管理员账户存在并拥有管理员角色，重复执行不会产生变化。
pub async fn ensure_admin(
    users: &dyn UserRepository,
    admin: &BootstrapAdmin,
) -> anyhow::Result<()> {
    match users.find_by_email(&admin.email).await? {
        Some(user) if user.role == Role::Admin => {
            info!(email = %admin.email, "bootstrap admin already present");
        }
        Some(user) => {
            users
                .update(
                    user.id,
                    UserChanges {
                        role: Some(Role::Admin),
                        ..Default::default()
                    },
                )
                .await?;
            info!(email = %admin.email, user_id = %user.id, "promoted existing user to admin");
        }
        None => {
            let password_hash =
                hash_password(&admin.password).context("failed to hash bootstrap admin password")?;
            let user = users
                .create(NewUser {
                    email: admin.email.clone(),
                    password_hash,
                    role: Role::Admin,
                    first_name: None,
                    last_name: None,
                    city: None,
                })
                .await?;
            info!(email = %admin.email, user_id = %user.id, "created bootstrap admin");
        }
    }

    Ok(())
}
