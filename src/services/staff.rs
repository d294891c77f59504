use crate::{
    context::CallerContext,
    error::{AppError, AppResult},
    models::{admin_user, user, AdminUser, AdminUserModel, Capability, StaffRole, User, UserModel},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use std::env;

pub struct StaffService {
    db: DatabaseConnection,
}

impl StaffService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Build the caller context for an authenticated user.
    pub async fn load_caller(&self, user_id: i32) -> AppResult<CallerContext> {
        let staff = AdminUser::find()
            .filter(admin_user::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(match staff {
            Some(staff) => CallerContext::staff(&staff),
            None => CallerContext::member(user_id),
        })
    }

    pub async fn list(
        &self,
        caller: &CallerContext,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<(AdminUserModel, Option<UserModel>)>, u64)> {
        caller.require(Capability::ManageStaff)?;

        let paginator = AdminUser::find()
            .find_also_related(User)
            .order_by_asc(admin_user::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let staff = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((staff, total))
    }

    async fn find_staff(&self, user_id: i32) -> AppResult<Option<AdminUserModel>> {
        Ok(AdminUser::find()
            .filter(admin_user::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?)
    }

    fn ensure_not_self(caller: &CallerContext, user_id: i32) -> AppResult<()> {
        if caller.user_id == user_id {
            return Err(AppError::InvalidState(
                "you cannot change your own staff membership".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn grant(
        &self,
        caller: &CallerContext,
        user_id: i32,
        role: StaffRole,
    ) -> AppResult<AdminUserModel> {
        caller.require(Capability::ManageStaff)?;
        Self::ensure_not_self(caller, user_id)?;

        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        if self.find_staff(user_id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "user {} is already a staff member",
                user_id
            )));
        }

        let staff = insert_staff(&self.db, user_id, role, Some(caller.user_id)).await?;
        tracing::info!("User {} granted {:?} by {}", user_id, role, caller.user_id);
        Ok(staff)
    }

    /// Change a member's role; permissions reset to the role's defaults.
    pub async fn update_role(
        &self,
        caller: &CallerContext,
        user_id: i32,
        role: StaffRole,
    ) -> AppResult<AdminUserModel> {
        caller.require(Capability::ManageStaff)?;
        Self::ensure_not_self(caller, user_id)?;

        let existing = self.find_staff(user_id).await?.ok_or(AppError::NotFound)?;
        let mut active: admin_user::ActiveModel = existing.into();
        set_role(&mut active, role);
        let updated = active.update(&self.db).await?;

        tracing::info!("User {} role set to {:?} by {}", user_id, role, caller.user_id);
        Ok(updated)
    }

    pub async fn revoke(&self, caller: &CallerContext, user_id: i32) -> AppResult<()> {
        caller.require(Capability::ManageStaff)?;
        Self::ensure_not_self(caller, user_id)?;

        let result = AdminUser::delete_many()
            .filter(admin_user::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        tracing::info!("Staff membership of user {} revoked by {}", user_id, caller.user_id);
        Ok(())
    }
}

fn set_role(active: &mut admin_user::ActiveModel, role: StaffRole) {
    let perms = role.default_permissions();
    active.role = Set(role);
    active.can_view_reports = Set(perms.can_view_reports);
    active.can_moderate = Set(perms.can_moderate);
    active.can_ban = Set(perms.can_ban);
    active.can_delete_content = Set(perms.can_delete_content);
    active.can_manage_admins = Set(perms.can_manage_admins);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
}

pub async fn insert_staff(
    db: &DatabaseConnection,
    user_id: i32,
    role: StaffRole,
    created_by: Option<i32>,
) -> AppResult<AdminUserModel> {
    let perms = role.default_permissions();
    let now = chrono::Utc::now().naive_utc();
    let staff = admin_user::ActiveModel {
        user_id: Set(user_id),
        role: Set(role),
        can_view_reports: Set(perms.can_view_reports),
        can_moderate: Set(perms.can_moderate),
        can_ban: Set(perms.can_ban),
        can_delete_content: Set(perms.can_delete_content),
        can_manage_admins: Set(perms.can_manage_admins),
        created_by: Set(created_by),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(staff)
}

/// 启动时授予超级管理员：
/// - 已存在任意 super_admin：不做任何事
/// - 否则若 BOOTSTRAP_SUPER_ADMIN_EMAIL 对应的用户存在：授予或提升为 super_admin
pub async fn ensure_bootstrap_super_admin(db: &DatabaseConnection) -> AppResult<()> {
    let Some(email) = env::var("BOOTSTRAP_SUPER_ADMIN_EMAIL")
        .ok()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
    else {
        return Ok(());
    };

    let exists = AdminUser::find()
        .filter(admin_user::Column::Role.eq(StaffRole::SuperAdmin))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    let Some(target) = User::find()
        .filter(user::Column::Email.eq(email.clone()))
        .one(db)
        .await?
    else {
        tracing::warn!("Bootstrap super admin '{}' has no account yet", email);
        return Ok(());
    };

    let existing = AdminUser::find()
        .filter(admin_user::Column::UserId.eq(target.id))
        .one(db)
        .await?;

    if let Some(staff) = existing {
        let mut active: admin_user::ActiveModel = staff.into();
        set_role(&mut active, StaffRole::SuperAdmin);
        active.update(db).await?;
    } else {
        insert_staff(db, target.id, StaffRole::SuperAdmin, None).await?;
    }

    tracing::info!("Granted super_admin to user {} at startup", target.id);
    Ok(())
}
