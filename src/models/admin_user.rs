use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    #[sea_orm(string_value = "moderator")]
    Moderator,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
}

impl StaffRole {
    pub fn default_permissions(self) -> Permissions {
        match self {
            StaffRole::SuperAdmin => Permissions {
                can_view_reports: true,
                can_moderate: true,
                can_ban: true,
                can_delete_content: true,
                can_manage_admins: true,
            },
            StaffRole::Admin => Permissions {
                can_view_reports: true,
                can_moderate: true,
                can_ban: true,
                can_delete_content: true,
                can_manage_admins: false,
            },
            StaffRole::Moderator => Permissions {
                can_view_reports: true,
                can_moderate: true,
                can_ban: false,
                can_delete_content: true,
                can_manage_admins: false,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    ViewReports,
    Moderate,
    Ban,
    DeleteContent,
    ManageStaff,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permissions {
    pub can_view_reports: bool,
    pub can_moderate: bool,
    pub can_ban: bool,
    pub can_delete_content: bool,
    pub can_manage_admins: bool,
}

impl Permissions {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewReports => self.can_view_reports,
            Capability::Moderate => self.can_moderate,
            Capability::Ban => self.can_ban,
            Capability::DeleteContent => self.can_delete_content,
            Capability::ManageStaff => self.can_manage_admins,
        }
    }
}

/// Staff membership; one row per privileged user.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admin_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub role: StaffRole,
    pub can_view_reports: bool,
    pub can_moderate: bool,
    pub can_ban: bool,
    pub can_delete_content: bool,
    pub can_manage_admins: bool,
    pub created_by: Option<i32>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    pub fn permissions(&self) -> Permissions {
        Permissions {
            can_view_reports: self.can_view_reports,
            can_moderate: self.can_moderate,
            can_ban: self.can_ban,
            can_delete_content: self.can_delete_content,
            can_manage_admins: self.can_manage_admins,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admins_and_above_can_ban() {
        assert!(!StaffRole::Moderator.default_permissions().allows(Capability::Ban));
        assert!(StaffRole::Admin.default_permissions().allows(Capability::Ban));
        assert!(StaffRole::SuperAdmin.default_permissions().allows(Capability::Ban));
    }

    #[test]
    fn only_super_admin_manages_staff() {
        assert!(StaffRole::SuperAdmin
            .default_permissions()
            .allows(Capability::ManageStaff));
        assert!(!StaffRole::Admin
            .default_permissions()
            .allows(Capability::ManageStaff));
    }

    #[test]
    fn members_have_no_capabilities() {
        let none = Permissions::default();
        assert!(!none.allows(Capability::ViewReports));
        assert!(!none.allows(Capability::Moderate));
    }
}
