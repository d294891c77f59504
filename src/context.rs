use crate::error::{AppError, AppResult};
use crate::models::{AdminUserModel, Capability, Permissions, StaffRole};

/// Who is calling and what they may do. Built once per request and passed to
/// every command.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user_id: i32,
    pub role: Option<StaffRole>,
    pub permissions: Permissions,
}

impl CallerContext {
    /// A plain member with no staff row.
    pub fn member(user_id: i32) -> Self {
        Self {
            user_id,
            role: None,
            permissions: Permissions::default(),
        }
    }

    pub fn staff(staff: &AdminUserModel) -> Self {
        Self {
            user_id: staff.user_id,
            role: Some(staff.role),
            permissions: staff.permissions(),
        }
    }

    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.permissions.allows(capability) {
            Ok(())
        } else {
            tracing::warn!(
                "User {} denied: missing capability {:?}",
                self.user_id,
                capability
            );
            Err(AppError::Forbidden)
        }
    }

    pub fn require_all(&self, capabilities: &[Capability]) -> AppResult<()> {
        capabilities.iter().try_for_each(|c| self.require(*c))
    }
}
