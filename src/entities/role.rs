use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of account roles, stored as `users.role_id` referencing the
/// seeded `roles` lookup table. Scope rules are expressed as predicates on
/// [`crate::auth::ActorContext`], never as string comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(num_value = 1)]
    Admin,
    #[sea_orm(num_value = 2)]
    OfficeHead,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::OfficeHead => "Office Head",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_detection() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::OfficeHead.is_admin());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::OfficeHead).unwrap(), "\"office_head\"");
    }
}
