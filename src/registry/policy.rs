use serde::Serialize;

use super::domain::AccessTier;

/// Permission set derived from an access tier. Pure data; every mutating
/// operation consults this single table instead of scattering ad-hoc checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub can_view_all: bool,
    pub can_edit: bool,
    pub can_create: bool,
    pub can_delete: bool,
    pub can_manage_users: bool,
    pub own_record_only: bool,
}

impl Permissions {
    pub const fn for_tier(tier: AccessTier) -> Self {
        match tier {
            AccessTier::Admin => Self {
                can_view_all: true,
                can_edit: true,
                can_create: true,
                can_delete: true,
                can_manage_users: true,
                own_record_only: false,
            },
            AccessTier::Editor => Self {
                can_view_all: true,
                can_edit: true,
                can_create: true,
                can_delete: false,
                can_manage_users: false,
                own_record_only: false,
            },
            AccessTier::ViewerRestricted => Self {
                can_view_all: false,
                can_edit: false,
                can_create: false,
                can_delete: false,
                can_manage_users: false,
                own_record_only: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_holds_every_permission() {
        let permissions = Permissions::for_tier(AccessTier::Admin);
        assert!(permissions.can_view_all);
        assert!(permissions.can_edit);
        assert!(permissions.can_create);
        assert!(permissions.can_delete);
        assert!(permissions.can_manage_users);
        assert!(!permissions.own_record_only);
    }

    #[test]
    fn editor_cannot_delete_or_manage_users() {
        let permissions = Permissions::for_tier(AccessTier::Editor);
        assert!(permissions.can_view_all);
        assert!(permissions.can_edit);
        assert!(permissions.can_create);
        assert!(!permissions.can_delete);
        assert!(!permissions.can_manage_users);
        assert!(!permissions.own_record_only);
    }

    #[test]
    fn restricted_viewer_sees_only_own_records() {
        let permissions = Permissions::for_tier(AccessTier::ViewerRestricted);
        assert!(!permissions.can_view_all);
        assert!(!permissions.can_edit);
        assert!(!permissions.can_create);
        assert!(!permissions.can_delete);
        assert!(!permissions.can_manage_users);
        assert!(permissions.own_record_only);
    }
}
