use shared_models::auth::User;

/// Platform roles carried in the JWT `role` claim. Anything unknown is
/// treated as a plain user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    ClinicAdmin,
    User,
}

impl Role {
    pub fn from_user(user: &User) -> Self {
        match user.role.as_deref() {
            Some("admin") => Role::Admin,
            Some("clinic_admin") => Role::ClinicAdmin,
            _ => Role::User,
        }
    }
}

pub fn is_admin(user: &User) -> bool {
    Role::from_user(user) == Role::Admin
}

pub fn is_clinic_admin(user: &User) -> bool {
    Role::from_user(user) == Role::ClinicAdmin
}

/// The single ownership capability check used at every scheduler and CRUD
/// entry point: admins may act on any resource, everyone else only on
/// resources they own. A resource without an owner is admin-only.
pub fn can_access(requester: &User, resource_owner_id: Option<&str>) -> bool {
    if is_admin(requester) {
        return true;
    }

    resource_owner_id == Some(requester.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(id: &str, role: Option<&str>) -> User {
        User {
            id: id.to_string(),
            email: None,
            role: role.map(|r| r.to_string()),
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn admin_can_access_anything() {
        let admin = user_with_role("admin-1", Some("admin"));
        assert!(can_access(&admin, Some("someone-else")));
        assert!(can_access(&admin, None));
    }

    #[test]
    fn owner_can_access_own_resource() {
        let user = user_with_role("user-1", Some("user"));
        assert!(can_access(&user, Some("user-1")));
    }

    #[test]
    fn non_owner_is_denied() {
        let user = user_with_role("user-1", Some("user"));
        assert!(!can_access(&user, Some("user-2")));
        assert!(!can_access(&user, None));
    }

    #[test]
    fn clinic_admin_is_not_global_admin() {
        let clinic_admin = user_with_role("owner-1", Some("clinic_admin"));
        assert!(can_access(&clinic_admin, Some("owner-1")));
        assert!(!can_access(&clinic_admin, Some("owner-2")));
    }

    #[test]
    fn unknown_role_defaults_to_user() {
        let user = user_with_role("u", Some("superuser"));
        assert_eq!(Role::from_user(&user), Role::User);
        let no_role = user_with_role("u", None);
        assert_eq!(Role::from_user(&no_role), Role::User);
    }
}
