use std::collections::HashSet;

use crate::database::models::Permission;

/// Union of directly granted and role-inherited permissions.
///
/// Duplicates (same id reached through several roles, or granted both
/// directly and through a role) collapse to one entry. Disabled permissions
/// grant nothing and are dropped. The result is ordered by code.
pub fn effective_permissions(direct: Vec<Permission>, inherited: Vec<Permission>) -> Vec<Permission> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Permission> = direct
        .into_iter()
        .chain(inherited)
        .filter(|p| p.enabled)
        .filter(|p| seen.insert(p.id))
        .collect();

    merged.sort_by(|a, b| a.code.cmp(&b.code));
    merged
}

/// Resolved permission codes for one caller
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    codes: HashSet<String>,
    super_admin: bool,
}

impl PermissionSet {
    pub fn new<I, S>(codes: I, super_admin: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            super_admin,
        }
    }

    pub fn from_permissions(permissions: &[Permission], super_admin: bool) -> Self {
        Self::new(permissions.iter().map(|p| p.code.clone()), super_admin)
    }

    /// Super admins pass every check regardless of explicit grants
    pub fn has(&self, code: &str) -> bool {
        self.super_admin || self.codes.contains(code)
    }

    pub fn is_super_admin(&self) -> bool {
        self.super_admin
    }

    /// Granted codes in sorted order
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.codes.iter().cloned().collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn perm(code: &str) -> Permission {
        let now = Utc::now();
        Permission {
            id: Uuid::new_v4(),
            name: code.to_string(),
            code: code.to_string(),
            description: None,
            enabled: true,
            created_at: now,
            modified_at: now,
        }
    }

    #[test]
    fn union_deduplicates_by_id() {
        let view = perm("user:view");
        let create = perm("user:create");
        let delete = perm("user:delete");

        let direct = vec![view.clone(), create.clone()];
        let inherited = vec![create.clone(), delete.clone(), view.clone(), delete.clone()];

        let result = effective_permissions(direct, inherited);
        let codes: Vec<&str> = result.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["user:create", "user:delete", "user:view"]);
    }

    #[test]
    fn disabled_permissions_grant_nothing() {
        let mut disabled = perm("role:delete");
        disabled.enabled = false;

        let result = effective_permissions(vec![], vec![disabled, perm("role:view")]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].code, "role:view");
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(effective_permissions(vec![], vec![]).is_empty());
    }

    #[test]
    fn permission_set_checks_codes() {
        let set = PermissionSet::from_permissions(&[perm("menu:view")], false);
        assert!(set.has("menu:view"));
        assert!(!set.has("menu:delete"));
        assert_eq!(set.codes(), vec!["menu:view".to_string()]);
    }

    #[test]
    fn super_admin_passes_everything() {
        let set = PermissionSet::new(Vec::<String>::new(), true);
        assert!(set.has("anything:at-all"));
        assert!(set.is_super_admin());
    }
}
