use std::collections::{HashMap, HashSet};

use crate::errors::ServiceError;

/// Permission names used when gating routes. Format is `RESOURCE.action`,
/// matching the keys stored in the roles table.
pub mod perms {
    pub const ORDER_CREATE: &str = "ORDER.create";
    pub const ORDER_READ: &str = "ORDER.read";
    pub const ORDER_UPDATE: &str = "ORDER.update";
    pub const ORDER_DELETE: &str = "ORDER.delete";

    pub const PRODUCT_CREATE: &str = "PRODUCT.create";
    pub const PRODUCT_READ: &str = "PRODUCT.read";
    pub const PRODUCT_UPDATE: &str = "PRODUCT.update";
    pub const PRODUCT_DELETE: &str = "PRODUCT.delete";

    pub const WORKORDER_CREATE: &str = "WORKORDER.create";
    pub const WORKORDER_READ: &str = "WORKORDER.read";
    pub const WORKORDER_UPDATE: &str = "WORKORDER.update";
    pub const WORKORDER_DELETE: &str = "WORKORDER.delete";

    pub const INVENTORY_READ: &str = "INVENTORY.read";
    pub const INVENTORY_UPDATE: &str = "INVENTORY.update";

    pub const USER_READ: &str = "USER.read";
    pub const USER_UPDATE: &str = "USER.update";
    pub const USER_DELETE: &str = "USER.delete";

    pub const PERMISSION_CREATE: &str = "PERMISSION.create";
    pub const PERMISSION_READ: &str = "PERMISSION.read";
    pub const PERMISSION_UPDATE: &str = "PERMISSION.update";
    pub const PERMISSION_DELETE: &str = "PERMISSION.delete";

    pub const REPORT_READ: &str = "REPORT.read";
}

/// A role's grants, parsed from its JSON `permissions` column:
/// a map of resource name to the set of allowed actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionSet {
    grants: HashMap<String, HashSet<String>>,
}

impl PermissionSet {
    /// Parse the stored JSON shape `{"ORDER": ["read", "update"], ...}`.
    /// Anything other than a map of string lists is rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ServiceError> {
        let object = value.as_object().ok_or_else(|| {
            ServiceError::ValidationError("permissions must be a JSON object".to_string())
        })?;

        let mut grants = HashMap::new();
        for (resource, actions) in object {
            let list = actions.as_array().ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "permissions for {resource} must be a list of actions"
                ))
            })?;
            let mut set = HashSet::new();
            for action in list {
                let action = action.as_str().ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "actions for {resource} must be strings"
                    ))
                })?;
                set.insert(action.to_string());
            }
            grants.insert(resource.clone(), set);
        }
        Ok(Self { grants })
    }

    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.grants
            .get(resource)
            .is_some_and(|actions| actions.contains(action))
    }

    /// Check a `RESOURCE.action` permission string. Malformed strings
    /// never match.
    pub fn allows_permission(&self, permission: &str) -> bool {
        match permission.split_once('.') {
            Some((resource, action)) if !resource.is_empty() && !action.is_empty() => {
                self.allows(resource, action)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grants_are_checked_per_resource_and_action() {
        let set =
            PermissionSet::from_json(&json!({"ORDER": ["read"], "PRODUCT": ["read", "update"]}))
                .unwrap();
        assert!(set.allows("ORDER", "read"));
        assert!(!set.allows("ORDER", "update"));
        assert!(set.allows("PRODUCT", "update"));
        assert!(!set.allows("WORKORDER", "read"));
    }

    #[test]
    fn permission_strings_split_on_the_first_dot() {
        let set = PermissionSet::from_json(&json!({"ORDER": ["read"]})).unwrap();
        assert!(set.allows_permission(perms::ORDER_READ));
        assert!(!set.allows_permission(perms::ORDER_UPDATE));
        assert!(!set.allows_permission("ORDER"));
        assert!(!set.allows_permission(".read"));
        assert!(!set.allows_permission("ORDER."));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(PermissionSet::from_json(&json!(["ORDER"])).is_err());
        assert!(PermissionSet::from_json(&json!({"ORDER": "read"})).is_err());
        assert!(PermissionSet::from_json(&json!({"ORDER": [1]})).is_err());
    }
}
