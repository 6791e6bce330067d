use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Admin capabilities. Matching is exact membership of the permission string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewUsers,
    ManageUsers,
    ViewAnalytics,
    ViewAnalyses,
    ViewLogs,
    ManageSystem,
    ExportData,
    BulkOperations,
    AuditTrail,
    SystemConfig,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl Permission {
    pub const ALL: [Permission; 10] = [
        Permission::ViewUsers,
        Permission::ManageUsers,
        Permission::ViewAnalytics,
        Permission::ViewAnalyses,
        Permission::ViewLogs,
        Permission::ManageSystem,
        Permission::ExportData,
        Permission::BulkOperations,
        Permission::AuditTrail,
        Permission::SystemConfig,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::ViewUsers => "view_users",
            Permission::ManageUsers => "manage_users",
            Permission::ViewAnalytics => "view_analytics",
            Permission::ViewAnalyses => "view_analyses",
            Permission::ViewLogs => "view_logs",
            Permission::ManageSystem => "manage_system",
            Permission::ExportData => "export_data",
            Permission::BulkOperations => "bulk_operations",
            Permission::AuditTrail => "audit_trail",
            Permission::SystemConfig => "system_config",
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses `view_analyses, export_data` style lists. Blank entries are skipped;
/// duplicates collapse.
pub fn parse_permission_list(raw: &str) -> Result<Vec<Permission>, UnknownPermission> {
    let mut permissions = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let permission: Permission = item.parse()?;
        if !permissions.contains(&permission) {
            permissions.push(permission);
        }
    }
    Ok(permissions)
}

pub fn has_permission(granted: &[Permission], required: Permission) -> bool {
    granted.contains(&required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for p in Permission::ALL {
            assert_eq!(p.as_str().parse::<Permission>().unwrap(), p);
        }
    }

    #[test]
    fn test_match_is_exact() {
        assert!("view_analyses ".parse::<Permission>().is_err());
        assert!("VIEW_ANALYSES".parse::<Permission>().is_err());
    }

    #[test]
    fn test_parse_list_dedups_and_skips_blanks() {
        let parsed = parse_permission_list(" view_analyses, ,export_data,view_analyses").unwrap();
        assert_eq!(parsed, vec![Permission::ViewAnalyses, Permission::ExportData]);
    }

    #[test]
    fn test_parse_list_rejects_unknown() {
        assert_eq!(
            parse_permission_list("view_analyses,launch_rockets"),
            Err(UnknownPermission("launch_rockets".into()))
        );
    }

    #[test]
    fn test_has_permission() {
        let granted = [Permission::ViewAnalyses];
        assert!(has_permission(&granted, Permission::ViewAnalyses));
        assert!(!has_permission(&granted, Permission::ManageSystem));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&Permission::ExportData).unwrap(),
            "\"export_data\""
        );
    }
}
