// src/models/module.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// A navigable dashboard section (modules table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    #[schema(example = "customers")]
    pub id: String,

    #[schema(example = "customers")]
    pub name: String,

    #[schema(example = "مشتریان")]
    pub display_name: String,

    #[schema(example = "/dashboard/customers")]
    pub route: String,

    #[schema(example = "Users")]
    pub icon: Option<String>,

    #[schema(example = 2)]
    pub sort_order: i32,

    pub parent_id: Option<String>,

    pub is_active: bool,
}

impl Module {
    pub fn new(name: &str, display_name: &str, route: &str, icon: &str, sort_order: i32) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            route: route.to_string(),
            icon: Some(icon.to_string()),
            sort_order,
            parent_id: None,
            is_active: true,
        }
    }
}

/// Modules a user may open, and whether they came from the fallback catalog.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedModules {
    pub modules: Vec<Module>,
    pub fallback: bool,
}

// One entry of the sidebar
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NavEntry {
    Item {
        module: Module,
    },
    Group {
        key: String,
        title: String,
        icon: String,
        children: Vec<Module>,
    },
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResponse {
    pub modules: Vec<Module>,
    pub navigation: Vec<NavEntry>,
    pub fallback: bool,
}

// Admin view: one row per catalog module for a given user
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleGrant {
    #[serde(flatten)]
    pub module: Module,
    pub granted: bool,
    /// Always available to the user whatever the stored rows say.
    pub implicit: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserModuleGrants {
    pub user_id: Uuid,
    pub is_manager: bool,
    pub modules: Vec<ModuleGrant>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionChange {
    pub user_id: Uuid,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "customers")]
    pub module_id: String,

    #[schema(example = true)]
    pub granted: bool,
}

// POST /api/permissions accepts one change or a batch
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PermissionWritePayload {
    Batch { changes: Vec<PermissionChange> },
    Single(PermissionChange),
}

impl PermissionWritePayload {
    pub fn into_changes(self) -> Vec<PermissionChange> {
        match self {
            PermissionWritePayload::Batch { changes } => changes,
            PermissionWritePayload::Single(change) => vec![change],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionWriteOutcome {
    pub applied: usize,
    /// False when the permissions table is missing and the write was skipped.
    pub persisted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_payload_accepts_single_and_batch() {
        let user = Uuid::new_v4();
        let single: PermissionWritePayload = serde_json::from_value(json!({
            "userId": user, "moduleId": "sales", "granted": true
        }))
        .unwrap();
        assert_eq!(single.into_changes().len(), 1);

        let batch: PermissionWritePayload = serde_json::from_value(json!({
            "changes": [
                { "userId": user, "moduleId": "sales", "granted": true },
                { "userId": user, "moduleId": "deals", "granted": false }
            ]
        }))
        .unwrap();
        let changes = batch.into_changes();
        assert_eq!(changes.len(), 2);
        assert!(!changes[1].granted);
    }

    #[test]
    fn nav_entries_are_tagged() {
        let entry = NavEntry::Item {
            module: Module::new("dashboard", "داشبورد", "/dashboard", "LayoutDashboard", 1),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["kind"], "item");
        assert_eq!(value["module"]["displayName"], "داشبورد");
    }
}
