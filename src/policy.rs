// src/policy.rs

//! Role and module policy of the dashboard.
//!
//! Every role allowlist, the baseline module set, the default module catalog
//! and the sidebar clusters are defined here once and handed to the rest of
//! the application through `AppState`.

use crate::{common::error::AppError, models::module::Module};

pub const MANAGER_ROLES: &[&str] = &["ceo", "مدیر", "sales_manager", "مدیر فروش"];
pub const BASELINE_MODULES: &[&str] = &["dashboard", "tasks", "profile"];

/// A named sidebar cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavGroup {
    pub key: String,
    pub title: String,
    pub icon: String,
    pub members: Vec<String>,
    /// Emit the lone member as a top-level item when the cluster has one entry.
    pub collapse_single: bool,
}

impl NavGroup {
    fn new(key: &str, title: &str, icon: &str, members: &[&str], collapse_single: bool) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            icon: icon.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            collapse_single,
        }
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.members.iter().any(|m| m == module_name)
    }
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    manager_roles: Vec<String>,
    user_admin_roles: Vec<String>,
    baseline_modules: Vec<String>,
    catalog: Vec<Module>,
    nav_groups: Vec<NavGroup>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Case-insensitive for ASCII roles, whitespace-insensitive for all.
pub fn normalize_role(role: &str) -> String {
    role.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl AccessPolicy {
    pub fn builtin() -> Self {
        let manager_roles: Vec<String> = MANAGER_ROLES.iter().map(|r| normalize_role(r)).collect();

        Self {
            user_admin_roles: manager_roles.clone(),
            manager_roles,
            baseline_modules: BASELINE_MODULES.iter().map(|m| m.to_string()).collect(),
            catalog: default_catalog(),
            nav_groups: default_nav_groups(),
        }
    }

    /// Role membership test against an arbitrary allowlist.
    pub fn has_permission<R: AsRef<str>>(&self, role: &str, allowed_roles: &[R]) -> bool {
        let role = normalize_role(role);
        allowed_roles
            .iter()
            .any(|allowed| normalize_role(allowed.as_ref()) == role)
    }

    pub fn is_manager(&self, role: &str) -> bool {
        self.has_permission(role, &self.manager_roles)
    }

    pub fn can_manage_users(&self, role: &str) -> bool {
        self.has_permission(role, &self.user_admin_roles)
    }

    pub fn require_manager(&self, role: &str) -> Result<(), AppError> {
        if self.is_manager(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn baseline_modules(&self) -> &[String] {
        &self.baseline_modules
    }

    pub fn is_baseline(&self, module_name: &str) -> bool {
        self.baseline_modules.iter().any(|m| m == module_name)
    }

    /// Catalog served when the `modules` table is unreachable or empty.
    pub fn default_catalog(&self) -> &[Module] {
        &self.catalog
    }

    pub fn nav_groups(&self) -> &[NavGroup] {
        &self.nav_groups
    }

    pub fn group_for(&self, module_name: &str) -> Option<&NavGroup> {
        self.nav_groups.iter().find(|g| g.contains(module_name))
    }
}

fn default_catalog() -> Vec<Module> {
    vec![
        Module::new("dashboard", "داشبورد", "/dashboard", "LayoutDashboard", 1),
        Module::new("customers", "مشتریان", "/dashboard/customers", "Users", 2),
        Module::new("contacts", "مخاطبین", "/dashboard/contacts", "Contact", 3),
        Module::new("companies", "شرکت‌ها", "/dashboard/companies", "Building", 4),
        Module::new("deals", "معاملات", "/dashboard/deals", "Handshake", 5),
        Module::new("sales", "فروش", "/dashboard/sales", "ShoppingCart", 6),
        Module::new("sales_pipeline", "قیف فروش", "/dashboard/sales/pipeline", "TrendingUp", 7),
        Module::new("products", "محصولات", "/dashboard/products", "Package", 8),
        Module::new("tasks", "وظایف", "/dashboard/tasks", "CheckSquare", 9),
        Module::new("daily_reports", "گزارش روزانه", "/dashboard/daily-reports", "FileText", 10),
        Module::new("customer_journey", "سفر مشتری", "/dashboard/customer-journey", "Map", 11),
        Module::new("feedback", "بازخوردها", "/dashboard/feedback", "MessageSquare", 12),
        Module::new("surveys", "نظرسنجی‌ها", "/dashboard/surveys", "ClipboardList", 13),
        Module::new("touchpoints", "نقاط تماس", "/dashboard/touchpoints", "Target", 14),
        Module::new("customer_health", "سلامت مشتری", "/dashboard/customer-health", "Heart", 15),
        Module::new("voice_of_customer", "صدای مشتری", "/dashboard/voice-of-customer", "Mic", 16),
        Module::new("team", "تیم", "/dashboard/team", "UsersRound", 17),
        Module::new("coworkers", "همکاران", "/dashboard/coworkers", "UserCheck", 18),
        Module::new("chat", "گفتگو", "/dashboard/chat", "MessageCircle", 19),
        Module::new("calendar", "تقویم", "/dashboard/calendar", "Calendar", 20),
        Module::new("ai_analysis", "تحلیل هوشمند", "/dashboard/ai-analysis", "Brain", 21),
        Module::new("reports_analysis", "تحلیل گزارش‌ها", "/dashboard/reports-analysis", "BarChart", 22),
        Module::new("insights", "بینش‌ها", "/dashboard/insights", "Lightbulb", 23),
        Module::new("projects", "پروژه‌ها", "/dashboard/projects", "FolderKanban", 24),
        Module::new("settings", "تنظیمات", "/dashboard/settings", "Settings", 25),
        Module::new("profile", "پروفایل", "/dashboard/profile", "User", 26),
    ]
}

fn default_nav_groups() -> Vec<NavGroup> {
    vec![
        NavGroup::new(
            "sales_management",
            "مدیریت فروش",
            "ShoppingCart",
            &["sales", "deals", "sales_pipeline"],
            false,
        ),
        NavGroup::new(
            "customer_experience",
            "مدیریت تجربه مشتری",
            "HeartHandshake",
            &[
                "customers",
                "contacts",
                "companies",
                "customer_journey",
                "feedback",
                "surveys",
                "touchpoints",
                "customer_health",
                "voice_of_customer",
            ],
            false,
        ),
        NavGroup::new(
            "team_management",
            "مدیریت تیم",
            "UsersRound",
            &["team", "coworkers", "daily_reports", "chat", "calendar"],
            false,
        ),
        NavGroup::new(
            "ai_analytics",
            "هوش مصنوعی و تحلیل",
            "Brain",
            &["ai_analysis", "reports_analysis", "insights"],
            false,
        ),
        NavGroup::new(
            "projects_products",
            "پروژه‌ها و محصولات",
            "FolderKanban",
            &["projects", "products"],
            false,
        ),
        NavGroup::new("settings", "تنظیمات", "Settings", &["settings", "profile"], true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn manager_roles_are_recognized() {
        let policy = AccessPolicy::default();
        for role in ["ceo", "CEO", " مدیر ", "sales_manager", "مدیر  فروش"] {
            assert!(policy.is_manager(role), "{role} should be a manager");
        }
        for role in ["sales_agent", "agent", "", "manager"] {
            assert!(!policy.is_manager(role), "{role} should not be a manager");
        }
    }

    #[test]
    fn require_manager_forbids_agents() {
        let policy = AccessPolicy::default();
        assert!(policy.require_manager("ceo").is_ok());
        assert!(matches!(policy.require_manager("agent"), Err(AppError::Forbidden)));
    }

    #[test]
    fn has_permission_is_plain_membership() {
        let policy = AccessPolicy::default();
        assert!(policy.has_permission("Sales_Agent", &["sales_agent", "agent"]));
        assert!(!policy.has_permission("ceo", &["sales_agent", "agent"]));
    }

    #[test]
    fn default_catalog_is_consistent() {
        let policy = AccessPolicy::default();
        let catalog = policy.default_catalog();
        assert_eq!(catalog.len(), 26);

        let ids: HashSet<_> = catalog.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len(), "module ids must be unique");

        for name in policy.baseline_modules() {
            assert!(ids.contains(name.as_str()), "baseline module {name} missing from catalog");
        }
        for group in policy.nav_groups() {
            for member in &group.members {
                assert!(ids.contains(member.as_str()), "group member {member} missing");
            }
        }
    }

    #[test]
    fn each_module_belongs_to_at_most_one_group() {
        let policy = AccessPolicy::default();
        let mut seen = HashSet::new();
        for group in policy.nav_groups() {
            for member in &group.members {
                assert!(seen.insert(member.clone()), "{member} is in two groups");
            }
        }
        assert!(policy.group_for("dashboard").is_none());
        assert_eq!(policy.group_for("profile").map(|g| g.key.as_str()), Some("settings"));
    }
}
