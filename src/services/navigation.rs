// src/services/navigation.rs

use std::collections::{HashMap, HashSet};

use crate::{
    models::module::{Module, NavEntry},
    policy::AccessPolicy,
};

/// Orders by `sort_order`, then `display_name`.
pub fn sort_modules(modules: &mut [Module]) {
    modules.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
}

fn dedup_by_id(modules: Vec<Module>) -> Vec<Module> {
    let mut seen = HashSet::new();
    modules
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}

/// Modules a role may open.
///
/// Managers get every active catalog module and grants are ignored. Everybody
/// else gets their granted modules plus the policy baseline, one entry per id.
pub fn resolve_for_role(
    policy: &AccessPolicy,
    role: &str,
    catalog: &[Module],
    granted: &[Module],
) -> Vec<Module> {
    let mut modules: Vec<Module> = if policy.is_manager(role) {
        catalog.iter().filter(|m| m.is_active).cloned().collect()
    } else {
        let baseline = policy.baseline_modules().iter().filter_map(|name| {
            catalog
                .iter()
                .find(|m| &m.name == name)
                .or_else(|| policy.default_catalog().iter().find(|m| &m.name == name))
        });

        granted
            .iter()
            .chain(baseline)
            .filter(|m| m.is_active)
            .cloned()
            .collect()
    };

    modules = dedup_by_id(modules);
    sort_modules(&mut modules);
    modules
}

enum Slot {
    Item(Module),
    Group(usize, Vec<Module>),
}

/// Arranges a sorted module list into the sidebar tree.
///
/// Entries keep the position of their first module; empty clusters vanish.
pub fn build_navigation(policy: &AccessPolicy, modules: &[Module]) -> Vec<NavEntry> {
    let groups = policy.nav_groups();
    let mut slots: Vec<Slot> = Vec::new();
    let mut group_slot: HashMap<usize, usize> = HashMap::new();

    for module in modules {
        let Some(group_idx) = groups.iter().position(|g| g.contains(&module.name)) else {
            slots.push(Slot::Item(module.clone()));
            continue;
        };

        match group_slot.get(&group_idx) {
            Some(&slot_idx) => {
                if let Slot::Group(_, children) = &mut slots[slot_idx] {
                    children.push(module.clone());
                }
            }
            None => {
                group_slot.insert(group_idx, slots.len());
                slots.push(Slot::Group(group_idx, vec![module.clone()]));
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Item(module) => NavEntry::Item { module },
            Slot::Group(idx, mut children) => {
                let group = &groups[idx];
                if group.collapse_single && children.len() == 1 {
                    if let Some(module) = children.pop() {
                        return NavEntry::Item { module };
                    }
                }
                NavEntry::Group {
                    key: group.key.clone(),
                    title: group.title.clone(),
                    icon: group.icon.clone(),
                    children,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AccessPolicy {
        AccessPolicy::default()
    }

    fn catalog() -> Vec<Module> {
        policy().default_catalog().to_vec()
    }

    fn module(name: &str) -> Module {
        catalog().into_iter().find(|m| m.name == name).unwrap()
    }

    fn names(modules: &[Module]) -> Vec<&str> {
        modules.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn managers_get_the_full_catalog_whatever_the_grants() {
        let catalog = catalog();
        for role in ["ceo", "مدیر", "sales_manager", "مدیر فروش"] {
            let none = resolve_for_role(&policy(), role, &catalog, &[]);
            let some = resolve_for_role(&policy(), role, &catalog, &[module("sales")]);
            assert_eq!(none.len(), catalog.len());
            assert_eq!(none, some);
        }
    }

    #[test]
    fn managers_never_see_inactive_modules() {
        let mut catalog = catalog();
        catalog[3].is_active = false;
        let resolved = resolve_for_role(&policy(), "ceo", &catalog, &[]);
        assert_eq!(resolved.len(), catalog.len() - 1);
        assert!(!resolved.iter().any(|m| m.id == catalog[3].id));
    }

    #[test]
    fn agents_get_grants_plus_baseline_without_duplicates() {
        let granted = vec![module("customers"), module("tasks"), module("customers")];
        let resolved = resolve_for_role(&policy(), "sales_agent", &catalog(), &granted);
        assert_eq!(names(&resolved), vec!["dashboard", "customers", "tasks", "profile"]);
    }

    #[test]
    fn agents_without_grants_get_only_baseline() {
        let resolved = resolve_for_role(&policy(), "agent", &catalog(), &[]);
        assert_eq!(names(&resolved), vec!["dashboard", "tasks", "profile"]);
    }

    #[test]
    fn baseline_comes_from_default_catalog_when_store_lacks_it() {
        let stored = vec![module("customers")];
        let resolved = resolve_for_role(&policy(), "agent", &stored, &[]);
        assert_eq!(names(&resolved), vec!["dashboard", "tasks", "profile"]);
    }

    #[test]
    fn ties_on_sort_order_break_on_display_name() {
        let mut list = vec![
            Module::new("b_mod", "ب", "/b", "X", 5),
            Module::new("a_mod", "الف", "/a", "X", 5),
        ];
        sort_modules(&mut list);
        assert_eq!(names(&list), vec!["a_mod", "b_mod"]);
    }

    #[test]
    fn navigation_groups_modules_and_keeps_unclustered_items_top_level() {
        let modules = resolve_for_role(&policy(), "ceo", &catalog(), &[]);
        let nav = build_navigation(&policy(), &modules);

        let shape: Vec<String> = nav
            .iter()
            .map(|entry| match entry {
                NavEntry::Item { module } => module.name.clone(),
                NavEntry::Group { key, .. } => format!("[{key}]"),
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                "dashboard",
                "[customer_experience]",
                "[sales_management]",
                "[projects_products]",
                "tasks",
                "[team_management]",
                "[ai_analytics]",
                "[settings]",
            ]
        );

        let total: usize = nav
            .iter()
            .map(|entry| match entry {
                NavEntry::Item { .. } => 1,
                NavEntry::Group { children, .. } => children.len(),
            })
            .sum();
        assert_eq!(total, modules.len());
    }

    #[test]
    fn single_settings_module_collapses_to_an_item() {
        let modules = resolve_for_role(&policy(), "agent", &catalog(), &[module("chat")]);
        let nav = build_navigation(&policy(), &modules);

        assert!(nav.iter().any(
            |entry| matches!(entry, NavEntry::Item { module } if module.name == "profile")
        ));
        // Other clusters keep their group even with one member.
        assert!(nav.iter().any(|entry| matches!(
            entry,
            NavEntry::Group { key, children, .. } if key == "team_management" && children.len() == 1
        )));
    }

    #[test]
    fn empty_module_list_builds_empty_navigation() {
        assert!(build_navigation(&policy(), &[]).is_empty());
    }
}
