// src/services/permission_service.rs

use std::{collections::HashMap, sync::Arc};

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{is_undefined_table, AppError, Resource},
    db::{ModuleRepository, UserRepository},
    models::module::{
        Module, ModuleGrant, NavigationResponse, PermissionChange, PermissionWriteOutcome,
        ResolvedModules, UserModuleGrants,
    },
    policy::AccessPolicy,
    services::navigation::{build_navigation, resolve_for_role, sort_modules},
};

#[derive(Clone)]
pub struct PermissionService {
    module_repo: ModuleRepository,
    user_repo: UserRepository,
    pool: PgPool,
    policy: Arc<AccessPolicy>,
}

impl PermissionService {
    pub fn new(
        module_repo: ModuleRepository,
        user_repo: UserRepository,
        pool: PgPool,
        policy: Arc<AccessPolicy>,
    ) -> Self {
        Self {
            module_repo,
            user_repo,
            pool,
            policy,
        }
    }

    // =========================================================================
    //  READ PATH
    // =========================================================================

    /// Active catalog, or the built-in one when the table is unreachable or empty.
    pub async fn catalog(&self) -> (Vec<Module>, bool) {
        match self.module_repo.list_active_modules().await {
            Ok(modules) if !modules.is_empty() => (modules, false),
            Ok(_) => {
                tracing::warn!("modules table is empty, serving the built-in catalog");
                (self.policy.default_catalog().to_vec(), true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "module catalog unavailable, serving the built-in catalog");
                (self.policy.default_catalog().to_vec(), true)
            }
        }
    }

    /// Never fails: storage problems degrade to the fallback catalog or to
    /// the baseline modules, and the result is flagged.
    pub async fn resolve_modules(&self, user_id: Uuid, role: &str) -> ResolvedModules {
        let (catalog, mut fallback) = self.catalog().await;

        let granted = if self.policy.is_manager(role) {
            Vec::new()
        } else {
            match self.module_repo.granted_modules(user_id).await {
                Ok(granted) => granted,
                Err(e) => {
                    tracing::warn!(%user_id, error = %e, "granted modules unavailable, using baseline only");
                    fallback = true;
                    Vec::new()
                }
            }
        };

        ResolvedModules {
            modules: resolve_for_role(&self.policy, role, &catalog, &granted),
            fallback,
        }
    }

    pub async fn navigation_for(&self, user_id: Uuid, role: &str) -> NavigationResponse {
        let resolved = self.resolve_modules(user_id, role).await;
        let navigation = build_navigation(&self.policy, &resolved.modules);

        NavigationResponse {
            modules: resolved.modules,
            navigation,
            fallback: resolved.fallback,
        }
    }

    /// Admin view of one user's access, one row per catalog module.
    pub async fn grants_for_user(&self, user_id: Uuid) -> Result<UserModuleGrants, AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::User))?;

        let (catalog, _) = self.catalog().await;
        let rows = match self.module_repo.grant_rows(user_id).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "permission rows unavailable");
                Vec::new()
            }
        };

        let is_manager = self.policy.is_manager(&user.role);
        Ok(UserModuleGrants {
            user_id,
            is_manager,
            modules: build_grants(&self.policy, catalog, &rows, is_manager),
        })
    }

    // =========================================================================
    //  WRITE PATH
    // =========================================================================

    /// Applies every change or none of them.
    ///
    /// A missing permissions table is not an error: the write is skipped and
    /// reported with `persisted: false`.
    pub async fn set_permissions(
        &self,
        changes: &[PermissionChange],
    ) -> Result<PermissionWriteOutcome, AppError> {
        if changes.is_empty() {
            return Err(AppError::BadRequest("empty_batch"));
        }
        for change in changes {
            change.validate()?;
        }

        match self.apply_changes(changes).await {
            Ok(applied) => Ok(PermissionWriteOutcome {
                applied,
                persisted: true,
            }),
            Err(AppError::DatabaseError(e)) if is_undefined_table(&e) => {
                tracing::warn!(error = %e, "permissions table missing, write skipped");
                Ok(PermissionWriteOutcome {
                    applied: 0,
                    persisted: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_changes(&self, changes: &[PermissionChange]) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await?;

        for change in changes {
            if !self.user_repo.exists(change.user_id).await? {
                return Err(AppError::ResourceNotFound(Resource::User));
            }
            if !self
                .module_repo
                .module_exists(&mut *tx, &change.module_id)
                .await?
            {
                return Err(AppError::ResourceNotFound(Resource::Module));
            }

            self.module_repo
                .upsert_permission(&mut *tx, change.user_id, &change.module_id, change.granted)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(count = changes.len(), "module permissions updated");
        Ok(changes.len())
    }

    // =========================================================================
    //  CATALOG MAINTENANCE
    // =========================================================================

    /// Seeds the modules table from the built-in catalog when it is empty.
    pub async fn sync_catalog(&self) -> Result<usize, AppError> {
        if self.module_repo.count_modules().await? > 0 {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for module in self.policy.default_catalog() {
            self.module_repo.upsert_module(&mut *tx, module).await?;
        }
        tx.commit().await?;

        let count = self.policy.default_catalog().len();
        tracing::info!(count, "module catalog seeded");
        Ok(count)
    }
}

/// Baseline modules are always granted; managers hold everything.
pub fn build_grants(
    policy: &AccessPolicy,
    mut catalog: Vec<Module>,
    rows: &[(String, bool)],
    is_manager: bool,
) -> Vec<ModuleGrant> {
    let stored: HashMap<&str, bool> = rows.iter().map(|(id, g)| (id.as_str(), *g)).collect();
    sort_modules(&mut catalog);

    catalog
        .into_iter()
        .map(|module| {
            let implicit = is_manager || policy.is_baseline(&module.name);
            let granted = implicit || stored.get(module.id.as_str()).copied().unwrap_or(false);
            ModuleGrant {
                module,
                granted,
                implicit,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant<'a>(grants: &'a [ModuleGrant], name: &str) -> &'a ModuleGrant {
        grants.iter().find(|g| g.module.name == name).unwrap()
    }

    #[test]
    fn stored_rows_drive_non_baseline_modules() {
        let policy = AccessPolicy::default();
        let rows = vec![
            ("sales".to_string(), true),
            ("deals".to_string(), false),
        ];
        let grants = build_grants(&policy, policy.default_catalog().to_vec(), &rows, false);

        assert_eq!(grants.len(), policy.default_catalog().len());
        assert!(grant(&grants, "sales").granted);
        assert!(!grant(&grants, "sales").implicit);
        assert!(!grant(&grants, "deals").granted);
        assert!(!grant(&grants, "customers").granted);
        assert!(grant(&grants, "tasks").granted);
        assert!(grant(&grants, "tasks").implicit);
    }

    #[test]
    fn a_revoked_baseline_row_is_still_granted() {
        let policy = AccessPolicy::default();
        let rows = vec![("dashboard".to_string(), false)];
        let grants = build_grants(&policy, policy.default_catalog().to_vec(), &rows, false);
        assert!(grant(&grants, "dashboard").granted);
    }

    #[test]
    fn managers_hold_every_module() {
        let policy = AccessPolicy::default();
        let grants = build_grants(&policy, policy.default_catalog().to_vec(), &[], true);
        assert!(grants.iter().all(|g| g.granted && g.implicit));
    }

    #[test]
    fn grants_follow_catalog_order() {
        let policy = AccessPolicy::default();
        let mut catalog = policy.default_catalog().to_vec();
        catalog.reverse();
        let grants = build_grants(&policy, catalog, &[], false);
        assert_eq!(grants[0].module.name, "dashboard");
        assert_eq!(grants.last().unwrap().module.name, "profile");
    }
}
