//! Subscription plans and the limits they impose.
//!
//! The catalog ships with `free` and `pro` plans. A YAML file can replace
//! individual plans or add new ones:
//!
//! ```yaml
//! free:
//!   max_books: 10
//!   custom_covers: true
//! team:
//!   private_notes: true
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::db::User;

pub const DEFAULT_PLAN: &str = "free";

#[derive(Error, Diagnostic, Debug)]
pub enum PlanError {
    #[error("Failed to read plan file {path}: {source}")]
    #[diagnostic(code(bookbound::plans::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid plan file {path}: {source}")]
    #[diagnostic(
        code(bookbound::plans::yaml),
        help("Plans are a YAML mapping of plan key to limits")
    )]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Feature limits of one plan. `max_books: None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlanLimits {
    #[serde(default)]
    pub max_books: Option<i64>,
    #[serde(default)]
    pub private_notes: Option<bool>,
    #[serde(default)]
    pub custom_covers: Option<bool>,
}

/// What the API reports about a user's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionSummary {
    pub plan: String,
    pub max_books: Option<i64>,
    pub remaining_books: Option<i64>,
    pub private_notes: bool,
    pub custom_covers: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanCatalog {
    plans: BTreeMap<String, PlanLimits>,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        let mut plans = BTreeMap::new();
        plans.insert(
            DEFAULT_PLAN.to_string(),
            PlanLimits {
                max_books: Some(5),
                private_notes: Some(false),
                custom_covers: Some(true),
            },
        );
        plans.insert(
            "pro".to_string(),
            PlanLimits {
                max_books: None,
                private_notes: Some(true),
                custom_covers: Some(true),
            },
        );
        Self { plans }
    }
}

impl PlanCatalog {
    /// Default catalog with the plans from `yaml` layered on top.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let overrides: BTreeMap<String, PlanLimits> = serde_yaml::from_str(yaml)?;
        let mut catalog = Self::default();
        catalog.plans.extend(overrides);
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content).map_err(|source| PlanError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn plan(&self, key: &str) -> Option<&PlanLimits> {
        self.plans.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    /// The user's plan key if the catalog knows it, otherwise `free`.
    pub fn current_plan_key<'a>(&self, user: &'a User) -> &'a str {
        if self.plans.contains_key(&user.plan) {
            &user.plan
        } else {
            DEFAULT_PLAN
        }
    }

    pub fn limits_for(&self, user: &User) -> PlanLimits {
        self.plans
            .get(self.current_plan_key(user))
            .cloned()
            .unwrap_or_default()
    }

    pub fn can_add_book(&self, user: &User, current_count: usize) -> bool {
        match self.limits_for(user).max_books {
            None => true,
            Some(max) if max <= 0 => false,
            Some(max) => (current_count as i64) < max,
        }
    }

    /// `None` when the plan is unlimited.
    pub fn remaining_books(&self, user: &User, current_count: usize) -> Option<i64> {
        self.limits_for(user)
            .max_books
            .map(|max| (max - current_count as i64).max(0))
    }

    pub fn allow_private_notes(&self, user: &User) -> bool {
        self.limits_for(user).private_notes.unwrap_or(false)
    }

    pub fn allow_custom_covers(&self, user: &User) -> bool {
        self.limits_for(user).custom_covers.unwrap_or(false)
    }

    pub fn summary(&self, user: &User, current_count: usize) -> SubscriptionSummary {
        let limits = self.limits_for(user);
        SubscriptionSummary {
            plan: self.current_plan_key(user).to_string(),
            max_books: limits.max_books,
            remaining_books: self.remaining_books(user, current_count),
            private_notes: limits.private_notes.unwrap_or(false),
            custom_covers: limits.custom_covers.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn user_on(plan: &str) -> User {
        User {
            id: "u1".to_string(),
            name: "Reader".to_string(),
            email: "reader@example.com".to_string(),
            plan: plan.to_string(),
            settings: Map::new(),
            created_at: "2025-01-01 00:00:00".to_string(),
            updated_at: "2025-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_unknown_plan_falls_back_to_free() {
        let catalog = PlanCatalog::default();
        assert_eq!(catalog.current_plan_key(&user_on("gold")), "free");
        assert_eq!(catalog.current_plan_key(&user_on("pro")), "pro");
        assert_eq!(catalog.limits_for(&user_on("gold")).max_books, Some(5));
    }

    #[test]
    fn test_free_plan_limit() {
        let catalog = PlanCatalog::default();
        let user = user_on("free");

        assert!(catalog.can_add_book(&user, 4));
        assert!(!catalog.can_add_book(&user, 5));
        assert_eq!(catalog.remaining_books(&user, 3), Some(2));
        assert_eq!(catalog.remaining_books(&user, 9), Some(0));
    }

    #[test]
    fn test_pro_plan_is_unlimited() {
        let catalog = PlanCatalog::default();
        let user = user_on("pro");

        assert!(catalog.can_add_book(&user, 10_000));
        assert_eq!(catalog.remaining_books(&user, 10_000), None);
        assert!(catalog.allow_private_notes(&user));
        assert!(catalog.allow_custom_covers(&user));
    }

    #[test]
    fn test_zero_max_blocks_adding() {
        let catalog = PlanCatalog::from_yaml_str("closed:\n  max_books: 0\n").unwrap();
        let user = user_on("closed");

        assert!(!catalog.can_add_book(&user, 0));
        assert_eq!(catalog.remaining_books(&user, 0), Some(0));
    }

    #[test]
    fn test_unset_flags_default_to_false() {
        let catalog = PlanCatalog::from_yaml_str("team:\n  max_books: 50\n").unwrap();
        let user = user_on("team");

        assert!(!catalog.allow_private_notes(&user));
        assert!(!catalog.allow_custom_covers(&user));
    }

    #[test]
    fn test_yaml_overrides_keep_other_defaults() {
        let catalog =
            PlanCatalog::from_yaml_str("free:\n  max_books: 10\n  custom_covers: false\n")
                .unwrap();

        assert_eq!(catalog.plan("free").unwrap().max_books, Some(10));
        assert_eq!(catalog.plan("pro").unwrap().max_books, None);
        assert!(!catalog.allow_custom_covers(&user_on("free")));
        assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["free", "pro"]);
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        assert!(PlanCatalog::from_yaml_str("free: [1, 2").is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = PlanCatalog::load(Path::new("/nonexistent/plans.yaml")).unwrap_err();
        assert!(matches!(err, PlanError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plans.yaml");
        std::fs::write(&path, "pro:\n  max_books: 100\n  private_notes: true\n").unwrap();

        let catalog = PlanCatalog::load(&path).unwrap();
        assert_eq!(catalog.limits_for(&user_on("pro")).max_books, Some(100));
    }

    #[test]
    fn test_summary() {
        let catalog = PlanCatalog::default();
        let summary = catalog.summary(&user_on("free"), 2);

        assert_eq!(
            summary,
            SubscriptionSummary {
                plan: "free".to_string(),
                max_books: Some(5),
                remaining_books: Some(3),
                private_notes: false,
                custom_covers: true,
            }
        );
    }
}
