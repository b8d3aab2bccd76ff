use serde::{Deserialize, Serialize};
use validator::Validate;

use super::robot::Robot;

/// `project_id` value selecting robots of every project the caller can see.
pub const ALL_PROJECTS: i64 = 0;

/// Default number of robots per page.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// How a query matches robot names. Matching is case-sensitive in both modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum NameFilter {
    Exact(String),
    /// Substring match ("fuzzy" in listing APIs)
    Contains(String),
}

impl NameFilter {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameFilter::Exact(expected) => name == expected,
            NameFilter::Contains(needle) => name.contains(needle.as_str()),
        }
    }
}

/// Explicit tri-state filter on the disabled flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledFilter {
    #[default]
    Any,
    /// Only robots with `disabled = false`
    Enabled,
    /// Only robots with `disabled = true`
    Disabled,
}

impl DisabledFilter {
    /// Map an optional `disabled` query parameter; absence means [`DisabledFilter::Any`].
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => DisabledFilter::Any,
            Some(true) => DisabledFilter::Disabled,
            Some(false) => DisabledFilter::Enabled,
        }
    }

    /// The flag value this filter requires, if any.
    pub fn required(&self) -> Option<bool> {
        match self {
            DisabledFilter::Any => None,
            DisabledFilter::Enabled => Some(false),
            DisabledFilter::Disabled => Some(true),
        }
    }

    pub fn matches(&self, disabled: bool) -> bool {
        self.required().is_none_or(|want| want == disabled)
    }
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Pagination {
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: u64,
    #[validate(range(min = 1, message = "page size must be at least 1"))]
    pub size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

/// Selection over stored robots. Read-only.
///
/// Results are ordered by creation time, then id, both ascending, so the
/// same query over unchanged data always yields the same page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct RobotQuery {
    pub name: Option<NameFilter>,
    /// Restrict to one project; [`ALL_PROJECTS`] (0) disables the restriction
    pub project_id: i64,
    pub disabled: DisabledFilter,
    /// Include robots created hidden (internal accounts)
    pub include_hidden: bool,
    #[validate(nested)]
    pub pagination: Pagination,
}

impl RobotQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_project(project_id: i64) -> Self {
        Self {
            project_id,
            ..Self::default()
        }
    }

    pub fn name_exact(mut self, name: impl Into<String>) -> Self {
        self.name = Some(NameFilter::Exact(name.into()));
        self
    }

    pub fn name_contains(mut self, needle: impl Into<String>) -> Self {
        self.name = Some(NameFilter::Contains(needle.into()));
        self
    }

    pub fn with_disabled(mut self, filter: DisabledFilter) -> Self {
        self.disabled = filter;
        self
    }

    pub fn with_hidden(mut self) -> Self {
        self.include_hidden = true;
        self
    }

    pub fn page(mut self, page: u64, size: u64) -> Self {
        self.pagination = Pagination::new(page, size);
        self
    }

    /// Whether a single robot passes every filter (pagination aside).
    pub fn matches(&self, robot: &Robot) -> bool {
        if self.project_id != ALL_PROJECTS && robot.project_id != self.project_id {
            return false;
        }
        if !self.include_hidden && !robot.visible {
            return false;
        }
        if !self.disabled.matches(robot.disabled) {
            return false;
        }
        self.name
            .as_ref()
            .is_none_or(|filter| filter.matches(&robot.name))
    }

    /// Apply filters, stable ordering and pagination to an in-memory set.
    ///
    /// Storage backends that push the query down must return the same page.
    pub fn select<'a>(&self, robots: impl IntoIterator<Item = &'a Robot>) -> RobotPage {
        let mut matched: Vec<&Robot> = robots.into_iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(usize::try_from(self.pagination.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(self.pagination.size).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        RobotPage::new(items, total, self.pagination)
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RobotPage {
    pub items: Vec<Robot>,
    /// Matching robots across all pages
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

impl RobotPage {
    pub fn new(items: Vec<Robot>, total: u64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            size: pagination.size,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(self.size)
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|r| r.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::models::Expiration;

    fn robot(id: i64, name: &str, project_id: i64, offset_secs: i64) -> Robot {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs);
        Robot {
            id,
            name: name.to_string(),
            description: None,
            project_id,
            expires_at: Expiration::Never,
            disabled: false,
            visible: true,
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn test_fuzzy_project_query_returns_creation_order() {
        let robots = vec![
            robot(1, "ci-bot", 5, 0),
            robot(2, "ci-deploy", 5, 1),
            robot(3, "other", 5, 2),
        ];
        let page = RobotQuery::for_project(5)
            .name_contains("ci")
            .page(1, 10)
            .select(&robots);

        assert_eq!(page.names(), vec!["ci-bot", "ci-deploy"]);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_order_ignores_input_order_and_breaks_ties_by_id() {
        let robots = vec![
            robot(9, "late", 1, 10),
            robot(4, "tie-b", 1, 5),
            robot(3, "tie-a", 1, 5),
        ];
        let page = RobotQuery::all().select(&robots);
        assert_eq!(page.names(), vec!["tie-a", "tie-b", "late"]);
    }

    #[test]
    fn test_exact_name_does_not_match_substring() {
        let robots = vec![robot(1, "ci", 1, 0), robot(2, "ci-bot", 1, 1)];
        let page = RobotQuery::all().name_exact("ci").select(&robots);
        assert_eq!(page.names(), vec!["ci"]);
    }

    #[test]
    fn test_name_match_is_case_sensitive() {
        let robots = vec![robot(1, "CI-bot", 1, 0)];
        assert!(RobotQuery::all().name_contains("ci").select(&robots).items.is_empty());
        assert!(RobotQuery::all().name_exact("ci-bot").select(&robots).items.is_empty());
    }

    #[test]
    fn test_project_zero_means_all_projects() {
        let robots = vec![robot(1, "a", 1, 0), robot(2, "b", 2, 1)];
        assert_eq!(RobotQuery::for_project(ALL_PROJECTS).select(&robots).total, 2);
        assert_eq!(RobotQuery::for_project(2).select(&robots).names(), vec!["b"]);
    }

    #[test]
    fn test_disabled_tri_state() {
        let mut off = robot(2, "off", 1, 1);
        off.disabled = true;
        let robots = vec![robot(1, "on", 1, 0), off];

        let q = RobotQuery::all();
        assert_eq!(q.clone().select(&robots).total, 2);
        assert_eq!(
            q.clone()
                .with_disabled(DisabledFilter::Enabled)
                .select(&robots)
                .names(),
            vec!["on"]
        );
        assert_eq!(
            q.with_disabled(DisabledFilter::Disabled)
                .select(&robots)
                .names(),
            vec!["off"]
        );
    }

    #[test]
    fn test_from_flag() {
        assert_eq!(DisabledFilter::from_flag(None), DisabledFilter::Any);
        assert_eq!(DisabledFilter::from_flag(Some(false)), DisabledFilter::Enabled);
        assert_eq!(DisabledFilter::from_flag(Some(true)), DisabledFilter::Disabled);
    }

    #[test]
    fn test_hidden_excluded_unless_requested() {
        let mut hidden = robot(2, "internal", 1, 1);
        hidden.visible = false;
        let robots = vec![robot(1, "public", 1, 0), hidden];

        assert_eq!(RobotQuery::all().select(&robots).names(), vec!["public"]);
        assert_eq!(RobotQuery::all().with_hidden().select(&robots).total, 2);
    }

    #[test]
    fn test_pagination_slices_and_reports_total() {
        let robots: Vec<Robot> = (0..7)
            .map(|i| robot(i + 1, &format!("bot-{i}"), 1, i))
            .collect();

        let second = RobotQuery::all().page(2, 3).select(&robots);
        assert_eq!(second.names(), vec!["bot-3", "bot-4", "bot-5"]);
        assert_eq!(second.total, 7);
        assert_eq!(second.total_pages(), 3);
        assert!(second.has_more());

        let last = RobotQuery::all().page(3, 3).select(&robots);
        assert_eq!(last.names(), vec!["bot-6"]);
        assert!(!last.has_more());

        let beyond = RobotQuery::all().page(9, 3).select(&robots);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 7);
    }

    #[test]
    fn test_zero_page_or_size_fails_validation() {
        assert!(RobotQuery::all().page(0, 10).validate().is_err());
        assert!(RobotQuery::all().page(1, 0).validate().is_err());
        assert!(RobotQuery::all().page(1, 1).validate().is_ok());
    }
}
