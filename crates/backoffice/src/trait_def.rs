use async_trait::async_trait;
use ca_domain::{Identity, ProjectTeamMember};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::types::*;

/// The back-office API as the core consumes it: one method per tool in the
/// canonical surface. Concrete implementations live outside this crate
/// (an HTTP client against the real service, or — for tests only — the
/// in-memory `MockBackOffice` behind the `test-support` feature).
#[async_trait]
pub trait BackOffice: Send + Sync {
    async fn who_am_i(&self) -> Result<Identity, Error>;

    async fn employees_list(&self, offset: u32, limit: u32) -> Result<EmployeesPage, Error>;
    async fn employees_search(&self, params: EmployeesSearchParams) -> Result<EmployeesPage, Error>;
    async fn employees_get(&self, id: &str) -> Result<Employee, Error>;
    async fn employees_update(&self, req: EmployeesUpdateRequest) -> Result<Employee, Error>;

    async fn wiki_list(&self) -> Result<Vec<WikiFileSummary>, Error>;
    async fn wiki_load(&self, file: &str) -> Result<WikiPage, Error>;
    async fn wiki_search(&self, query_regex: &str) -> Result<Vec<WikiSearchHit>, Error>;
    async fn wiki_update(&self, file: &str, content: &str, changed_by: &str) -> Result<WikiPage, Error>;

    async fn customers_list(&self) -> Result<Vec<Customer>, Error>;
    async fn customers_get(&self, id: &str) -> Result<Customer, Error>;
    async fn customers_search(&self, params: CustomersSearchParams) -> Result<Vec<Customer>, Error>;

    async fn projects_list(&self) -> Result<Vec<Project>, Error>;
    async fn projects_get(&self, id: &str) -> Result<Project, Error>;
    async fn projects_search(&self, params: ProjectsSearchParams) -> Result<ProjectsPage, Error>;
    async fn projects_team_update(
        &self,
        id: &str,
        team: Vec<ProjectTeamMember>,
        changed_by: &str,
    ) -> Result<Project, Error>;
    async fn projects_status_update(&self, id: &str, status: &str, changed_by: &str) -> Result<Project, Error>;

    async fn time_log(&self, req: TimeLogRequest) -> Result<TimeEntry, Error>;
    async fn time_get(&self, id: &str) -> Result<TimeEntry, Error>;
    async fn time_search(&self, params: TimeSearchParams) -> Result<TimePage, Error>;
    async fn time_update(&self, id: &str, fields: Map<String, Value>) -> Result<TimeEntry, Error>;
    async fn time_summary_by_employee(
        &self,
        params: TimeSummaryParams,
    ) -> Result<Vec<EmployeeTimeSummary>, Error>;
    async fn time_summary_by_project(
        &self,
        params: TimeSummaryParams,
    ) -> Result<Vec<ProjectTimeSummary>, Error>;
}
