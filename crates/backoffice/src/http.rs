//! A `BackOffice` implementation that speaks to the real service over
//! HTTP: one canonical tool name per endpoint, JSON in, JSON out.
//!
//! Each task owns its own [`HttpBackOffice`] (and therefore its own
//! `reqwest::Client`) since the underlying HTTP session is not meant to be
//! shared across concurrent callers — mirrors the invoker's per-task
//! client in `ca-providers`.

use std::time::Duration;

use async_trait::async_trait;
use ca_domain::{Identity, ProjectTeamMember};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::error::Error;
use crate::trait_def::BackOffice;
use crate::types::*;

pub struct HttpBackOfficeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for HttpBackOfficeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpBackOffice {
    client: reqwest::Client,
    config: HttpBackOfficeConfig,
}

impl HttpBackOffice {
    pub fn new(config: HttpBackOfficeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// POST `args` to `{base_url}/api/{tool}` and decode the JSON result.
    /// A `404` maps to [`Error::NotFound`], `400`/`422` to
    /// [`Error::Validation`] (the body's `error` field, if present, is
    /// used as the message), anything else failing to `Error::Transport`.
    async fn call<T: DeserializeOwned>(&self, tool: &str, args: Value) -> Result<T, Error> {
        let url = format!("{}/api/{tool}", self.config.base_url.trim_end_matches('/'));
        let mut req = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(&args);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{tool}: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(tool.to_string()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::Transport(format!("{tool}: decoding response: {e}")))?;

        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("validation error")
                .to_string();
            return Err(Error::Validation(message));
        }

        if !status.is_success() {
            return Err(Error::Transport(format!("{tool}: HTTP {status}")));
        }

        serde_json::from_value(body).map_err(|e| Error::Transport(format!("{tool}: decoding result: {e}")))
    }
}

#[async_trait]
impl BackOffice for HttpBackOffice {
    async fn who_am_i(&self) -> Result<Identity, Error> {
        self.call("who_am_i", json!({})).await
    }

    async fn employees_list(&self, offset: u32, limit: u32) -> Result<EmployeesPage, Error> {
        self.call("employees_list", json!({ "offset": offset, "limit": limit })).await
    }

    async fn employees_search(&self, params: EmployeesSearchParams) -> Result<EmployeesPage, Error> {
        self.call(
            "employees_search",
            json!({
                "query": params.query,
                "location": params.location,
                "department": params.department,
                "manager": params.manager,
                "skills": params.skills,
                "wills": params.wills,
                "offset": params.offset,
                "limit": params.limit,
            }),
        )
        .await
    }

    async fn employees_get(&self, id: &str) -> Result<Employee, Error> {
        self.call("employees_get", json!({ "id": id })).await
    }

    async fn employees_update(&self, req: EmployeesUpdateRequest) -> Result<Employee, Error> {
        self.call(
            "employees_update",
            json!({
                "employee": req.employee,
                "salary": req.salary,
                "location": req.location,
                "department": req.department,
                "notes": req.notes,
                "skills": req.skills,
                "wills": req.wills,
                "changed_by": req.changed_by,
            }),
        )
        .await
    }

    async fn wiki_list(&self) -> Result<Vec<WikiFileSummary>, Error> {
        self.call("wiki_list", json!({})).await
    }

    async fn wiki_load(&self, file: &str) -> Result<WikiPage, Error> {
        self.call("wiki_load", json!({ "file": file })).await
    }

    async fn wiki_search(&self, query_regex: &str) -> Result<Vec<WikiSearchHit>, Error> {
        self.call("wiki_search", json!({ "query_regex": query_regex })).await
    }

    async fn wiki_update(&self, file: &str, content: &str, changed_by: &str) -> Result<WikiPage, Error> {
        self.call(
            "wiki_update",
            json!({ "file": file, "content": content, "changed_by": changed_by }),
        )
        .await
    }

    async fn customers_list(&self) -> Result<Vec<Customer>, Error> {
        self.call("customers_list", json!({})).await
    }

    async fn customers_get(&self, id: &str) -> Result<Customer, Error> {
        self.call("customers_get", json!({ "id": id })).await
    }

    async fn customers_search(&self, params: CustomersSearchParams) -> Result<Vec<Customer>, Error> {
        self.call(
            "customers_search",
            json!({
                "query": params.query,
                "locations": params.locations,
                "deal_phase": params.deal_phase,
                "account_managers": params.account_managers,
            }),
        )
        .await
    }

    async fn projects_list(&self) -> Result<Vec<Project>, Error> {
        self.call("projects_list", json!({})).await
    }

    async fn projects_get(&self, id: &str) -> Result<Project, Error> {
        self.call("projects_get", json!({ "id": id })).await
    }

    async fn projects_search(&self, params: ProjectsSearchParams) -> Result<ProjectsPage, Error> {
        let team = params.team.map(|t| {
            json!({
                "employee_id": t.employee_id,
                "role": t.role,
                "min_time_slice": t.min_time_slice,
            })
        });
        self.call(
            "projects_search",
            json!({
                "query": params.query,
                "customer_id": params.customer_id,
                "status": params.status,
                "team": team,
                "include_archived": params.include_archived,
                "offset": params.offset,
                "limit": params.limit,
            }),
        )
        .await
    }

    async fn projects_team_update(
        &self,
        id: &str,
        team: Vec<ProjectTeamMember>,
        changed_by: &str,
    ) -> Result<Project, Error> {
        self.call(
            "projects_team_update",
            json!({ "id": id, "team": team, "changed_by": changed_by }),
        )
        .await
    }

    async fn projects_status_update(&self, id: &str, status: &str, changed_by: &str) -> Result<Project, Error> {
        self.call(
            "projects_status_update",
            json!({ "id": id, "status": status, "changed_by": changed_by }),
        )
        .await
    }

    async fn time_log(&self, req: TimeLogRequest) -> Result<TimeEntry, Error> {
        self.call(
            "time_log",
            json!({
                "employee": req.employee,
                "project": req.project,
                "customer": req.customer,
                "date": req.date,
                "hours": req.hours,
                "work_category": req.work_category,
                "notes": req.notes,
                "billable": req.billable,
                "status": req.status,
                "logged_by": req.logged_by,
            }),
        )
        .await
    }

    async fn time_get(&self, id: &str) -> Result<TimeEntry, Error> {
        self.call("time_get", json!({ "id": id })).await
    }

    async fn time_search(&self, params: TimeSearchParams) -> Result<TimePage, Error> {
        self.call(
            "time_search",
            json!({
                "employee": params.employee,
                "project": params.project,
                "date_from": params.date_from,
                "date_to": params.date_to,
                "billable": params.billable,
                "offset": params.offset,
                "limit": params.limit,
            }),
        )
        .await
    }

    async fn time_update(&self, id: &str, fields: Map<String, Value>) -> Result<TimeEntry, Error> {
        let mut body = Map::new();
        body.insert("id".to_string(), json!(id));
        body.insert("fields".to_string(), Value::Object(fields));
        self.call("time_update", Value::Object(body)).await
    }

    async fn time_summary_by_employee(&self, params: TimeSummaryParams) -> Result<Vec<EmployeeTimeSummary>, Error> {
        self.call("time_summary_by_employee", time_summary_body(&params)).await
    }

    async fn time_summary_by_project(&self, params: TimeSummaryParams) -> Result<Vec<ProjectTimeSummary>, Error> {
        self.call("time_summary_by_project", time_summary_body(&params)).await
    }
}

fn time_summary_body(params: &TimeSummaryParams) -> Value {
    json!({
        "date_from": params.date_from,
        "date_to": params.date_to,
        "employees": params.employees,
        "projects": params.projects,
        "customers": params.customers,
        "billable": params.billable,
    })
}
