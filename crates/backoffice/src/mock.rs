//! In-memory `BackOffice` for tests. Not wired into the gateway binary —
//! gated behind the `test-support` feature so only test code in this
//! workspace can depend on it.

use std::collections::HashMap;

use async_trait::async_trait;
use ca_domain::{Identity, ProjectTeamMember};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::trait_def::BackOffice;
use crate::types::*;

#[derive(Default)]
struct State {
    employees: HashMap<String, Employee>,
    customers: HashMap<String, Customer>,
    projects: HashMap<String, Project>,
    time_entries: HashMap<String, TimeEntry>,
    wiki: HashMap<String, String>,
    next_time_id: u32,
}

pub struct MockBackOffice {
    identity: Identity,
    state: RwLock<State>,
}

impl MockBackOffice {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            state: RwLock::new(State::default()),
        }
    }

    pub fn seed_employee(&self, employee: Employee) {
        self.state.write().employees.insert(employee.id.clone(), employee);
    }

    pub fn seed_customer(&self, customer: Customer) {
        self.state.write().customers.insert(customer.id.clone(), customer);
    }

    pub fn seed_project(&self, project: Project) {
        self.state.write().projects.insert(project.id.clone(), project);
    }

    pub fn seed_wiki_page(&self, file: impl Into<String>, content: impl Into<String>) {
        self.state.write().wiki.insert(file.into(), content.into());
    }
}

fn wiki_hash(content: &str) -> String {
    format!("{:x}", content.len())
}

#[async_trait]
impl BackOffice for MockBackOffice {
    async fn who_am_i(&self) -> Result<Identity, Error> {
        Ok(self.identity.clone())
    }

    async fn employees_list(&self, offset: u32, limit: u32) -> Result<EmployeesPage, Error> {
        let state = self.state.read();
        let mut all: Vec<Employee> = state.employees.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        let end = (offset as usize + limit as usize).min(all.len());
        let start = (offset as usize).min(all.len());
        let page = all[start..end].to_vec();
        let next_offset = if end < all.len() { Some(end as u32) } else { None };
        Ok(EmployeesPage {
            employees: page,
            next_offset,
        })
    }

    async fn employees_search(&self, params: EmployeesSearchParams) -> Result<EmployeesPage, Error> {
        let state = self.state.read();
        let mut matched: Vec<Employee> = state
            .employees
            .values()
            .filter(|e| {
                params
                    .department
                    .as_ref()
                    .map(|d| &e.department == d)
                    .unwrap_or(true)
                    && params.location.as_ref().map(|l| &e.location == l).unwrap_or(true)
                    && params
                        .manager
                        .as_ref()
                        .map(|m| e.manager.as_deref() == Some(m.as_str()))
                        .unwrap_or(true)
                    && params
                        .query
                        .as_ref()
                        .map(|q| e.name.to_lowercase().contains(&q.to_lowercase()))
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        let end = (params.offset as usize + params.limit as usize).min(matched.len());
        let start = (params.offset as usize).min(matched.len());
        let page = matched[start..end].to_vec();
        let next_offset = if end < matched.len() { Some(end as u32) } else { None };
        Ok(EmployeesPage {
            employees: page,
            next_offset,
        })
    }

    async fn employees_get(&self, id: &str) -> Result<Employee, Error> {
        self.state
            .read()
            .employees
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("employee {id} not found")))
    }

    async fn employees_update(&self, req: EmployeesUpdateRequest) -> Result<Employee, Error> {
        let mut state = self.state.write();
        let employee = state
            .employees
            .get_mut(&req.employee)
            .ok_or_else(|| Error::NotFound(format!("employee {} not found", req.employee)))?;
        if let Some(salary) = req.salary {
            employee.salary = Some(salary);
        }
        if let Some(location) = req.location {
            employee.location = location;
        }
        if let Some(department) = req.department {
            employee.department = department;
        }
        if req.notes.is_some() {
            employee.notes = req.notes;
        }
        if let Some(skills) = req.skills {
            employee.skills = skills;
        }
        if let Some(wills) = req.wills {
            employee.wills = wills;
        }
        Ok(employee.clone())
    }

    async fn wiki_list(&self) -> Result<Vec<WikiFileSummary>, Error> {
        Ok(self
            .state
            .read()
            .wiki
            .iter()
            .map(|(file, content)| WikiFileSummary {
                file: file.clone(),
                hash: wiki_hash(content),
            })
            .collect())
    }

    async fn wiki_load(&self, file: &str) -> Result<WikiPage, Error> {
        let state = self.state.read();
        let content = state
            .wiki
            .get(file)
            .ok_or_else(|| Error::NotFound(format!("wiki file {file} not found")))?;
        Ok(WikiPage {
            file: file.to_string(),
            content: content.clone(),
            hash: wiki_hash(content),
        })
    }

    async fn wiki_search(&self, query_regex: &str) -> Result<Vec<WikiSearchHit>, Error> {
        let re = regex_lite(query_regex)?;
        let state = self.state.read();
        let mut hits = Vec::new();
        for (file, content) in state.wiki.iter() {
            for (idx, line) in content.lines().enumerate() {
                if re.is_match(line) {
                    hits.push(WikiSearchHit {
                        file: file.clone(),
                        line: idx as u32 + 1,
                        excerpt: line.to_string(),
                    });
                }
            }
        }
        Ok(hits)
    }

    async fn wiki_update(&self, file: &str, content: &str, _changed_by: &str) -> Result<WikiPage, Error> {
        self.state.write().wiki.insert(file.to_string(), content.to_string());
        Ok(WikiPage {
            file: file.to_string(),
            content: content.to_string(),
            hash: wiki_hash(content),
        })
    }

    async fn customers_list(&self) -> Result<Vec<Customer>, Error> {
        Ok(self.state.read().customers.values().cloned().collect())
    }

    async fn customers_get(&self, id: &str) -> Result<Customer, Error> {
        self.state
            .read()
            .customers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("customer {id} not found")))
    }

    async fn customers_search(&self, params: CustomersSearchParams) -> Result<Vec<Customer>, Error> {
        let state = self.state.read();
        Ok(state
            .customers
            .values()
            .filter(|c| {
                (params.locations.is_empty()
                    || c.location
                        .as_ref()
                        .map(|l| params.locations.contains(l))
                        .unwrap_or(false))
                    && (params.deal_phase.is_empty() || params.deal_phase.contains(&c.deal_phase))
                    && (params.account_managers.is_empty()
                        || c.account_manager
                            .as_ref()
                            .map(|m| params.account_managers.contains(m))
                            .unwrap_or(false))
                    && params
                        .query
                        .as_ref()
                        .map(|q| c.name.to_lowercase().contains(&q.to_lowercase()))
                        .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn projects_list(&self) -> Result<Vec<Project>, Error> {
        Ok(self.state.read().projects.values().cloned().collect())
    }

    async fn projects_get(&self, id: &str) -> Result<Project, Error> {
        self.state
            .read()
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("project {id} not found")))
    }

    async fn projects_search(&self, params: ProjectsSearchParams) -> Result<ProjectsPage, Error> {
        let state = self.state.read();
        let mut matched: Vec<Project> = state
            .projects
            .values()
            .filter(|p| {
                (params.include_archived || !p.archived)
                    && params
                        .customer_id
                        .as_ref()
                        .map(|c| p.customer_id.as_deref() == Some(c.as_str()))
                        .unwrap_or(true)
                    && (params.status.is_empty() || params.status.contains(&p.status))
                    && params
                        .team
                        .as_ref()
                        .and_then(|f| f.employee_id.as_ref())
                        .map(|emp| p.team.iter().any(|m| &m.employee == emp))
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        let end = (params.offset as usize + params.limit as usize).min(matched.len());
        let start = (params.offset as usize).min(matched.len());
        let page = matched[start..end].to_vec();
        let next_offset = if end < matched.len() { Some(end as u32) } else { None };
        Ok(ProjectsPage {
            projects: page,
            next_offset,
        })
    }

    async fn projects_team_update(
        &self,
        id: &str,
        team: Vec<ProjectTeamMember>,
        _changed_by: &str,
    ) -> Result<Project, Error> {
        let mut state = self.state.write();
        let project = state
            .projects
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("project {id} not found")))?;
        project.team = team;
        Ok(project.clone())
    }

    async fn projects_status_update(&self, id: &str, status: &str, _changed_by: &str) -> Result<Project, Error> {
        const VALID: &[&str] = &["idea", "exploring", "active", "paused", "archived"];
        if !VALID.contains(&status) {
            return Err(Error::Validation(format!("unknown project status {status}")));
        }
        let mut state = self.state.write();
        let project = state
            .projects
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("project {id} not found")))?;
        project.status = status.to_string();
        project.archived = status == "archived";
        Ok(project.clone())
    }

    async fn time_log(&self, req: TimeLogRequest) -> Result<TimeEntry, Error> {
        let mut state = self.state.write();
        state.next_time_id += 1;
        let id = format!("time_{}", state.next_time_id);
        let entry = TimeEntry {
            id: id.clone(),
            employee: req.employee,
            project: req.project,
            customer: req.customer,
            date: req.date,
            hours: req.hours,
            work_category: req.work_category,
            notes: req.notes,
            billable: req.billable,
            status: req.status,
            logged_by: req.logged_by,
        };
        state.time_entries.insert(id, entry.clone());
        Ok(entry)
    }

    async fn time_get(&self, id: &str) -> Result<TimeEntry, Error> {
        self.state
            .read()
            .time_entries
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("time entry {id} not found")))
    }

    async fn time_search(&self, params: TimeSearchParams) -> Result<TimePage, Error> {
        let state = self.state.read();
        let mut matched: Vec<TimeEntry> = state
            .time_entries
            .values()
            .filter(|t| {
                params.employee.as_ref().map(|e| &t.employee == e).unwrap_or(true)
                    && params.project.as_ref().map(|p| t.project.as_deref() == Some(p.as_str())).unwrap_or(true)
                    && params.billable.map(|b| t.billable == b).unwrap_or(true)
                    && in_date_range(&t.date, &params.date_from, &params.date_to)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        let end = (params.offset as usize + params.limit as usize).min(matched.len());
        let start = (params.offset as usize).min(matched.len());
        let page = matched[start..end].to_vec();
        let next_offset = if end < matched.len() { Some(end as u32) } else { None };
        Ok(TimePage {
            entries: page,
            next_offset,
        })
    }

    async fn time_update(&self, id: &str, fields: Map<String, Value>) -> Result<TimeEntry, Error> {
        let mut state = self.state.write();
        let entry = state
            .time_entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("time entry {id} not found")))?;
        if let Some(hours) = fields.get("hours").and_then(Value::as_f64) {
            entry.hours = hours;
        }
        if let Some(status) = fields.get("status").and_then(Value::as_str) {
            entry.status = status.to_string();
        }
        if let Some(billable) = fields.get("billable").and_then(Value::as_bool) {
            entry.billable = billable;
        }
        Ok(entry.clone())
    }

    async fn time_summary_by_employee(
        &self,
        params: TimeSummaryParams,
    ) -> Result<Vec<EmployeeTimeSummary>, Error> {
        let state = self.state.read();
        let mut totals: HashMap<String, f64> = HashMap::new();
        for entry in state.time_entries.values() {
            if !in_date_range(&entry.date, &Some(params.date_from.clone()), &Some(params.date_to.clone())) {
                continue;
            }
            if !params.employees.is_empty() && !params.employees.contains(&entry.employee) {
                continue;
            }
            if let Some(billable) = params.billable {
                if entry.billable != billable {
                    continue;
                }
            }
            *totals.entry(entry.employee.clone()).or_default() += entry.hours;
        }
        Ok(totals
            .into_iter()
            .map(|(employee, total_hours)| EmployeeTimeSummary { employee, total_hours })
            .collect())
    }

    async fn time_summary_by_project(
        &self,
        params: TimeSummaryParams,
    ) -> Result<Vec<ProjectTimeSummary>, Error> {
        let state = self.state.read();
        let mut totals: HashMap<String, f64> = HashMap::new();
        for entry in state.time_entries.values() {
            if !in_date_range(&entry.date, &Some(params.date_from.clone()), &Some(params.date_to.clone())) {
                continue;
            }
            let Some(project) = &entry.project else { continue };
            if !params.projects.is_empty() && !params.projects.contains(project) {
                continue;
            }
            if let Some(billable) = params.billable {
                if entry.billable != billable {
                    continue;
                }
            }
            *totals.entry(project.clone()).or_default() += entry.hours;
        }
        Ok(totals
            .into_iter()
            .map(|(project, total_hours)| ProjectTimeSummary { project, total_hours })
            .collect())
    }
}

fn in_date_range(date: &str, from: &Option<String>, to: &Option<String>) -> bool {
    let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
        return true;
    };
    if let Some(from) = from {
        if let Ok(from) = NaiveDate::parse_from_str(from, "%Y-%m-%d") {
            if d < from {
                return false;
            }
        }
    }
    if let Some(to) = to {
        if let Ok(to) = NaiveDate::parse_from_str(to, "%Y-%m-%d") {
            if d > to {
                return false;
            }
        }
    }
    true
}

fn regex_lite(pattern: &str) -> Result<regex::Regex, Error> {
    regex::Regex::new(pattern).map_err(|e| Error::Validation(format!("invalid query_regex: {e}")))
}
