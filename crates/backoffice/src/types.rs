//! Typed request parameters and response entities for the back-office tool
//! surface. Field sets follow the canonical tool table exactly — this
//! crate does not define new capabilities, only typed plumbing for the
//! ones named there.

use ca_domain::{ProjectTeamMember, SkillLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub location: String,
    pub manager: Option<String>,
    pub salary: Option<f64>,
    pub skills: Vec<SkillLevel>,
    pub wills: Vec<SkillLevel>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeesPage {
    pub employees: Vec<Employee>,
    pub next_offset: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct EmployeesSearchParams {
    pub query: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub manager: Option<String>,
    pub skills: Vec<String>,
    pub wills: Vec<String>,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default)]
pub struct EmployeesUpdateRequest {
    pub employee: String,
    pub salary: Option<f64>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub notes: Option<String>,
    pub skills: Option<Vec<SkillLevel>>,
    pub wills: Option<Vec<SkillLevel>>,
    pub changed_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiFileSummary {
    pub file: String,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiPage {
    pub file: String,
    pub content: String,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiSearchHit {
    pub file: String,
    pub line: u32,
    pub excerpt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub deal_phase: String,
    pub account_manager: Option<String>,
    pub contacts: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomersSearchParams {
    pub query: Option<String>,
    pub locations: Vec<String>,
    pub deal_phase: Vec<String>,
    pub account_managers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub customer_id: Option<String>,
    pub status: String,
    pub team: Vec<ProjectTeamMember>,
    pub archived: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectsPage {
    pub projects: Vec<Project>,
    pub next_offset: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct TeamFilter {
    pub employee_id: Option<String>,
    pub role: Option<String>,
    pub min_time_slice: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectsSearchParams {
    pub query: Option<String>,
    pub customer_id: Option<String>,
    pub status: Vec<String>,
    pub team: Option<TeamFilter>,
    pub include_archived: bool,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub employee: String,
    pub project: Option<String>,
    pub customer: Option<String>,
    pub date: String,
    pub hours: f64,
    pub work_category: String,
    pub notes: Option<String>,
    pub billable: bool,
    pub status: String,
    pub logged_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct TimeLogRequest {
    pub employee: String,
    pub project: Option<String>,
    pub customer: Option<String>,
    pub date: String,
    pub hours: f64,
    pub work_category: String,
    pub notes: Option<String>,
    pub billable: bool,
    pub status: String,
    pub logged_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct TimeSearchParams {
    pub employee: Option<String>,
    pub project: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub billable: Option<bool>,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimePage {
    pub entries: Vec<TimeEntry>,
    pub next_offset: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct TimeSummaryParams {
    pub date_from: String,
    pub date_to: String,
    pub employees: Vec<String>,
    pub projects: Vec<String>,
    pub customers: Vec<String>,
    pub billable: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeTimeSummary {
    pub employee: String,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTimeSummary {
    pub project: String,
    pub total_hours: f64,
}
