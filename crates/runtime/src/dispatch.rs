//! Maps a `TypedAction` onto the `BackOffice` trait and renders the
//! result as the feedback lines the action processor appends to the
//! turn's execution log.

use ca_backoffice::{
    BackOffice, CustomersSearchParams, EmployeesSearchParams, EmployeesUpdateRequest,
    ProjectsSearchParams, TeamFilter, TimeLogRequest, TimeSearchParams, TimeSummaryParams,
};
use ca_domain::{ActionOutcome, Link, TypedAction};
use serde_json::json;

/// Dispatch one typed action to the back-office and render its outcome.
/// Never returns an `Err` — back-office failures become a `FAILED:` result
/// line so the turn loop can keep going.
pub async fn dispatch(action: &TypedAction, backoffice: &dyn BackOffice) -> ActionOutcome {
    match action {
        TypedAction::WhoAmI => match backoffice.who_am_i().await {
            Ok(identity) => ActionOutcome::ok(format!(
                "Identity: user_id={:?}, department={:?}, location={:?}",
                identity.user_id, identity.department, identity.location
            )),
            Err(e) => ActionOutcome::failed(e.to_string()),
        },

        TypedAction::EmployeesList { offset, limit } => {
            match backoffice.employees_list(*offset, *limit).await {
                Ok(page) => ActionOutcome::ok(format!(
                    "{} employee(s): {}",
                    page.employees.len(),
                    page.employees.iter().map(|e| e.id.as_str()).collect::<Vec<_>>().join(", ")
                )),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }
        TypedAction::EmployeesSearch {
            query,
            location,
            department,
            manager,
            skills,
            wills,
            offset,
            limit,
        } => {
            let params = EmployeesSearchParams {
                query: query.clone(),
                location: location.clone(),
                department: department.clone(),
                manager: manager.clone(),
                skills: skills.clone(),
                wills: wills.clone(),
                offset: *offset,
                limit: *limit,
            };
            match backoffice.employees_search(params).await {
                Ok(page) => ActionOutcome::ok(format!(
                    "{} employee(s) matched: {}",
                    page.employees.len(),
                    page.employees.iter().map(|e| e.id.as_str()).collect::<Vec<_>>().join(", ")
                )),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }
        TypedAction::EmployeesGet { id } => match backoffice.employees_get(id).await {
            Ok(employee) => ActionOutcome::ok(format!(
                "{}: {} ({}, {})",
                employee.id, employee.name, employee.department, employee.location
            )),
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::EmployeesUpdate {
            employee,
            salary,
            location,
            department,
            notes,
            skills,
            wills,
            changed_by,
        } => {
            let req = EmployeesUpdateRequest {
                employee: employee.clone(),
                salary: *salary,
                location: location.clone(),
                department: department.clone(),
                notes: notes.clone(),
                skills: skills.clone(),
                wills: wills.clone(),
                changed_by: changed_by.clone(),
            };
            match backoffice.employees_update(req).await {
                Ok(updated) => ActionOutcome::ok(format!("Updated employee {}", updated.id)),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }

        TypedAction::WikiList => match backoffice.wiki_list().await {
            Ok(files) => ActionOutcome::ok(format!(
                "{} wiki file(s): {}",
                files.len(),
                files.iter().map(|f| f.file.as_str()).collect::<Vec<_>>().join(", ")
            )),
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::WikiLoad { file } => match backoffice.wiki_load(file).await {
            Ok(page) => {
                let mut outcome = ActionOutcome::ok(format!("{}:\n{}", page.file, page.content));
                outcome
                    .shared_updates
                    .insert(loaded_wiki_key(&page.file), json!(page.content));
                outcome
            }
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::WikiSearch { query_regex } => match backoffice.wiki_search(query_regex).await {
            Ok(hits) => ActionOutcome::ok(format!(
                "{} hit(s): {}",
                hits.len(),
                hits.iter()
                    .map(|h| format!("{}:{} {}", h.file, h.line, h.excerpt))
                    .collect::<Vec<_>>()
                    .join(" | ")
            )),
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::WikiUpdate {
            file,
            content,
            changed_by,
        } => match backoffice.wiki_update(file, content, changed_by).await {
            Ok(page) => {
                let mut outcome = ActionOutcome::ok(format!("Updated wiki page {}", page.file));
                outcome
                    .shared_updates
                    .insert(loaded_wiki_key(&page.file), json!(page.content));
                if content.is_empty() {
                    outcome
                        .shared_updates
                        .insert("deleted_wiki_file".to_string(), json!(page.file));
                }
                outcome
            }
            Err(e) => ActionOutcome::failed(e.to_string()),
        },

        TypedAction::CustomersList => match backoffice.customers_list().await {
            Ok(customers) => ActionOutcome::ok(format!(
                "{} customer(s): {}",
                customers.len(),
                customers.iter().map(|c| c.id.as_str()).collect::<Vec<_>>().join(", ")
            )),
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::CustomersGet { id } => match backoffice.customers_get(id).await {
            Ok(customer) => ActionOutcome::ok(format!("{}: {}", customer.id, customer.name)),
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::CustomersSearch {
            query,
            locations,
            deal_phase,
            account_managers,
        } => {
            let params = CustomersSearchParams {
                query: query.clone(),
                locations: locations.clone(),
                deal_phase: deal_phase.clone(),
                account_managers: account_managers.clone(),
            };
            match backoffice.customers_search(params).await {
                Ok(customers) => ActionOutcome::ok(format!(
                    "{} customer(s) matched: {}",
                    customers.len(),
                    customers.iter().map(|c| c.id.as_str()).collect::<Vec<_>>().join(", ")
                )),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }

        TypedAction::ProjectsList => match backoffice.projects_list().await {
            Ok(projects) => ActionOutcome::ok(format!(
                "{} project(s): {}",
                projects.len(),
                projects.iter().map(|p| p.id.as_str()).collect::<Vec<_>>().join(", ")
            )),
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::ProjectsGet { id } => match backoffice.projects_get(id).await {
            Ok(project) => ActionOutcome::ok(format!("{}: {} ({})", project.id, project.name, project.status)),
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::ProjectsSearch {
            query,
            customer_id,
            status,
            team_employee_id,
            team_role,
            team_min_time_slice,
            include_archived,
            offset,
            limit,
        } => {
            let team = if team_employee_id.is_some() || team_role.is_some() || team_min_time_slice.is_some() {
                Some(TeamFilter {
                    employee_id: team_employee_id.clone(),
                    role: team_role.clone(),
                    min_time_slice: *team_min_time_slice,
                })
            } else {
                None
            };
            let params = ProjectsSearchParams {
                query: query.clone(),
                customer_id: customer_id.clone(),
                status: status.clone(),
                team,
                include_archived: *include_archived,
                offset: *offset,
                limit: *limit,
            };
            match backoffice.projects_search(params).await {
                Ok(page) => ActionOutcome::ok(format!(
                    "{} project(s) matched: {}",
                    page.projects.len(),
                    page.projects.iter().map(|p| p.id.as_str()).collect::<Vec<_>>().join(", ")
                )),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }
        TypedAction::ProjectsTeamUpdate { id, team, changed_by } => {
            match backoffice.projects_team_update(id, team.clone(), changed_by).await {
                Ok(project) => ActionOutcome::ok(format!(
                    "Updated team for {}: {} member(s)",
                    project.id,
                    project.team.len()
                )),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }
        TypedAction::ProjectsStatusUpdate { id, status, changed_by } => {
            match backoffice.projects_status_update(id, status, changed_by).await {
                Ok(project) => ActionOutcome::ok(format!("Updated {} status to {}", project.id, project.status)),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }

        TypedAction::TimeLog {
            employee,
            project,
            customer,
            date,
            hours,
            work_category,
            notes,
            billable,
            status,
            logged_by,
        } => {
            let req = TimeLogRequest {
                employee: employee.clone(),
                project: project.clone(),
                customer: customer.clone(),
                date: date.clone(),
                hours: *hours,
                work_category: work_category.clone(),
                notes: notes.clone(),
                billable: *billable,
                status: status.clone(),
                logged_by: logged_by.clone(),
            };
            match backoffice.time_log(req).await {
                Ok(entry) => ActionOutcome::ok(format!("Logged time entry {} ({} hours)", entry.id, entry.hours)),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }
        TypedAction::TimeGet { id } => match backoffice.time_get(id).await {
            Ok(entry) => ActionOutcome::ok(format!(
                "{}: {} logged {} hours on {}",
                entry.id, entry.employee, entry.hours, entry.date
            )),
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::TimeSearch {
            employee,
            project,
            date_from,
            date_to,
            billable,
            offset,
            limit,
        } => {
            let params = TimeSearchParams {
                employee: employee.clone(),
                project: project.clone(),
                date_from: date_from.clone(),
                date_to: date_to.clone(),
                billable: *billable,
                offset: *offset,
                limit: *limit,
            };
            match backoffice.time_search(params).await {
                Ok(page) => ActionOutcome::ok(format!(
                    "{} time entr{}: {}",
                    page.entries.len(),
                    if page.entries.len() == 1 { "y" } else { "ies" },
                    page.entries.iter().map(|e| e.id.as_str()).collect::<Vec<_>>().join(", ")
                )),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }
        TypedAction::TimeUpdate { id, fields } => match backoffice.time_update(id, fields.clone()).await {
            Ok(entry) => {
                let mut outcome = ActionOutcome::ok(format!("Updated time entry {}", entry.id));
                let mut entities = Vec::new();
                if let Some(project) = &entry.project {
                    entities.push(Link::project(project));
                }
                entities.push(Link::employee(&entry.employee));
                if entry.logged_by != entry.employee {
                    entities.push(Link::employee(&entry.logged_by));
                }
                outcome
                    .shared_updates
                    .insert("time_update_entities".to_string(), json!(entities));
                outcome
            }
            Err(e) => ActionOutcome::failed(e.to_string()),
        },
        TypedAction::TimeSummaryByEmployee {
            date_from,
            date_to,
            employees,
            projects,
            customers,
            billable,
        } => {
            let params = TimeSummaryParams {
                date_from: date_from.clone(),
                date_to: date_to.clone(),
                employees: employees.clone(),
                projects: projects.clone(),
                customers: customers.clone(),
                billable: *billable,
            };
            match backoffice.time_summary_by_employee(params).await {
                Ok(summary) => ActionOutcome::ok(
                    summary
                        .iter()
                        .map(|s| format!("{}: {} hours", s.employee, s.total_hours))
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }
        TypedAction::TimeSummaryByProject {
            date_from,
            date_to,
            employees,
            projects,
            customers,
            billable,
        } => {
            let params = TimeSummaryParams {
                date_from: date_from.clone(),
                date_to: date_to.clone(),
                employees: employees.clone(),
                projects: projects.clone(),
                customers: customers.clone(),
                billable: *billable,
            };
            match backoffice.time_summary_by_project(params).await {
                Ok(summary) => ActionOutcome::ok(
                    summary
                        .iter()
                        .map(|s| format!("{}: {} hours", s.project, s.total_hours))
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                Err(e) => ActionOutcome::failed(e.to_string()),
            }
        }

        // The response tool is terminal and never reaches the back-office;
        // the processor handles it before calling dispatch.
        TypedAction::Respond { .. } => ActionOutcome::ok("respond is handled by the action processor"),
    }
}

/// Every byte the back-office hands back for a wiki file — whether from a
/// load or the page just written — is trusted verbatim, so both go into
/// the `loaded_wiki_content_api` cache. The processor recognizes this
/// prefix and folds the value into `TurnState.loaded_wiki_content_api`.
fn loaded_wiki_key(file: &str) -> String {
    format!("loaded_wiki_content_api::{file}")
}
