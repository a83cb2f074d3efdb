//! Adapts the full `BackOffice` trait to the minimal `EmployeeLookup` the
//! link validator needs, so the turn runner doesn't have to carry two
//! separate back-office handles.

use async_trait::async_trait;
use ca_backoffice::BackOffice;
use ca_links::EmployeeLookup;

pub struct BackOfficeEmployeeLookup<'a> {
    backoffice: &'a dyn BackOffice,
}

impl<'a> BackOfficeEmployeeLookup<'a> {
    pub fn new(backoffice: &'a dyn BackOffice) -> Self {
        Self { backoffice }
    }
}

#[async_trait]
impl EmployeeLookup for BackOfficeEmployeeLookup<'_> {
    /// Only a confirmed not-found counts as absent; a transport hiccup
    /// reports existence so an outage can't silently erase a true link.
    async fn employee_exists(&self, id: &str) -> bool {
        match self.backoffice.employees_get(id).await {
            Ok(_) => true,
            Err(e) => !e.is_not_found(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_backoffice::MockBackOffice;
    use ca_domain::Identity;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn reports_existence_via_employees_get() {
        let api = MockBackOffice::new(Identity::public(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), "h".into()));
        let lookup = BackOfficeEmployeeLookup::new(&api);
        assert!(!lookup.employee_exists("ghost").await);
    }
}
