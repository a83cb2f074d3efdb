use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Employee,
    Project,
    Customer,
    Wiki,
    Location,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Employee => "employee",
            LinkKind::Project => "project",
            LinkKind::Customer => "customer",
            LinkKind::Wiki => "wiki",
            LinkKind::Location => "location",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "proj" => Some(LinkKind::Project),
            "emp" => Some(LinkKind::Employee),
            "cust" => Some(LinkKind::Customer),
            _ => None,
        }
    }
}

/// A typed reference to a back-office entity. A turn's links form a set
/// keyed by `(kind, id)`: the same entity mentioned twice collapses to one
/// link rather than appearing in the output multiple times.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub kind: LinkKind,
}

impl Link {
    pub fn new(id: impl Into<String>, kind: LinkKind) -> Self {
        Self { id: id.into(), kind }
    }

    pub fn employee(id: impl Into<String>) -> Self {
        Self::new(id, LinkKind::Employee)
    }

    pub fn project(id: impl Into<String>) -> Self {
        Self::new(id, LinkKind::Project)
    }

    pub fn customer(id: impl Into<String>) -> Self {
        Self::new(id, LinkKind::Customer)
    }
}
