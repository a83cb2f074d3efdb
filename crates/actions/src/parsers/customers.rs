use ca_domain::TypedAction;
use serde_json::{Map, Value};

use crate::args::{str_any, string_list};
use crate::ParseOutcome;

pub fn parse_list(_args: &Map<String, Value>) -> ParseOutcome {
    ParseOutcome::Action(TypedAction::CustomersList)
}

pub fn parse_get(args: &Map<String, Value>) -> ParseOutcome {
    match str_any(args, &["id", "customer_id", "customer", "Customer"]) {
        Some(id) => ParseOutcome::Action(TypedAction::CustomersGet { id }),
        None => ParseOutcome::Skip,
    }
}

pub fn parse_search(args: &Map<String, Value>) -> ParseOutcome {
    let locations = non_empty(string_list(args, "locations")).unwrap_or_else(|| {
        str_any(args, &["location"]).map(|l| vec![l]).unwrap_or_default()
    });

    let deal_phase = non_empty(string_list(args, "deal_phase"))
        .or_else(|| non_empty(string_list(args, "status")))
        .or_else(|| non_empty(string_list(args, "stage")))
        .unwrap_or_default();

    let account_managers = non_empty(string_list(args, "account_managers")).unwrap_or_else(|| {
        str_any(args, &["account_manager"]).map(|a| vec![a]).unwrap_or_default()
    });

    ParseOutcome::Action(TypedAction::CustomersSearch {
        query: str_any(args, &["query", "query_regex"]),
        locations,
        deal_phase,
        account_managers,
    })
}

fn non_empty(list: Vec<String>) -> Option<Vec<String>> {
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn get_accepts_customer_alias() {
        let args = map(json!({"Customer": "cust_acme"}));
        assert_eq!(parse_get(&args), ParseOutcome::Action(TypedAction::CustomersGet { id: "cust_acme".into() }));
    }

    #[test]
    fn search_promotes_singular_filters_to_lists() {
        let args = map(json!({"location": "Berlin", "status": "negotiation", "account_manager": "jonas_weiss"}));
        match parse_search(&args) {
            ParseOutcome::Action(TypedAction::CustomersSearch { locations, deal_phase, account_managers, .. }) => {
                assert_eq!(locations, vec!["Berlin"]);
                assert_eq!(deal_phase, vec!["negotiation"]);
                assert_eq!(account_managers, vec!["jonas_weiss"]);
            }
            other => panic!("expected CustomersSearch, got {other:?}"),
        }
    }
}
