use ca_domain::TypedAction;

use crate::ParseOutcome;

pub fn parse_who_am_i() -> ParseOutcome {
    ParseOutcome::Action(TypedAction::WhoAmI)
}
