//! Quotation status machine. Every status change goes through [`transition`],
//! so the card menus and the server agree on what is allowed.

use entity::quotations::{self, Status};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// What happens to the generated event when an authorized quotation is cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancelMode {
    /// The event stays on the agenda, detached from the quotation.
    QuotationOnly,
    /// The event and its agenda entries are removed as well.
    WithEvent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotationAction {
    MoveToClosing,
    CancelClosing,
    StartNegotiation,
    EndNegotiation,
    Authorize,
    Archive,
    Unarchive,
    Cancel(CancelMode),
}

impl QuotationAction {
    pub const ALL: [QuotationAction; 9] = [
        QuotationAction::MoveToClosing,
        QuotationAction::CancelClosing,
        QuotationAction::StartNegotiation,
        QuotationAction::EndNegotiation,
        QuotationAction::Authorize,
        QuotationAction::Archive,
        QuotationAction::Unarchive,
        QuotationAction::Cancel(CancelMode::QuotationOnly),
        QuotationAction::Cancel(CancelMode::WithEvent),
    ];

    fn verb(self) -> &'static str {
        match self {
            QuotationAction::MoveToClosing => "pasar a cierre",
            QuotationAction::CancelClosing => "cancelar el cierre de",
            QuotationAction::StartNegotiation => "negociar",
            QuotationAction::EndNegotiation => "terminar la negociación de",
            QuotationAction::Authorize => "autorizar",
            QuotationAction::Archive => "archivar",
            QuotationAction::Unarchive => "desarchivar",
            QuotationAction::Cancel(_) => "cancelar",
        }
    }
}

/// Facts about the other quotations of the same promise that guard some moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Siblings {
    /// Another quotation is in closing, or authorized with an event.
    pub active_with_event: bool,
    /// Another quotation is authorized and owns an event.
    pub authorized_with_event: bool,
}

impl Siblings {
    pub fn of<'a>(
        subject: Uuid,
        quotations: impl IntoIterator<Item = &'a quotations::Model>,
    ) -> Self {
        quotations
            .into_iter()
            .filter(|q| q.id != subject)
            .fold(Siblings::default(), |acc, q| Siblings {
                active_with_event: acc.active_with_event || q.is_active_with_event(),
                authorized_with_event: acc.authorized_with_event
                    || (q.status.is_authorized() && q.event_id.is_some()),
            })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no se puede {verb} una cotización en estado {from}")]
    NotAllowedFrom { verb: &'static str, from: &'static str },
    #[error("la promesa ya tiene otra cotización en cierre o autorizada con evento")]
    SiblingActive,
    #[error("la promesa ya tiene una cotización autorizada con evento")]
    SiblingAuthorized,
}

pub fn transition(
    current: Status,
    action: QuotationAction,
    siblings: Siblings,
) -> Result<Status, Rejection> {
    use QuotationAction::*;
    use Status::*;

    let next = match (action, current) {
        (MoveToClosing, Pending | Negotiation) => {
            if siblings.active_with_event {
                return Err(Rejection::SiblingActive);
            }
            Closing
        }
        (CancelClosing, Closing) => Pending,
        (StartNegotiation, Pending) => Negotiation,
        (EndNegotiation, Negotiation) => Pending,
        (Authorize, Closing) => Authorized,
        (Archive, Pending | Negotiation) => {
            if siblings.authorized_with_event {
                return Err(Rejection::SiblingAuthorized);
            }
            Archived
        }
        (Unarchive, Archived) => Pending,
        (Cancel(_), status) if status.is_authorized() => Cancelled,
        (action, from) => {
            return Err(Rejection::NotAllowedFrom {
                verb: action.verb(),
                from: from.as_str(),
            });
        }
    };
    Ok(next)
}

/// Actions a card may offer for a quotation in `current`.
pub fn allowed_actions(current: Status, siblings: Siblings) -> Vec<QuotationAction> {
    QuotationAction::ALL
        .into_iter()
        .filter(|action| transition(current, *action, siblings).is_ok())
        .collect()
}
