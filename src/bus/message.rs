//! Addressed messages exchanged between agents.
//!
//! The body is free text meant for people; everything a role dispatches on
//! travels in the metadata map, starting with the `kind` tag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::types::{AgentId, Error, MessageId, Result};

/// Well-known metadata keys.
pub mod meta {
    pub const KIND: &str = "kind";
    pub const CUSTOMER_NUM: &str = "customer_num";
    pub const CUSTOMER_JID: &str = "customer_jid";
    pub const SERVER_ID: &str = "server_id";
    pub const ITEM: &str = "item";
    pub const SUBTOTAL: &str = "subtotal";
    pub const TAX_RATE_BP: &str = "tax_rate_bp";
    pub const TAX: &str = "tax";
    pub const TOTAL: &str = "total";
}

/// Speech-act tag of a message. The restaurant only ever informs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Performative {
    #[default]
    Inform,
}

/// Closed set of protocol steps between the roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// Customer → Order, then Order → Kitchen.
    OrderPlaced,
    /// Kitchen → Serving.
    MealReady,
    /// Serving → Billing.
    PaymentDue,
    /// Billing → Customer.
    BillIssued,
    /// Customer → Billing.
    PaymentConfirmed,
    /// Customer → Manager.
    Departed,
    /// Manager → Cleaning.
    CleanupRequested,
}

impl MessageKind {
    pub const ALL: [MessageKind; 7] = [
        MessageKind::OrderPlaced,
        MessageKind::MealReady,
        MessageKind::PaymentDue,
        MessageKind::BillIssued,
        MessageKind::PaymentConfirmed,
        MessageKind::Departed,
        MessageKind::CleanupRequested,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::OrderPlaced => "orderPlaced",
            MessageKind::MealReady => "mealReady",
            MessageKind::PaymentDue => "paymentDue",
            MessageKind::BillIssued => "billIssued",
            MessageKind::PaymentConfirmed => "paymentConfirmed",
            MessageKind::Departed => "departed",
            MessageKind::CleanupRequested => "cleanupRequested",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MessageKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown message kind: {s}")))
    }
}

/// Immutable once handed to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from: AgentId,
    pub to: AgentId,
    pub performative: Performative,
    pub metadata: BTreeMap<String, String>,
    pub body: String,
}

impl Message {
    /// Untagged inform message with an empty body.
    pub fn inform(from: AgentId, to: AgentId) -> Self {
        Self {
            id: MessageId::new(),
            from,
            to,
            performative: Performative::Inform,
            metadata: BTreeMap::new(),
            body: String::new(),
        }
    }

    /// Inform message tagged with a protocol kind.
    pub fn new(from: AgentId, to: AgentId, kind: MessageKind) -> Self {
        Self::inform(from, to).with_meta(meta::KIND, kind.as_str())
    }

    pub fn with_meta(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Protocol kind, if the tag is present and recognised.
    pub fn kind(&self) -> Option<MessageKind> {
        self.meta(meta::KIND).and_then(|k| k.parse().ok())
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn customer_num(&self) -> Option<u32> {
        self.meta(meta::CUSTOMER_NUM).and_then(|n| n.parse().ok())
    }

    /// Original customer address carried through the pipeline.
    pub fn customer_jid(&self) -> Option<AgentId> {
        self.meta(meta::CUSTOMER_JID)
            .and_then(|jid| AgentId::try_from(jid).ok())
    }
}
