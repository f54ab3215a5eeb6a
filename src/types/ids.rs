//! Strongly-typed identifiers.
//!
//! All IDs are validated at construction time and implement common traits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to define a strongly-typed ID newtype wrapper.
///
/// Generates: struct, `from_string()`, `as_str()`, Display, Serialize, Deserialize.
/// Deserialization goes through `from_string()`, so blank ids never load.
/// Optionally generates `new()` (UUID v4) and `Default` if `uuid` flag is passed.
macro_rules! define_id {
    ($name:ident, uuid) => {
        define_id!($name);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn from_string(s: String) -> Result<Self, &'static str> {
                if s.trim().is_empty() {
                    return Err(concat!(stringify!($name), " cannot be empty"));
                }
                Ok(Self(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = &'static str;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::from_string(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

define_id!(AgentId);
define_id!(MessageId, uuid);

impl AgentId {
    /// Mailbox address of the `n`th customer of a run.
    pub fn customer(customer_num: u32) -> Self {
        Self(format!("customer{customer_num}_agent@localhost"))
    }

    /// Whether this id has the shape of a customer mailbox (`customer<N>_agent@localhost`).
    pub fn is_customer_address(&self) -> bool {
        self.0
            .strip_prefix("customer")
            .and_then(|rest| rest.strip_suffix("_agent@localhost"))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Build an id from a literal known to be non-empty (role defaults, tests).
    pub fn must(s: &str) -> Self {
        debug_assert!(!s.is_empty(), "AgentId literal cannot be empty");
        Self(s.to_string())
    }
}

impl TryFrom<&str> for AgentId {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_string(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_rejects_blank() {
        assert!(AgentId::from_string(String::new()).is_err());
        assert!(AgentId::from_string("   ".to_string()).is_err());
        assert_eq!(
            AgentId::from_string("kitchen_agent@localhost".to_string())
                .unwrap()
                .as_str(),
            "kitchen_agent@localhost"
        );
    }

    #[test]
    fn test_customer_address() {
        assert_eq!(AgentId::customer(4).to_string(), "customer4_agent@localhost");
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<AgentId>("\"\"").is_err());
        assert!(serde_json::from_str::<AgentId>("\"  \"").is_err());

        let id: AgentId = serde_json::from_str("\"order_agent@localhost\"").unwrap();
        assert_eq!(id.as_str(), "order_agent@localhost");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"order_agent@localhost\"");
    }

    #[test]
    fn test_customer_address_shape() {
        assert!(AgentId::customer(12).is_customer_address());
        assert!(!AgentId::must("customer_agent@localhost").is_customer_address());
        assert!(!AgentId::must("customerx_agent@localhost").is_customer_address());
        assert!(!AgentId::must("kitchen_agent@localhost").is_customer_address());
    }

    #[test]
    fn test_message_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }
}
