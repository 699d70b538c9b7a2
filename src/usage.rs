// src/usage.rs

use crate::error::Error;

/// Who an extraction is billed against. Resolution (guest vs account) is
/// the caller's concern; the pipeline only sees an opaque identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Guest,
    Account(String),
}

impl Identity {
    /// Storage key. Account ids are namespaced so a guest row can never
    /// collide with an account named "guest".
    pub fn key(&self) -> String {
        match self {
            Identity::Guest => "guest".to_string(),
            Identity::Account(id) => format!("account:{id}"),
        }
    }
}

/// Daily usage counter capability.
///
/// Keyed by (identity, date) so a new day naturally reads as zero. The
/// pipeline only ever increments through this interface.
pub trait UsageStore {
    fn get(&self, identity: &Identity, date: &str) -> Result<u32, Error>;
    fn set(&self, identity: &Identity, date: &str, count: u32) -> Result<(), Error>;

    fn increment(&self, identity: &Identity, date: &str) -> Result<u32, Error> {
        let next = self.get(identity, date)? + 1;
        self.set(identity, date, next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_keys_distinct() {
        assert_eq!(Identity::Guest.key(), "guest");
        assert_eq!(Identity::Account("guest".into()).key(), "account:guest");
        assert_ne!(Identity::Guest.key(), Identity::Account("guest".into()).key());
    }
}
