//! Session identity

use std::fmt;

/// Identifier of a logical conversation, backed by a UUIDv7
///
/// UUIDv7 values sort by creation time, which keeps session listings in
/// the order they were started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u128);

impl SessionId {
    /// Start a new session
    ///
    /// # Examples
    ///
    /// ```
    /// use adoq_domain::SessionId;
    ///
    /// let a = SessionId::new();
    /// let b = SessionId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Wrap a raw value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse the hyphenated UUID form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s.trim())
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid session id: {}", e))
    }

    /// Raw value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl std::str::FromStr for SessionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_round_trip() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(SessionId::from_string("not-a-uuid").is_err());
    }
}
