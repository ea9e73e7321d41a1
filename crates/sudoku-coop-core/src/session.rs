use serde::{Deserialize, Serialize};

/// Who the local user is, as attached to locks and chat messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Identity equality is keyed on the email address, ignoring ASCII case.
    pub fn same_as(&self, other: &Identity) -> bool {
        self.is_email(&other.email)
    }

    pub fn is_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Identity {}

/// A logged-in user: the opaque bearer credential plus who it belongs to.
/// Lives only in memory for the lifetime of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    access_token: String,
    identity: Identity,
}

impl Session {
    pub fn new(access_token: impl Into<String>, identity: Identity) -> Self {
        Self {
            access_token: access_token.into(),
            identity,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_name(&self) -> &str {
        &self.identity.name
    }

    pub fn user_email(&self) -> &str {
        &self.identity.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_compares_by_email_only() {
        let a = Identity::new("Ada", "ada@example.com");
        let b = Identity::new("Ada L.", "ADA@example.com");
        let c = Identity::new("Ada", "other@example.com");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
