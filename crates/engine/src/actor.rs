//! Caller identity passed into every engine operation.
//!
//! The engine never consults ambient state to find out who is acting: the
//! auth layer resolves a verified identity plus its admin flag and hands the
//! result in as a capability argument.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    /// External identity id (the `users` row key).
    pub user_id: String,
    /// Whether the identity provider marks this user as an administrator.
    pub admin: bool,
}

impl Actor {
    pub fn member(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            admin: true,
        }
    }
}
