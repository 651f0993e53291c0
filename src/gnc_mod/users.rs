use std::collections::BTreeSet;
use std::fmt;

/// Opaque handle identifying a collaborator that holds a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub u32);

impl UserId {
    pub const OPERATOR: UserId = UserId(0);
    pub const ATTITUDE: UserId = UserId(1);
    pub const DOCKING: UserId = UserId(2);
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            UserId::OPERATOR => f.write_str("operator"),
            UserId::ATTITUDE => f.write_str("attitude"),
            UserId::DOCKING => f.write_str("docking"),
            UserId(n) => write!(f, "user#{n}"),
        }
    }
}

/// Set of collaborators currently holding a controller or channel.
///
/// A controller is active while at least one user is registered.
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    users: BTreeSet<UserId>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the user was not already registered.
    pub fn register(&mut self, user: UserId) -> bool {
        self.users.insert(user)
    }

    /// Returns true if the user was registered.
    pub fn unregister(&mut self, user: UserId) -> bool {
        self.users.remove(&user)
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.users.contains(&user)
    }

    pub fn is_active(&self) -> bool {
        !self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_only_when_all_users_leave() {
        let mut reg = UserRegistry::new();
        assert!(reg.register(UserId::ATTITUDE));
        assert!(reg.register(UserId::DOCKING));
        assert!(!reg.register(UserId::DOCKING));
        reg.unregister(UserId::ATTITUDE);
        assert!(reg.is_active());
        reg.unregister(UserId::DOCKING);
        assert!(!reg.is_active());
    }

    #[test]
    fn display_names() {
        assert_eq!(UserId::DOCKING.to_string(), "docking");
        assert_eq!(UserId(7).to_string(), "user#7");
    }
}
