//! Access policy.
//!
//! Two independent questions are answered here:
//!
//! * [`authorize`] decides whether an [`Actor`] may perform an [`Action`] on a
//!   [`Target`]. Rules are declared per resource as small [`Rule`] trees.
//! * [`scope`] decides which rows of a resource an actor can see at all. It is
//!   applied after `authorize` grants access to an endpoint.
//!
//! Neither touches storage. Callers resolve ownership (course owner, attempt
//! taker) beforehand and pass it in through [`Target`].

use thiserror::Error;

use super::{Role, UserId};

/// The party issuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User { id: UserId, role: Role },
}

impl Actor {
    pub fn user(id: UserId, role: Role) -> Self {
        Actor::User { id, role }
    }

    pub fn id(&self) -> Option<UserId> {
        match self {
            Actor::Anonymous => None,
            Actor::User { id, .. } => Some(*id),
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Actor::Anonymous => None,
            Actor::User { role, .. } => Some(*role),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User { .. })
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Id of the calling user, or `Unauthenticated` for anonymous callers.
    pub fn require_authenticated(&self) -> Result<UserId, AccessError> {
        self.id().ok_or(AccessError::Unauthenticated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    User,
    Course,
    Section,
    Material,
    Test,
    Attempt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    Submit,
}

/// Facts about the entity an action is aimed at.
///
/// `owner` is the teacher owning the course the entity hangs under, `account`
/// is the user the entity *is* (for users) or *belongs to* (for attempts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    resource: Resource,
    owner: Option<UserId>,
    account: Option<UserId>,
}

impl Target {
    /// A resource type without a concrete row, e.g. for `list` or course `create`.
    pub fn collection(resource: Resource) -> Self {
        Self {
            resource,
            owner: None,
            account: None,
        }
    }

    /// A row whose ownership resolves to `owner` through its course.
    pub fn owned(resource: Resource, owner: UserId) -> Self {
        Self {
            resource,
            owner: Some(owner),
            account: None,
        }
    }

    pub fn user(id: UserId) -> Self {
        Self {
            resource: Resource::User,
            owner: None,
            account: Some(id),
        }
    }

    pub fn attempt(taker: UserId, test_owner: UserId) -> Self {
        Self {
            resource: Resource::Attempt,
            owner: Some(test_owner),
            account: Some(taker),
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn account(&self) -> Option<UserId> {
        self.account
    }
}

/// Declarative permission expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Anyone,
    Nobody,
    Authenticated,
    HasRole(Role),
    /// Actor owns the target through its course.
    Owner,
    /// Actor is the target account (or the account the target belongs to).
    Account,
    Any(&'static [Rule]),
    All(&'static [Rule]),
}

impl Rule {
    pub fn allows(&self, actor: &Actor, target: &Target) -> bool {
        match self {
            Rule::Anyone => true,
            Rule::Nobody => false,
            Rule::Authenticated => actor.is_authenticated(),
            Rule::HasRole(role) => actor.role() == Some(*role),
            Rule::Owner => actor.id().is_some() && actor.id() == target.owner,
            Rule::Account => actor.id().is_some() && actor.id() == target.account,
            Rule::Any(rules) => rules.iter().any(|rule| rule.allows(actor, target)),
            Rule::All(rules) => rules.iter().all(|rule| rule.allows(actor, target)),
        }
    }
}

const ADMIN: Rule = Rule::HasRole(Role::Admin);
const TEACHER: Rule = Rule::HasRole(Role::Teacher);
const OWNING_TEACHER: Rule = Rule::All(&[TEACHER, Rule::Owner]);
const ADMIN_OR_TEACHER: Rule = Rule::Any(&[ADMIN, TEACHER]);
const ADMIN_OR_OWNING_TEACHER: Rule = Rule::Any(&[ADMIN, OWNING_TEACHER]);
const ADMIN_OR_SELF: Rule = Rule::Any(&[ADMIN, Rule::Account]);
const ATTEMPT_VIEWER: Rule = Rule::Any(&[ADMIN, Rule::Account, OWNING_TEACHER]);

/// The rule guarding `action` on `resource`.
pub fn policy(resource: Resource, action: Action) -> Rule {
    use Action::*;

    match resource {
        Resource::User => match action {
            Create | List => Rule::Anyone,
            Retrieve => Rule::Authenticated,
            Update | PartialUpdate | Destroy => ADMIN_OR_SELF,
            Submit => Rule::Nobody,
        },
        Resource::Course => match action {
            List | Retrieve => Rule::Authenticated,
            Create => ADMIN_OR_TEACHER,
            Update | PartialUpdate | Destroy => ADMIN_OR_OWNING_TEACHER,
            Submit => Rule::Nobody,
        },
        Resource::Section | Resource::Material => match action {
            List | Retrieve => Rule::Authenticated,
            Create | Update | PartialUpdate | Destroy => ADMIN_OR_OWNING_TEACHER,
            Submit => Rule::Nobody,
        },
        Resource::Test => match action {
            List | Retrieve | Submit => Rule::Authenticated,
            Create | Update | PartialUpdate | Destroy => ADMIN_OR_OWNING_TEACHER,
        },
        // Attempts are written only by grading and never change afterwards.
        Resource::Attempt => match action {
            List => Rule::Authenticated,
            Retrieve => ATTEMPT_VIEWER,
            Create | Update | PartialUpdate | Destroy | Submit => Rule::Nobody,
        },
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("authentication credentials were not provided or are invalid")]
    Unauthenticated,
    #[error("you do not have permission to perform this action")]
    Forbidden,
}

pub fn authorize(actor: &Actor, action: Action, target: &Target) -> Result<(), AccessError> {
    if policy(target.resource, action).allows(actor, target) {
        Ok(())
    } else if actor.is_authenticated() {
        Err(AccessError::Forbidden)
    } else {
        Err(AccessError::Unauthenticated)
    }
}

/// Rows of a resource visible to an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Rows under courses owned by this user.
    OwnedBy(UserId),
    /// The user row itself, or rows belonging to this user.
    Account(UserId),
    Empty,
}

impl Scope {
    pub fn contains(&self, target: &Target) -> bool {
        match self {
            Scope::All => true,
            Scope::OwnedBy(owner) => target.owner == Some(*owner),
            Scope::Account(account) => target.account == Some(*account),
            Scope::Empty => false,
        }
    }
}

pub fn scope(actor: &Actor, resource: Resource) -> Scope {
    let Actor::User { id, role } = *actor else {
        return Scope::Empty;
    };

    match (role, resource) {
        (Role::Admin, _) => Scope::All,
        (Role::Teacher | Role::Student, Resource::User) => Scope::Account(id),
        (Role::Teacher, Resource::Course | Resource::Section | Resource::Material) => {
            Scope::OwnedBy(id)
        }
        (Role::Student, Resource::Course | Resource::Section | Resource::Material) => Scope::All,
        (Role::Teacher | Role::Student, Resource::Test) => Scope::All,
        (Role::Teacher, Resource::Attempt) => Scope::OwnedBy(id),
        (Role::Student, Resource::Attempt) => Scope::Account(id),
    }
}
