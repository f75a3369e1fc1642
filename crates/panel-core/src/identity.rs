use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Capability;
use crate::errors::CoreError;

/// The authenticated caller of an operation.
///
/// Supplied by the identity provider; Panel never stores credentials.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
    pub capabilities: BTreeSet<Capability>,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<String>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            user_id: user_id.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        has_capability(self, Capability::Admin)
    }
}

/// Anything carrying an explicit capability set.
pub trait HasCapabilities {
    fn capabilities(&self) -> &BTreeSet<Capability>;
}

impl HasCapabilities for CallerIdentity {
    fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }
}

/// Pure capability check over an explicit capability set.
pub fn has_capability<U: HasCapabilities + ?Sized>(user: &U, cap: Capability) -> bool {
    user.capabilities().contains(&cap)
}

/// Fail with `Forbidden` unless the caller holds `cap`.
///
/// # Errors
///
/// Returns `CoreError::Forbidden` naming `action`.
pub fn ensure_capability(
    caller: &CallerIdentity,
    cap: Capability,
    action: &str,
) -> Result<(), CoreError> {
    if has_capability(caller, cap) {
        Ok(())
    } else {
        Err(CoreError::forbidden(&caller.user_id, action))
    }
}

/// Fail with `Forbidden` unless the caller is `owner_id`.
///
/// # Errors
///
/// Returns `CoreError::Forbidden` naming `action`.
pub fn ensure_owner(caller: &CallerIdentity, owner_id: &str, action: &str) -> Result<(), CoreError> {
    if caller.user_id == owner_id {
        Ok(())
    } else {
        Err(CoreError::forbidden(&caller.user_id, action))
    }
}

/// Fail with `Forbidden` unless the caller is `owner_id` or an administrator.
///
/// # Errors
///
/// Returns `CoreError::Forbidden` naming `action`.
pub fn ensure_owner_or_admin(
    caller: &CallerIdentity,
    owner_id: &str,
    action: &str,
) -> Result<(), CoreError> {
    if caller.is_admin() {
        return Ok(());
    }
    ensure_owner(caller, owner_id, action)
}
