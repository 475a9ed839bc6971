//! Permission enforcement against verified claims

use aliri_braid::braid;

use crate::{
    error::{self, AuthError},
    jwt::ClaimSet,
};

/// A permission string, such as `get:movies`
///
/// Permissions are compared exactly. No wildcard or hierarchy is implied.
#[braid(serde, ref_doc = "A borrowed reference to a [`Permission`]")]
pub struct Permission;

impl PermissionRef {
    /// The empty permission, required by an unguarded operation
    ///
    /// Every claim set satisfies it, including one without a `permissions` claim.
    #[must_use]
    pub fn unrestricted() -> &'static Self {
        Self::from_static("")
    }

    /// Whether this is the empty permission
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.as_str().is_empty()
    }
}

/// Checks that `claims` grant the `required` permission
///
/// # Errors
///
/// * `invalid_claims` (400) if the token carries no `permissions` claim
/// * `unauthorized` (401) if the claim does not list `required`
pub fn check_permission(required: &PermissionRef, claims: &ClaimSet) -> Result<(), AuthError> {
    if required.is_unrestricted() {
        return Ok(());
    }

    let Some(granted) = claims.permissions() else {
        tracing::debug!(permission = %required, "token has no permissions claim");
        return Err(error::missing_permissions());
    };

    if granted.iter().any(|p| p.as_str() == required.as_str()) {
        Ok(())
    } else {
        tracing::debug!(permission = %required, "token does not grant permission");
        Err(error::permission_not_held())
    }
}
