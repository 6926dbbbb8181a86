//! Component F: authentication.

use crate::{
    error::AclError,
    registry::UserRegistry,
    tscmp::tscmp,
    user::User,
};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Authenticates `(username, password)` against `registry`, returning the
/// resulting user snapshot on success.
///
/// Disabled users and unknown users are both reported as `BadCredentials`
/// from here, but the caller-visible wire error additionally folds
/// `NoSuchUser` into the same `WRONGPASS` token (§6) to avoid letting a
/// client enumerate valid usernames by timing/error-shape alone.
#[instrument(level = "debug", skip(registry, password), fields(user = %String::from_utf8_lossy(username)))]
pub fn authenticate(
    registry: &UserRegistry,
    username: &[u8],
    password: &[u8],
) -> Result<Arc<User>, AclError> {
    let Some(user) = registry.lookup(username) else {
        warn!("authentication failed: no such user");
        return Err(AclError::NoSuchUser);
    };

    if !user.is_enabled() {
        warn!("authentication failed: user disabled");
        return Err(AclError::BadCredentials);
    }

    if user.flags.contains(crate::user::Flags::NOPASS) {
        return Ok(user);
    }

    // Run over every stored password unconditionally so the number of
    // comparisons performed does not depend on which (if any) matched.
    let mut matched = false;
    for stored in &user.passwords {
        matched |= tscmp(password, stored);
    }

    if matched {
        Ok(user)
    } else {
        warn!("authentication failed: bad credentials");
        Err(AclError::BadCredentials)
    }
}
