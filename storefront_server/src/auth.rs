//! HTTP Basic authentication for the inventory administration routes.
//!
//! There is a single admin account, configured with `SFS_ADMIN_USER` and `SFS_ADMIN_PASS`. Both the user name and the
//! password are compared as SHA-256 digests so that the comparison always takes the same time, whatever the input.
use log::*;
use sha2::{Digest, Sha256};

use crate::{config::AdminConfig, errors::AuthError};

/// Checks the value of an `Authorization` header against the configured admin credentials.
pub fn check_basic_auth(admin: &AdminConfig, header: Option<&str>) -> Result<(), AuthError> {
    if !admin.is_configured() {
        warn!("🔐️ An admin route was called, but no admin credentials are configured");
        return Err(AuthError::NotConfigured);
    }
    let header = header.map(str::trim).filter(|h| !h.is_empty()).ok_or(AuthError::MissingCredentials)?;
    let (user, pass) = decode_basic_auth(header)?;
    let user_ok = constant_time_eq(&user, &admin.user);
    let pass_ok = constant_time_eq(&pass, admin.pass.reveal());
    if user_ok & pass_ok {
        trace!("🔐️ Admin credentials accepted");
        Ok(())
    } else {
        warn!("🔐️ Invalid admin credentials presented");
        Err(AuthError::InvalidCredentials)
    }
}

/// Splits `Basic <base64(user:pass)>` into its user name and password.
pub fn decode_basic_auth(header: &str) -> Result<(String, String), AuthError> {
    let (scheme, encoded) = header.split_once(' ').ok_or(AuthError::InvalidCredentials)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::InvalidCredentials);
    }
    let decoded = base64::decode(encoded.trim()).map_err(|e| {
        debug!("🔐️ Basic credentials are not valid base64. {e}");
        AuthError::InvalidCredentials
    })?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidCredentials)?;
    let (user, pass) = decoded.split_once(':').ok_or(AuthError::InvalidCredentials)?;
    Ok((user.to_string(), pass.to_string()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
