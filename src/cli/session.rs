//! Session command handlers

use crate::auth::{AuthContext, AuthError, Session};
use crate::cli::output::{format_session_json, format_session_table, SessionView};
use crate::cli::{SessionSetTokenArgs, SessionShowArgs};

/// Handle `easydeploy session show` command
pub fn handle_session_show(
    args: &SessionShowArgs,
    auth: &AuthContext,
) -> Result<String, Box<dyn std::error::Error>> {
    let session = auth.load_session()?;
    let resolved = match auth.resolve_token() {
        Ok(resolved) => Some(resolved),
        Err(AuthError::MissingToken) => None,
        Err(e) => return Err(e.into()),
    };

    let view = SessionView::new(
        session.as_ref(),
        resolved.as_ref().map(|r| (r.token.as_str(), r.source)),
    );
    if args.json {
        Ok(format_session_json(&view))
    } else {
        Ok(format_session_table(&view))
    }
}

/// Handle `easydeploy session set-token` command
///
/// Any cached user profile is kept; only the token and the authenticated
/// flag change.
pub fn handle_session_set_token(
    args: &SessionSetTokenArgs,
    auth: &AuthContext,
) -> Result<String, Box<dyn std::error::Error>> {
    let token = args.token.trim();
    if token.is_empty() {
        return Err("Token must not be empty".into());
    }

    let user = auth.load_session()?.and_then(|s| s.user);
    auth.save_session(&Session::authenticated(token, user))?;
    tracing::info!("Stored session token");

    Ok("✓ Session token stored".to_string())
}

/// Handle `easydeploy session clear` command
pub fn handle_session_clear(auth: &AuthContext) -> Result<String, Box<dyn std::error::Error>> {
    auth.clear_session()?;
    Ok("✓ Session cleared".to_string())
}
