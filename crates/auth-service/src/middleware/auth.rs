//! Authentication filter and role guards.
//!
//! The filter runs on every request. It parses the Authorization header
//! into [`Credentials`], resolves them through the authenticator, and
//! stores the resulting [`Principal`] in request extensions. Requests
//! without usable credentials proceed as anonymous; the per-route guards
//! decide whether anonymous is acceptable. The principal lives and dies
//! with the request, there is no ambient security state.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use base64::{engine::general_purpose, Engine as _};
use secrecy::SecretString;
use std::sync::Arc;

use crate::errors::AuthError;
use crate::models::{Credentials, Principal, Role};
use crate::services::authentication::Authenticator;

/// Filter state shared across requests.
#[derive(Clone)]
pub struct AuthFilterState {
    pub authenticator: Arc<Authenticator>,
}

/// Resolve the Authorization header to a principal for this request.
///
/// Malformed Basic credentials fail with 401. A missing header, or a scheme
/// no provider handles, yields an anonymous principal instead; unauthorized
/// access then surfaces at the route guard, not here.
pub async fn authenticate_request(
    State(state): State<AuthFilterState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let principal = match header.as_deref().map(parse_authorization).transpose()? {
        Some(Some(credentials)) => state.authenticator.authenticate(&credentials).await?,
        _ => Principal::anonymous(),
    };

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Parse an Authorization header value into credentials.
///
/// Returns `Ok(None)` for schemes no provider handles; the request then
/// proceeds as anonymous. Malformed Basic payloads are an error: the caller
/// clearly attempted to authenticate and failed.
fn parse_authorization(header: &str) -> Result<Option<Credentials>, AuthError> {
    if let Some(encoded) = header.strip_prefix("Basic ") {
        let decoded = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| AuthError::AuthenticationFailed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::AuthenticationFailed)?;

        // Split on the first colon only; passwords may contain colons.
        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::AuthenticationFailed)?;
        if username.is_empty() {
            return Err(AuthError::AuthenticationFailed);
        }

        return Ok(Some(Credentials::Basic {
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
        }));
    }

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::AuthenticationFailed);
        }
        return Ok(Some(Credentials::Bearer {
            token: token.to_string(),
        }));
    }

    tracing::debug!(target: "auth.filter", "Unrecognized authorization scheme");
    Ok(None)
}

/// Route guard requiring the authority granted by `role`.
///
/// Anonymous requests get 401; authenticated requests without the required
/// authority get 403.
pub async fn require_role(
    State(role): State<Role>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let principal = req.principal();

    if !principal.authenticated {
        return Err(AuthError::AuthenticationFailed);
    }

    let required = role.required_authority();
    if !principal.has_authority(&required) {
        tracing::debug!(
            target: "auth.filter",
            username = %principal.username,
            required = %required,
            "Denying request lacking required authority"
        );
        return Err(AuthError::AccessDenied { required });
    }

    Ok(next.run(req).await)
}

/// Access to the principal resolved by the authentication filter.
pub trait PrincipalExt {
    /// The request's principal. Anonymous when the filter did not run or
    /// found no credentials.
    fn principal(&self) -> Principal;
}

impl PrincipalExt for Request {
    fn principal(&self) -> Principal {
        self.extensions()
            .get::<Principal>()
            .cloned()
            .unwrap_or_else(Principal::anonymous)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn basic_header(payload: &str) -> String {
        format!("Basic {}", general_purpose::STANDARD.encode(payload))
    }

    #[test]
    fn test_parse_basic_credentials() {
        let parsed = parse_authorization(&basic_header("alice:P@ssw0rd1"))
            .unwrap()
            .unwrap();
        match parsed {
            Credentials::Basic { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password.expose_secret(), "P@ssw0rd1");
            }
            Credentials::Bearer { .. } => panic!("Expected Basic credentials"),
        }
    }

    #[test]
    fn test_parse_basic_password_containing_colons() {
        let parsed = parse_authorization(&basic_header("alice:pa:ss:word"))
            .unwrap()
            .unwrap();
        match parsed {
            Credentials::Basic { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password.expose_secret(), "pa:ss:word");
            }
            Credentials::Bearer { .. } => panic!("Expected Basic credentials"),
        }
    }

    #[test]
    fn test_parse_malformed_basic_fails() {
        // Not base64.
        assert!(matches!(
            parse_authorization("Basic !!!"),
            Err(AuthError::AuthenticationFailed)
        ));
        // No colon separator.
        assert!(matches!(
            parse_authorization(&basic_header("nocolon")),
            Err(AuthError::AuthenticationFailed)
        ));
        // Empty username.
        assert!(matches!(
            parse_authorization(&basic_header(":password")),
            Err(AuthError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_parse_bearer_token() {
        let parsed = parse_authorization("Bearer abc.def.ghi").unwrap().unwrap();
        match parsed {
            Credentials::Bearer { token } => assert_eq!(token, "abc.def.ghi"),
            Credentials::Basic { .. } => panic!("Expected Bearer credentials"),
        }
    }

    #[test]
    fn test_parse_empty_bearer_fails() {
        assert!(matches!(
            parse_authorization("Bearer "),
            Err(AuthError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_parse_unknown_scheme_is_anonymous() {
        assert!(parse_authorization("Digest qop=auth").unwrap().is_none());
        assert!(parse_authorization("Weird abc123").unwrap().is_none());
    }

    #[test]
    fn test_principal_ext_defaults_to_anonymous() {
        let req = Request::new(axum::body::Body::empty());
        let principal = req.principal();
        assert!(!principal.authenticated);
    }

    #[test]
    fn test_principal_ext_reads_extension() {
        let mut req = Request::new(axum::body::Body::empty());
        req.extensions_mut()
            .insert(Principal::authenticated("alice", Role::User.authorities()));
        let principal = req.principal();
        assert!(principal.authenticated);
        assert_eq!(principal.username, "alice");
    }
}
