//! Identity middleware for protected endpoints.
//!
//! Authentication lives in the upstream proxy; by the time a request
//! reaches this service the proxy has already verified the session and
//! stamped the caller's identity into trusted headers:
//!
//! - `x-user-id`: numeric ID of the authenticated customer
//! - `x-staff-id`: numeric ID of the authenticated back-office operator
//!
//! The middleware validates the header and injects the identity into
//! request extensions for downstream handlers.
//!
//! # Extracting identity
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use cb_server::api::middleware::StaffId;
//!
//! async fn user_handler(Extension(user_id): Extension<i64>) -> String {
//!     format!("Acting as user {}", user_id)
//! }
//!
//! async fn staff_handler(Extension(staff): Extension<StaffId>) -> String {
//!     format!("Acting as {}", staff.actor())
//! }
//! # let _ = (user_handler, staff_handler);
//! ```

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

/// Header carrying the authenticated customer ID
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the authenticated staff ID
pub const STAFF_ID_HEADER: &str = "x-staff-id";

/// Staff identity injected into request extensions
#[derive(Clone, Debug)]
pub struct StaffId(pub i64);

impl StaffId {
    /// Actor tag recorded in notes, metadata, and outbox events
    pub fn actor(&self) -> String {
        format!("staff:{}", self.0)
    }
}

fn parse_id_header(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Middleware requiring a customer identity.
///
/// # Behavior
///
/// - **Success**: header present and numeric → injects `user_id: i64` →
///   calls next handler
/// - **Missing or malformed header**: returns `401 Unauthorized`
pub async fn require_user(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let user_id =
        parse_id_header(request.headers(), USER_ID_HEADER).ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(user_id);
    Ok(next.run(request).await)
}

/// Middleware requiring a staff identity.
///
/// # Behavior
///
/// - **Success**: header present and numeric → injects [`StaffId`] →
///   calls next handler
/// - **Missing or malformed header**: returns `401 Unauthorized`
pub async fn require_staff(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let staff_id =
        parse_id_header(request.headers(), STAFF_ID_HEADER).ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(StaffId(staff_id));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_id_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));

        assert_eq!(parse_id_header(&headers, USER_ID_HEADER), Some(42));
        assert_eq!(parse_id_header(&headers, STAFF_ID_HEADER), None);
    }

    #[test]
    fn test_parse_id_header_rejects_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-number"));

        assert_eq!(parse_id_header(&headers, USER_ID_HEADER), None);
    }

    #[test]
    fn test_staff_actor_tag() {
        let staff = StaffId(7);
        assert_eq!(staff.actor(), "staff:7");
    }
}
