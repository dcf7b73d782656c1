//! Typed request builders, one per session operation.
//!
//! Each public operation of the synchronizer maps to exactly one
//! constructor here. Nothing is templated at runtime: the method, path,
//! and form discriminator of every request are fixed in code.

use std::fmt;

/// Header carrying the anti-forgery token, both on requests and on
/// responses that rotate it.
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";

/// Alternate response header some deployments use to rotate the token.
pub const CSRF_RESPONSE_HEADER: &str = "X-CSRF-Token";

/// Query parameter that tells the server which form is being submitted.
pub const FORM_ID_PARAM: &str = "__formid__";

const SESSION_PATH: &str = "app";
const DISMISS_TUTORIAL_PATH: &str = "app/dismiss_sidebar_tutorial";

/// HTTP method of a session request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Which session operation a request performs. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    Load,
    Logout,
    DismissSidebarTutorial,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::Load => "load",
            Self::Logout => "logout",
            Self::DismissSidebarTutorial => "dismiss_sidebar_tutorial",
        };
        f.write_str(name)
    }
}

/// A fully described request to the session endpoint.
///
/// Paths are relative to the service URL so one request value works
/// against any deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub operation: Operation,
    pub method: Method,
    pub path: &'static str,
    /// Value of the `__formid__` discriminator, if the operation has one.
    pub form_id: Option<&'static str>,
    /// Already-encoded JSON body.
    pub body: Option<Vec<u8>>,
    /// Sent as [`XSRF_HEADER`] once the server has issued a token.
    pub xsrf_token: Option<String>,
}

impl SessionRequest {
    /// `POST app?__formid__=login` with the encoded credentials.
    pub fn login(body: Vec<u8>, xsrf_token: Option<String>) -> Self {
        Self {
            operation: Operation::Login,
            method: Method::Post,
            path: SESSION_PATH,
            form_id: Some("login"),
            body: Some(body),
            xsrf_token,
        }
    }

    /// `GET app`.
    pub fn load(xsrf_token: Option<String>) -> Self {
        Self {
            operation: Operation::Load,
            method: Method::Get,
            path: SESSION_PATH,
            form_id: None,
            body: None,
            xsrf_token,
        }
    }

    /// `POST app?__formid__=logout` with no body.
    pub fn logout(xsrf_token: Option<String>) -> Self {
        Self {
            operation: Operation::Logout,
            method: Method::Post,
            path: SESSION_PATH,
            form_id: Some("logout"),
            body: None,
            xsrf_token,
        }
    }

    /// `POST app/dismiss_sidebar_tutorial`.
    pub fn dismiss_sidebar_tutorial(xsrf_token: Option<String>) -> Self {
        Self {
            operation: Operation::DismissSidebarTutorial,
            method: Method::Post,
            path: DISMISS_TUTORIAL_PATH,
            form_id: None,
            body: None,
            xsrf_token,
        }
    }

    /// The path plus the form discriminator, relative to the service URL.
    pub fn path_and_query(&self) -> String {
        match self.form_id {
            Some(form) => format!("{}?{FORM_ID_PARAM}={form}", self.path),
            None => self.path.to_string(),
        }
    }

    /// Headers every session request carries.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Accept", "application/json".to_string()),
            ("Content-Type", "application/json".to_string()),
        ];
        if let Some(token) = &self.xsrf_token {
            headers.push((XSRF_HEADER, token.clone()));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_posts_to_login_form() {
        let req = SessionRequest::login(b"{}".to_vec(), None);

        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path_and_query(), "app?__formid__=login");
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_load_is_plain_get() {
        let req = SessionRequest::load(None);

        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path_and_query(), "app");
        assert!(req.body.is_none());
    }

    #[test]
    fn test_logout_posts_without_body() {
        let req = SessionRequest::logout(None);

        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path_and_query(), "app?__formid__=logout");
        assert!(req.body.is_none());
    }

    #[test]
    fn test_dismiss_tutorial_path() {
        let req = SessionRequest::dismiss_sidebar_tutorial(None);
        assert_eq!(req.path_and_query(), "app/dismiss_sidebar_tutorial");
        assert_eq!(req.operation.to_string(), "dismiss_sidebar_tutorial");
    }

    #[test]
    fn test_headers_include_xsrf_token_once_known() {
        let without = SessionRequest::load(None).headers();
        assert!(without.iter().all(|(name, _)| *name != XSRF_HEADER));

        let with = SessionRequest::load(Some("tok".into())).headers();
        assert!(with.contains(&(XSRF_HEADER, "tok".to_string())));
        assert!(with.contains(&("Accept", "application/json".to_string())));
    }
}
