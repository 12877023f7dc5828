//! UI route table and navigation guards.
//!
//! | Path | Route |
//! |---|---|
//! | `/` | redirect to `/emails/inbox` |
//! | `/emails/inbox[/email/:id]` | [`Route::Inbox`] |
//! | `/emails/inbox/:recipient[/email/:id]` | [`Route::RecipientInbox`] |
//! | `/redirect_first_email` | guarded, see [`Router::navigate`] |
//! | `/emails/:id/fullscreen` | [`Route::Fullscreen`] |
//! | anything else | redirect to `/` |
//!
//! Static redirects keep the query string.

use std::fmt;

use mailfang_api::ApiClient;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use tracing::debug;

use crate::Result;

/// Characters escaped inside a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped inside a query key or value.
const QUERY: &AsciiSet = &SEGMENT.add(b'&').add(b'=').add(b'+');

/// Path of the unified inbox.
pub const INBOX_PATH: &str = "/emails/inbox";

/// A resolved view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// All messages, optionally with one open.
    Inbox {
        /// Open message.
        email_id: Option<String>,
    },
    /// Messages for one envelope recipient, optionally with one open.
    RecipientInbox {
        /// Recipient address.
        recipient: String,
        /// Open message.
        email_id: Option<String>,
    },
    /// Opens the newest message; resolved by [`Router::navigate`].
    RedirectFirstEmail,
    /// One message, full window.
    Fullscreen {
        /// Message shown.
        email_id: String,
    },
}

impl Route {
    /// Renders the route as a path with percent-encoded parameters.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Inbox { email_id: None } => INBOX_PATH.to_string(),
            Self::Inbox { email_id: Some(id) } => format!("{INBOX_PATH}/email/{}", encode(id)),
            Self::RecipientInbox {
                recipient,
                email_id: None,
            } => format!("{INBOX_PATH}/{}", encode(recipient)),
            Self::RecipientInbox {
                recipient,
                email_id: Some(id),
            } => format!("{INBOX_PATH}/{}/email/{}", encode(recipient), encode(id)),
            Self::RedirectFirstEmail => "/redirect_first_email".to_string(),
            Self::Fullscreen { email_id } => format!("/emails/{}/fullscreen", encode(email_id)),
        }
    }

    /// Returns the open message, if any.
    #[must_use]
    pub fn email_id(&self) -> Option<&str> {
        match self {
            Self::Inbox { email_id } | Self::RecipientInbox { email_id, .. } => {
                email_id.as_deref()
            }
            Self::Fullscreen { email_id } => Some(email_id),
            Self::RedirectFirstEmail => None,
        }
    }
}

/// A route plus its query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// The view.
    pub route: Route,
    /// Decoded query parameters, in order.
    pub query: Vec<(String, String)>,
}

impl Location {
    /// Creates a location without query parameters.
    #[must_use]
    pub const fn new(route: Route) -> Self {
        Self {
            route,
            query: Vec::new(),
        }
    }

    /// Returns the first value of query parameter `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.route.path())?;
        for (i, (key, value)) in self.query.iter().enumerate() {
            let separator = if i == 0 { '?' } else { '&' };
            write!(
                f,
                "{separator}{}={}",
                utf8_percent_encode(key, QUERY),
                utf8_percent_encode(value, QUERY)
            )?;
        }
        Ok(())
    }
}

/// Source of the newest message for the first-email guard.
pub trait FirstEmailLookup {
    /// Returns the ID of the first message of the inbox's first page.
    fn first_email_id(&self) -> impl Future<Output = mailfang_api::Result<Option<String>>> + Send;
}

impl FirstEmailLookup for ApiClient {
    async fn first_email_id(&self) -> mailfang_api::Result<Option<String>> {
        Ok(self.first_email().await?.map(|email| email.id))
    }
}

/// Resolves UI paths against the route table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Router;

impl Router {
    /// Creates a router.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves a path (with optional query and fragment), following static
    /// redirects. Guards are not run, so `/redirect_first_email` resolves to
    /// [`Route::RedirectFirstEmail`].
    #[must_use]
    pub fn resolve(&self, location: &str) -> Location {
        let (path, query) = split_location(location);
        let query = parse_query(query);
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode)
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match segments.as_slice() {
            [] => {
                debug!(to = INBOX_PATH, "redirecting root");
                Route::Inbox { email_id: None }
            }
            ["emails", "inbox"] => Route::Inbox { email_id: None },
            ["emails", "inbox", "email", id] => Route::Inbox {
                email_id: Some((*id).to_string()),
            },
            ["emails", "inbox", recipient] => Route::RecipientInbox {
                recipient: (*recipient).to_string(),
                email_id: None,
            },
            ["emails", "inbox", recipient, "email", id] => Route::RecipientInbox {
                recipient: (*recipient).to_string(),
                email_id: Some((*id).to_string()),
            },
            ["redirect_first_email"] => Route::RedirectFirstEmail,
            ["emails", id, "fullscreen"] => Route::Fullscreen {
                email_id: (*id).to_string(),
            },
            _ => {
                debug!(path, "unknown path, redirecting to /");
                Route::Inbox { email_id: None }
            }
        };

        Location { route, query }
    }

    /// Resolves a path and runs navigation guards.
    ///
    /// `/redirect_first_email` fetches the first inbox page. If it has a
    /// message, navigation lands on `/emails/inbox/email/{id}` with the
    /// original query; otherwise on `/emails/inbox` without one.
    ///
    /// # Errors
    ///
    /// Returns an error if the guard's lookup fails.
    pub async fn navigate<L>(&self, location: &str, lookup: &L) -> Result<Location>
    where
        L: FirstEmailLookup + Sync,
    {
        let resolved = self.resolve(location);
        if resolved.route != Route::RedirectFirstEmail {
            return Ok(resolved);
        }

        match lookup.first_email_id().await? {
            Some(id) => {
                debug!(%id, "redirecting to first email");
                Ok(Location {
                    route: Route::Inbox { email_id: Some(id) },
                    query: resolved.query,
                })
            }
            None => {
                debug!("inbox is empty");
                Ok(Location::new(Route::Inbox { email_id: None }))
            }
        }
    }
}

fn split_location(location: &str) -> (&str, &str) {
    let location = location.split_once('#').map_or(location, |(l, _)| l);
    location.split_once('?').unwrap_or((location, ""))
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_query(key), decode_query(value))
        })
        .collect()
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn decode_query(text: &str) -> String {
    decode(&text.replace('+', " "))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    struct FixedLookup(Option<&'static str>);

    impl FirstEmailLookup for FixedLookup {
        async fn first_email_id(&self) -> mailfang_api::Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct FailingLookup;

    impl FirstEmailLookup for FailingLookup {
        async fn first_email_id(&self) -> mailfang_api::Result<Option<String>> {
            Err(mailfang_api::Error::Status {
                status: 500,
                reason: "Internal Server Error".to_string(),
            })
        }
    }

    fn route(path: &str) -> Route {
        Router::new().resolve(path).route
    }

    #[test]
    fn test_root_redirects_to_inbox() {
        assert_eq!(route("/"), Route::Inbox { email_id: None });
        assert_eq!(route(""), Route::Inbox { email_id: None });
    }

    #[test]
    fn test_inbox_routes() {
        assert_eq!(route("/emails/inbox"), Route::Inbox { email_id: None });
        assert_eq!(route("/emails/inbox/"), Route::Inbox { email_id: None });
        assert_eq!(
            route("/emails/inbox/email/abc"),
            Route::Inbox {
                email_id: Some("abc".to_string())
            }
        );
    }

    #[test]
    fn test_recipient_routes() {
        assert_eq!(
            route("/emails/inbox/a%40x.com"),
            Route::RecipientInbox {
                recipient: "a@x.com".to_string(),
                email_id: None
            }
        );
        assert_eq!(
            route("/emails/inbox/a@x.com/email/m1"),
            Route::RecipientInbox {
                recipient: "a@x.com".to_string(),
                email_id: Some("m1".to_string())
            }
        );
    }

    #[test]
    fn test_fullscreen_and_guarded_routes() {
        assert_eq!(
            route("/emails/m1/fullscreen"),
            Route::Fullscreen {
                email_id: "m1".to_string()
            }
        );
        assert_eq!(route("/redirect_first_email"), Route::RedirectFirstEmail);
    }

    #[test]
    fn test_unknown_paths_redirect_home() {
        assert_eq!(route("/nope"), Route::Inbox { email_id: None });
        assert_eq!(route("/emails/m1/raw"), Route::Inbox { email_id: None });
    }

    #[test]
    fn test_redirect_keeps_query() {
        let location = Router::new().resolve("/?search=hello+world#top");
        assert_eq!(location.route, Route::Inbox { email_id: None });
        assert_eq!(location.query_value("search"), Some("hello world"));
    }

    #[test]
    fn test_path_roundtrip() {
        let routes = [
            Route::Inbox { email_id: None },
            Route::Inbox {
                email_id: Some("m 1".to_string()),
            },
            Route::RecipientInbox {
                recipient: "a/b@x.com".to_string(),
                email_id: Some("m1".to_string()),
            },
            Route::RedirectFirstEmail,
            Route::Fullscreen {
                email_id: "m1".to_string(),
            },
        ];
        for r in routes {
            assert_eq!(route(&r.path()), r);
        }
    }

    #[test]
    fn test_path_encoding() {
        let r = Route::RecipientInbox {
            recipient: "a b/c@x.com".to_string(),
            email_id: None,
        };
        assert_eq!(r.path(), "/emails/inbox/a%20b%2Fc@x.com");
    }

    #[test]
    fn test_location_display() {
        let mut location = Location::new(Route::Inbox {
            email_id: Some("m1".to_string()),
        });
        location.query.push(("search".to_string(), "a&b c".to_string()));
        assert_eq!(location.to_string(), "/emails/inbox/email/m1?search=a%26b%20c");
    }

    #[tokio::test]
    async fn test_navigate_to_first_email_keeps_query() {
        let location = Router::new()
            .navigate("/redirect_first_email?search=x", &FixedLookup(Some("m7")))
            .await
            .unwrap();
        assert_eq!(
            location.route,
            Route::Inbox {
                email_id: Some("m7".to_string())
            }
        );
        assert_eq!(location.to_string(), "/emails/inbox/email/m7?search=x");
    }

    #[tokio::test]
    async fn test_navigate_with_empty_inbox() {
        let location = Router::new()
            .navigate("/redirect_first_email?search=x", &FixedLookup(None))
            .await
            .unwrap();
        assert_eq!(location.to_string(), "/emails/inbox");
    }

    #[tokio::test]
    async fn test_navigate_without_guard_skips_lookup() {
        let location = Router::new()
            .navigate("/emails/m1/fullscreen", &FailingLookup)
            .await
            .unwrap();
        assert_eq!(location.route.email_id(), Some("m1"));
    }

    #[tokio::test]
    async fn test_navigate_guard_failure() {
        let result = Router::new()
            .navigate("/redirect_first_email", &FailingLookup)
            .await;
        assert!(matches!(result, Err(crate::Error::Api(_))));
    }
}
