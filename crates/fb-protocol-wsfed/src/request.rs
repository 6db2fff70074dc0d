//! Passive sign-in request.

use chrono::{DateTime, SecondsFormat, Utc};
use fb_protocol::endpoint::append_query;

/// `wa` value of a sign-in request.
pub const WSIGNIN: &str = "wsignin1.0";

/// A `wsignin1.0` request to a security token service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    /// Realm (`wtrealm`).
    pub realm: String,
    /// Reply address (`wreply`).
    pub reply: String,
    /// Context value returned unchanged (`wctx`).
    pub context: String,
    /// Current time at the requestor (`wct`).
    pub current_time: DateTime<Utc>,
    /// Home realm (`whr`).
    pub home_realm: Option<String>,
    /// Preferred language (`wlang`).
    pub language: Option<String>,
}

impl SignInRequest {
    /// Creates a request with a fresh random context value.
    #[must_use]
    pub fn new(realm: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            reply: reply.into(),
            context: uuid::Uuid::new_v4().simple().to_string(),
            current_time: Utc::now(),
            home_realm: None,
            language: None,
        }
    }

    /// Sets the home realm.
    #[must_use]
    pub fn with_home_realm(mut self, home_realm: Option<String>) -> Self {
        self.home_realm = home_realm;
        self
    }

    /// Sets the preferred language.
    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Returns the redirect URL to the token service.
    #[must_use]
    pub fn to_url(&self, sts_url: &str) -> String {
        let wct = self.current_time.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut params = vec![
            ("wa", WSIGNIN),
            ("wtrealm", self.realm.as_str()),
            ("wreply", self.reply.as_str()),
            ("wctx", self.context.as_str()),
            ("wct", wct.as_str()),
        ];
        if let Some(whr) = &self.home_realm {
            params.push(("whr", whr.as_str()));
        }
        if let Some(lang) = &self.language {
            params.push(("wlang", lang.as_str()));
        }
        append_query(sts_url, &params)
    }
}
