//! Route Table
//!
//! The four pages of the client plus the guard that bounces between the auth
//! page and the rest depending on whether a token is stored.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Auth,
    Profile,
    BaziPreview(i64),
    Result(i64),
}

impl Route {
    /// Parse a path; unknown paths and `/` land on the auth page
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            ["profile"] => Route::Profile,
            ["bazi", id] => id.parse().map(Route::BaziPreview).unwrap_or(Route::Auth),
            ["result", id] => id.parse().map(Route::Result).unwrap_or(Route::Auth),
            _ => Route::Auth,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Auth => "/auth".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::BaziPreview(id) => format!("/bazi/{}", id),
            Route::Result(id) => format!("/result/{}", id),
        }
    }

    /// Where the user should actually be, given token presence.
    ///
    /// Logged-in users skip the auth page; everything else requires a token.
    pub fn guard(self, has_token: bool) -> Self {
        match (self, has_token) {
            (Route::Auth, true) => Route::Profile,
            (Route::Auth, false) => Route::Auth,
            (_, false) => Route::Auth,
            (route, true) => route,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Inviter code from a `?ref=` query string or a full referral URL
pub fn referral_code_from_query(query_or_url: &str) -> Option<String> {
    let query = match query_or_url.split_once('?') {
        Some((_, q)) => q,
        None => query_or_url,
    };
    let query = query.split('#').next().unwrap_or("");

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "ref")
        .and_then(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(|v| v.trim().to_string())
        })
        .filter(|v| !v.is_empty())
}
