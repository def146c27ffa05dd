use std::time::Duration;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Session cookies live for 30 days.
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: bool,
    pub max_age: Duration,
}

/// Outbound side-channel a response uses to set or clear cookies on the client.
pub trait ResponseChannel {
    fn set_cookie(&mut self, name: &str, value: &str, options: CookieOptions);
    fn clear_cookie(&mut self, name: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    Set {
        name: String,
        value: String,
        options: CookieOptions,
    },
    Clear {
        name: String,
    },
}

/// Collects cookie directives during a request; the HTTP layer applies them to the response.
#[derive(Debug, Default)]
pub struct CookieJar {
    directives: Vec<CookieDirective>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directives(&self) -> &[CookieDirective] {
        &self.directives
    }

    pub fn into_directives(self) -> Vec<CookieDirective> {
        self.directives
    }

    /// Value of the last cookie set under `name`, if it was not cleared afterwards.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        let mut value = None;
        for directive in &self.directives {
            match directive {
                CookieDirective::Set { name: n, value: v, .. } if n == name => value = Some(v.as_str()),
                CookieDirective::Clear { name: n } if n == name => value = None,
                _ => {}
            }
        }
        value
    }
}

impl ResponseChannel for CookieJar {
    fn set_cookie(&mut self, name: &str, value: &str, options: CookieOptions) {
        self.directives.push(CookieDirective::Set {
            name: name.to_string(),
            value: value.to_string(),
            options,
        });
    }

    fn clear_cookie(&mut self, name: &str) {
        self.directives.push(CookieDirective::Clear {
            name: name.to_string(),
        });
    }
}
