use std::cell::RefCell;

/// Key under which the auth token is persisted.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Persistent home of the opaque auth token.
pub trait TokenStore {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str);
    fn clear_token(&self);
}

/// Keeps the token in memory; used natively and in tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RefCell<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: RefCell::new(Some(token.into())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.borrow().clone().filter(|t| !t.is_empty())
    }

    fn set_token(&self, token: &str) {
        *self.token.borrow_mut() = Some(token.to_string());
    }

    fn clear_token(&self) {
        self.token.borrow_mut().take();
    }
}
