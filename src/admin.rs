//! Admin console gate.
//!
//! A single shared password compared in plaintext. There is no hashing, no
//! rate limit and no lockout; this only keeps shoppers out of the admin views.

#[derive(Debug, Clone)]
pub struct AdminGate {
    password: String,
    authenticated: bool,
}

impl AdminGate {
    pub fn new(password: impl Into<String>) -> Self { Self { password: password.into(), authenticated: false } }

    pub fn is_authenticated(&self) -> bool { self.authenticated }
    pub fn password(&self) -> &str { &self.password }

    /// A wrong attempt never ends an existing session.
    pub fn login(&mut self, attempt: &str) -> bool {
        let ok = attempt == self.password;
        if ok { self.authenticated = true; }
        ok
    }

    pub fn logout(&mut self) { self.authenticated = false; }

    /// Empty passwords are refused.
    pub fn change_password(&mut self, new_password: &str) -> bool {
        if new_password.is_empty() { return false; }
        self.password = new_password.to_string();
        true
    }
}
