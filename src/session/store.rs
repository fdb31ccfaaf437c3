//! Server-side session state.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

/// Server-side state keyed by an opaque id and associated with a client via
/// a cookie.
///
/// The attribute map uses interior mutability so handlers holding an
/// `Arc<Session>` can mutate attributes while the cache retains ownership
/// of the entry. Attribute order is irrelevant.
#[derive(Debug)]
pub struct Session {
    id: String,
    attributes: Mutex<HashMap<String, String>>,
}

impl Session {
    /// Create a session with a fresh, globally unique id.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    /// Create a session carrying a caller-chosen id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Mutex::new(HashMap::new()),
        }
    }

    /// The session's opaque identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.lock().expect("session lock poisoned").get(name).cloned()
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes
            .lock()
            .expect("session lock poisoned")
            .insert(name.into(), value.into());
    }

    /// Remove an attribute, returning the previous value if any.
    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.attributes.lock().expect("session lock poisoned").remove(name)
    }

    /// Snapshot of all attributes.
    pub fn attributes(&self) -> HashMap<String, String> {
        self.attributes.lock().expect("session lock poisoned").clone()
    }

    /// Copy every attribute of `stored` onto this session, overwriting any
    /// value already present here. Used by the cache's merge rule, where
    /// stored data wins.
    pub(crate) fn absorb(&self, stored: &Session) {
        let from = stored.attributes();
        let mut into = self.attributes.lock().expect("session lock poisoned");
        for (name, value) in from {
            into.insert(name, value);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(Session::new().id(), Session::new().id());
    }

    #[test]
    fn attribute_round_trip() {
        let session = Session::new();
        assert_eq!(session.attribute("user"), None);

        session.set_attribute("user", "alice");
        assert_eq!(session.attribute("user").as_deref(), Some("alice"));

        assert_eq!(session.remove_attribute("user").as_deref(), Some("alice"));
        assert_eq!(session.attribute("user"), None);
    }

    #[test]
    fn absorb_overwrites_local_values() {
        let stored = Session::with_id("a");
        stored.set_attribute("theme", "dark");
        stored.set_attribute("lang", "en");

        let incoming = Session::with_id("a");
        incoming.set_attribute("theme", "light");
        incoming.set_attribute("tz", "UTC");

        incoming.absorb(&stored);
        assert_eq!(incoming.attribute("theme").as_deref(), Some("dark"));
        assert_eq!(incoming.attribute("lang").as_deref(), Some("en"));
        assert_eq!(incoming.attribute("tz").as_deref(), Some("UTC"));
    }
}
