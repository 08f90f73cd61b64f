//! Scoped subscription handle

use std::fmt;

type Release = Box<dyn FnOnce() + Send>;

/// A live subscription on a presence channel.
///
/// The release hook runs exactly once: on [`Subscription::close`] or when
/// the handle is dropped, whichever comes first.
pub struct Subscription {
    label: String,
    release: Option<Release>,
}

impl Subscription {
    pub fn new(label: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release
    pub fn detached(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            release: None,
        }
    }

    /// What this subscription observes, e.g. `typing:room-42`
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Release the subscription now
    pub fn close(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.release.is_some())
            .finish()
    }
}
