//! Lookup of configured notifiers by name

use crate::config::NotifierConfig;
use tracing::debug;

/// Immutable list of notifiers, looked up by name.
///
/// When two notifiers share a name the one declared first wins.
#[derive(Debug, Clone, Default)]
pub struct NotifierRegistry {
    notifiers: Vec<NotifierConfig>,
}

impl NotifierRegistry {
    /// Create a registry from configured notifiers
    pub fn new(notifiers: Vec<NotifierConfig>) -> Self {
        Self { notifiers }
    }

    /// Find the notifier with the given name
    pub fn lookup(&self, name: &str) -> Option<&NotifierConfig> {
        self.notifiers.iter().find(|n| n.name == name)
    }

    /// Resolve a notify list in order, skipping names with no notifier
    pub fn resolve<'a>(
        &'a self,
        names: &'a [String],
    ) -> impl Iterator<Item = &'a NotifierConfig> + 'a {
        names.iter().filter_map(move |name| {
            let found = self.lookup(name);
            if found.is_none() {
                debug!(notifier = %name, "No notifier registered under this name");
            }
            found
        })
    }
}
