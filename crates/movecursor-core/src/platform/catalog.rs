/// Ordered set of window identities considered terminals.
///
/// Entries are deduplicated case-insensitively, keeping the first spelling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TerminalCatalog {
    entries: Vec<String>,
    lowered: Vec<String>,
}

impl TerminalCatalog {
    pub fn new<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::default();
        for identity in identities {
            let identity = identity.as_ref().trim();
            if identity.is_empty() {
                continue;
            }
            let lowered = identity.to_lowercase();
            if !catalog.lowered.contains(&lowered) {
                catalog.entries.push(identity.to_string());
                catalog.lowered.push(lowered);
            }
        }
        catalog
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact match first, then substring: terminals often append a
    /// title-derived suffix to their window class.
    pub fn matches(&self, identity: &str) -> bool {
        if identity.is_empty() {
            return false;
        }
        let identity = identity.to_lowercase();
        self.lowered.iter().any(|entry| *entry == identity)
            || self
                .lowered
                .iter()
                .any(|entry| identity.contains(entry.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let catalog = TerminalCatalog::new(["xterm", "ConsoleWindowClass"]);
        assert!(catalog.matches("xterm"));
        assert!(catalog.matches("XTERM"));
        assert!(catalog.matches("consolewindowclass"));
    }

    #[test]
    fn test_substring_match() {
        let catalog = TerminalCatalog::new(["konsole"]);
        assert!(catalog.matches("org.kde.konsole-12345"));
        assert!(catalog.matches("ORG.KDE.KONSOLE"));
        assert!(!catalog.matches("kons"));
    }

    #[test]
    fn test_empty_identity_never_matches() {
        let catalog = TerminalCatalog::new(["xterm"]);
        assert!(!catalog.matches(""));
    }

    #[test]
    fn test_deduplicates_case_insensitively() {
        let catalog = TerminalCatalog::new(["Kitty", "kitty", " KITTY ", "", "xterm"]);
        assert_eq!(catalog.entries(), ["Kitty", "xterm"]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_empty_catalog_matches_nothing() {
        let catalog = TerminalCatalog::new(Vec::<String>::new());
        assert!(catalog.is_empty());
        assert!(!catalog.matches("xterm"));
    }
}
