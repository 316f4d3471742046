//! Page surfaces
//!
//! Each surface names the element handles of one UI area and exposes
//! behavior-level operations over them. Section surfaces hold a
//! [`BasePage`] and forward the shared chrome operations to it, so the
//! shared capabilities are always available without an inheritance chain.

mod base;
mod career;
mod contact;
mod demos;

pub use base::BasePage;
pub use career::CareerPage;
pub use contact::ContactPage;
pub use demos::{DemosPage, ReportContent};

use std::collections::BTreeSet;

/// Tokens of an iframe `sandbox` attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxFlags {
    tokens: BTreeSet<String>,
    present: bool,
}

impl SandboxFlags {
    /// `None` means the attribute is absent, which disables sandboxing
    /// entirely rather than granting nothing.
    pub fn parse(attribute: Option<&str>) -> Self {
        match attribute {
            None => Self::default(),
            Some(raw) => Self {
                tokens: raw
                    .split_ascii_whitespace()
                    .map(|t| t.to_ascii_lowercase())
                    .collect(),
                present: true,
            },
        }
    }

    pub fn is_sandboxed(&self) -> bool {
        self.present
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn allows_scripts(&self) -> bool {
        !self.present || self.contains("allow-scripts")
    }

    pub fn allows_same_origin(&self) -> bool {
        !self.present || self.contains("allow-same-origin")
    }

    pub fn allows_forms(&self) -> bool {
        !self.present || self.contains("allow-forms")
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_flags() {
        let flags = SandboxFlags::parse(Some("allow-scripts  allow-same-origin allow-popups"));
        assert!(flags.is_sandboxed());
        assert!(flags.allows_scripts());
        assert!(flags.allows_same_origin());
        assert!(!flags.allows_forms());
        assert_eq!(flags.tokens().count(), 3);
    }

    #[test]
    fn test_missing_sandbox_allows_everything() {
        let flags = SandboxFlags::parse(None);
        assert!(!flags.is_sandboxed());
        assert!(flags.allows_forms());
    }

    #[test]
    fn test_empty_sandbox_allows_nothing() {
        let flags = SandboxFlags::parse(Some(""));
        assert!(flags.is_sandboxed());
        assert!(!flags.allows_scripts());
        assert!(!flags.allows_forms());
    }
}
