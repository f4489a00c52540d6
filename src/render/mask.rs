//! Render masks over visibility groups

use crate::error::{PortalError, PortalResult};
use std::fmt;

/// Which visibility groups a camera renders.
///
/// Parsed from `|`-separated terms; a leading `!` excludes the group, e.g.
/// `"main_scene | s0_slot1 | !do_not_display_group"`. A `*` in a term matches
/// any run of characters, so `!s*_slot*` hides every per-view group. Nodes
/// without groups always pass unless excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderMask {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl RenderMask {
    /// Mask that renders everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse(mask: &str) -> PortalResult<Self> {
        let mut result = Self::default();

        for term in mask.split('|').map(str::trim).filter(|t| !t.is_empty()) {
            let (negated, name) = match term.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, term),
            };

            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '*'));
            if !valid {
                return Err(PortalError::InvalidRenderMask(mask.to_string()));
            }

            if negated {
                result.exclude.push(name.to_string());
            } else {
                result.include.push(name.to_string());
            }
        }

        Ok(result)
    }

    pub fn including(mut self, group: impl Into<String>) -> Self {
        self.include.push(group.into());
        self
    }

    pub fn excluding(mut self, group: impl Into<String>) -> Self {
        self.exclude.push(group.into());
        self
    }

    pub fn excludes(&self, group: &str) -> bool {
        self.exclude.iter().any(|pattern| group_matches(pattern, group))
    }

    /// Whether the mask restricts tagged nodes to a set of groups
    pub fn has_includes(&self) -> bool {
        !self.include.is_empty()
    }

    /// Whether a node tagged with `groups` is rendered under this mask
    pub fn allows<S: AsRef<str>>(&self, groups: &[S]) -> bool {
        if groups.iter().any(|g| self.excludes(g.as_ref())) {
            return false;
        }
        if groups.is_empty() || self.include.is_empty() {
            return true;
        }
        groups
            .iter()
            .any(|g| self.include.iter().any(|i| group_matches(i, g.as_ref())))
    }
}

/// Match a group name against a term where `*` stands for any characters
fn group_matches(pattern: &str, group: &str) -> bool {
    let Some(star) = pattern.find('*') else {
        return pattern == group;
    };
    let Some(tail) = group.strip_prefix(&pattern[..star]) else {
        return false;
    };
    let rest = &pattern[star + 1..];

    (0..=tail.len())
        .filter(|i| tail.is_char_boundary(*i))
        .any(|i| group_matches(rest, &tail[i..]))
}

impl fmt::Display for RenderMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .include
            .iter()
            .cloned()
            .chain(self.exclude.iter().map(|g| format!("!{g}")))
            .collect();
        write!(f, "{}", terms.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_only_mask() {
        let mask = RenderMask::parse("!do_not_display_group").unwrap();
        assert!(mask.allows::<&str>(&[]));
        assert!(mask.allows(&["s0_slot1"]));
        assert!(!mask.allows(&["s0_slot1", "do_not_display_group"]));
    }

    #[test]
    fn inclusion_restricts_tagged_nodes() {
        let mask = RenderMask::parse("main_scene | s0_slot1").unwrap();
        assert!(mask.allows(&["s0_slot1"]));
        assert!(!mask.allows(&["s1_slot0"]));
        // Untagged geometry stays visible
        assert!(mask.allows::<&str>(&[]));
    }

    #[test]
    fn display_roundtrips() {
        let mask = RenderMask::all()
            .including("main_scene")
            .excluding("do_not_display_group");
        assert_eq!(mask.to_string(), "main_scene | !do_not_display_group");
        assert_eq!(RenderMask::parse(&mask.to_string()).unwrap(), mask);
    }

    #[test]
    fn wildcard_terms_match_view_groups() {
        let mask = RenderMask::parse("!do_not_display_group | !s*_slot*").unwrap();
        assert!(!mask.allows(&["s0_slot1"]));
        assert!(!mask.allows(&["s12_slot3"]));
        assert!(mask.allows(&["sky"]));
        assert!(mask.allows(&["main_scene"]));

        let only_views = RenderMask::all().including("s*_slot*");
        assert!(only_views.has_includes());
        assert!(only_views.allows(&["s2_slot0"]));
        assert!(!only_views.allows(&["slot0"]));
    }

    #[test]
    fn rejects_bad_terms() {
        assert!(RenderMask::parse("!").is_err());
        assert!(RenderMask::parse("a b").is_err());
        assert_eq!(RenderMask::parse("").unwrap(), RenderMask::all());
    }
}
