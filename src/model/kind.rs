//! Application and package kinds.

use serde::{Deserialize, Serialize};

/// Classification of an application or deployment package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Not set by the client
    #[default]
    Unspecified,
    /// Regular workload
    Normal,
    /// Add-on installed alongside workloads
    Addon,
    /// Platform extension
    Extension,
}

impl Kind {
    /// Kind to persist for a newly created entity.
    ///
    /// `Unspecified` is stored as `Normal`.
    pub fn or_normal(self) -> Kind {
        match self {
            Kind::Unspecified => Kind::Normal,
            other => other,
        }
    }

    /// True if an entity of this kind passes a list filter. An empty filter
    /// selects everything and `Normal` also selects unset kinds.
    pub fn selected_by(self, kinds: &[Kind]) -> bool {
        kinds.is_empty()
            || kinds.contains(&self)
            || (self == Kind::Unspecified && kinds.contains(&Kind::Normal))
    }

    /// Kind to persist when updating an entity currently stored as `current`.
    ///
    /// `Unspecified` keeps the stored kind.
    pub fn or_keep(self, current: Kind) -> Kind {
        match self {
            Kind::Unspecified => current,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Unspecified => "unspecified",
            Kind::Normal => "normal",
            Kind::Addon => "addon",
            Kind::Extension => "extension",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_stored_as_normal() {
        assert_eq!(Kind::Unspecified.or_normal(), Kind::Normal);
        assert_eq!(Kind::Addon.or_normal(), Kind::Addon);
    }

    #[test]
    fn test_unspecified_keeps_current() {
        assert_eq!(Kind::Unspecified.or_keep(Kind::Extension), Kind::Extension);
        assert_eq!(Kind::Addon.or_keep(Kind::Extension), Kind::Addon);
    }

    #[test]
    fn test_kind_filter() {
        assert!(Kind::Addon.selected_by(&[]));
        assert!(Kind::Addon.selected_by(&[Kind::Extension, Kind::Addon]));
        assert!(!Kind::Normal.selected_by(&[Kind::Addon]));
        assert!(Kind::Unspecified.selected_by(&[Kind::Normal]));
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Kind::Addon).unwrap();
        assert_eq!(json, "\"addon\"");
        let kind: Kind = serde_json::from_str("\"extension\"").unwrap();
        assert_eq!(kind, Kind::Extension);
    }
}
