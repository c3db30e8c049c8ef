// Breakpoint domain model - viewport tiers and their grid column counts
use serde::{Deserialize, Serialize};
use std::fmt;

/// Viewport-width tier of the dashboard grid.
///
/// Variants are declared largest first; `Lg` is the reference tier every other
/// tier is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Lg,
    Md,
    Sm,
    Xs,
    Xxs,
}

impl Breakpoint {
    /// All tiers, largest first.
    pub const ALL: [Breakpoint; 5] = [
        Breakpoint::Lg,
        Breakpoint::Md,
        Breakpoint::Sm,
        Breakpoint::Xs,
        Breakpoint::Xxs,
    ];

    pub const REFERENCE: Breakpoint = Breakpoint::Lg;

    /// Tiers that are always stacked from the reference tier.
    pub const STACKED: [Breakpoint; 2] = [Breakpoint::Xs, Breakpoint::Xxs];

    /// Tiers that are projected from the reference tier on first visit.
    pub const MIDDLE: [Breakpoint; 2] = [Breakpoint::Md, Breakpoint::Sm];

    /// Inclusive lower bound of the tier, in pixels.
    pub const fn min_width_px(self) -> u32 {
        match self {
            Breakpoint::Lg => 1200,
            Breakpoint::Md => 996,
            Breakpoint::Sm => 768,
            Breakpoint::Xs => 480,
            Breakpoint::Xxs => 0,
        }
    }

    pub const fn columns(self) -> u32 {
        match self {
            Breakpoint::Lg => 12,
            Breakpoint::Md => 10,
            Breakpoint::Sm => 6,
            Breakpoint::Xs => 4,
            Breakpoint::Xxs => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Breakpoint::Lg => "lg",
            Breakpoint::Md => "md",
            Breakpoint::Sm => "sm",
            Breakpoint::Xs => "xs",
            Breakpoint::Xxs => "xxs",
        }
    }

    pub const fn is_reference(self) -> bool {
        matches!(self, Breakpoint::Lg)
    }

    pub const fn is_stacked(self) -> bool {
        matches!(self, Breakpoint::Xs | Breakpoint::Xxs)
    }

    pub const fn is_middle(self) -> bool {
        matches!(self, Breakpoint::Md | Breakpoint::Sm)
    }

    /// Resolve the active tier for a container width.
    ///
    /// Picks the largest tier whose threshold is at or below `width_px`, so a
    /// width equal to a threshold lands in the larger tier.
    pub fn resolve(width_px: u32) -> Breakpoint {
        Self::ALL
            .into_iter()
            .find(|bp| width_px >= bp.min_width_px())
            .unwrap_or(Breakpoint::Xxs)
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_thresholds_are_inclusive() {
        assert_eq!(Breakpoint::resolve(1200), Breakpoint::Lg);
        assert_eq!(Breakpoint::resolve(1199), Breakpoint::Md);
        assert_eq!(Breakpoint::resolve(996), Breakpoint::Md);
        assert_eq!(Breakpoint::resolve(995), Breakpoint::Sm);
        assert_eq!(Breakpoint::resolve(768), Breakpoint::Sm);
        assert_eq!(Breakpoint::resolve(480), Breakpoint::Xs);
        assert_eq!(Breakpoint::resolve(479), Breakpoint::Xxs);
        assert_eq!(Breakpoint::resolve(0), Breakpoint::Xxs);
        assert_eq!(Breakpoint::resolve(u32::MAX), Breakpoint::Lg);
    }

    #[test]
    fn test_resolve_is_monotonic() {
        let mut previous = Breakpoint::resolve(0).columns();
        for width in (0..=2000).step_by(7) {
            let cols = Breakpoint::resolve(width).columns();
            assert!(cols >= previous, "columns dropped at width {}", width);
            previous = cols;
        }
    }

    #[test]
    fn test_tier_groups_partition_all_tiers() {
        for bp in Breakpoint::ALL {
            let groups = [bp.is_reference(), bp.is_middle(), bp.is_stacked()];
            assert_eq!(groups.iter().filter(|g| **g).count(), 1, "{}", bp);
        }
    }

    #[test]
    fn test_serde_uses_short_labels() {
        assert_eq!(serde_json::to_string(&Breakpoint::Xxs).unwrap(), "\"xxs\"");
        let bp: Breakpoint = serde_json::from_str("\"md\"").unwrap();
        assert_eq!(bp, Breakpoint::Md);
    }
}
