// Layout domain model - grid placements per breakpoint and the projections between tiers
use super::breakpoint::Breakpoint;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Height used when a placement carries no `h`.
pub const FALLBACK_HEIGHT: u32 = 6;

fn fallback_height() -> u32 {
    FALLBACK_HEIGHT
}

/// One widget's placement in one tier's grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutItem {
    /// Id of the placed widget.
    pub i: String,
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
    #[serde(default = "min_width")]
    pub w: u32,
    #[serde(default = "fallback_height")]
    pub h: u32,
}

fn min_width() -> u32 {
    1
}

impl LayoutItem {
    pub fn new(i: impl Into<String>, x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            i: i.into(),
            x,
            y,
            w,
            h,
        }
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
}

/// Placements keyed by tier. A missing tier means "not authored yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponsiveLayouts(BTreeMap<Breakpoint, Vec<LayoutItem>>);

impl ResponsiveLayouts {
    /// Default arrangement: an empty reference tier and nothing else.
    pub fn reference_only() -> Self {
        let mut tiers = BTreeMap::new();
        tiers.insert(Breakpoint::REFERENCE, Vec::new());
        Self(tiers)
    }

    pub fn get(&self, bp: Breakpoint) -> &[LayoutItem] {
        self.0.get(&bp).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reference(&self) -> &[LayoutItem] {
        self.get(Breakpoint::REFERENCE)
    }

    /// Whether the tier has an entry, even an empty one.
    pub fn contains(&self, bp: Breakpoint) -> bool {
        self.0.contains_key(&bp)
    }

    /// Whether the tier holds at least one placement.
    pub fn is_authored(&self, bp: Breakpoint) -> bool {
        self.0.get(&bp).is_some_and(|items| !items.is_empty())
    }

    pub fn set(&mut self, bp: Breakpoint, items: Vec<LayoutItem>) {
        self.0.insert(bp, items);
    }

    pub fn push(&mut self, bp: Breakpoint, item: LayoutItem) {
        self.0.entry(bp).or_default().push(item);
    }

    /// Drop every placement of `widget_id`, in every tier.
    pub fn remove_widget(&mut self, widget_id: &str) {
        for items in self.0.values_mut() {
            items.retain(|item| item.i != widget_id);
        }
    }

    pub fn tiers(&self) -> impl Iterator<Item = (Breakpoint, &[LayoutItem])> {
        self.0.iter().map(|(bp, items)| (*bp, items.as_slice()))
    }

    /// Recompute the stacked tiers from the reference tier.
    pub fn restack(&mut self) {
        let reference = self.reference().to_vec();
        for bp in Breakpoint::STACKED {
            self.0.insert(bp, stack(&reference, bp.columns()));
        }
    }
}

/// Rescale a layout authored on `source_columns` onto `target_columns`.
///
/// Only the horizontal axis changes; `y` and `h` are carried over. The result
/// may overlap, collision handling is the renderer's job.
pub fn project(source: &[LayoutItem], source_columns: u32, target_columns: u32) -> Vec<LayoutItem> {
    if source_columns == target_columns || source_columns == 0 {
        return source.to_vec();
    }

    let target_columns = target_columns.max(1);
    let ratio = f64::from(target_columns) / f64::from(source_columns);

    source
        .iter()
        .map(|item| {
            let w = scale(item.w, ratio).clamp(1, target_columns);
            let x = scale(item.x, ratio).min(target_columns - w);
            LayoutItem {
                x,
                w,
                ..item.clone()
            }
        })
        .collect()
}

fn scale(value: u32, ratio: f64) -> u32 {
    (f64::from(value) * ratio).round() as u32
}

/// Stack a layout into full-width rows, top to bottom.
///
/// Items are ordered by `(y, x)`; each one starts where the previous ended.
pub fn stack(reference: &[LayoutItem], target_columns: u32) -> Vec<LayoutItem> {
    let mut sorted: Vec<&LayoutItem> = reference.iter().collect();
    sorted.sort_by_key(|item| (item.y, item.x));

    let mut y = 0u32;
    sorted
        .into_iter()
        .map(|item| {
            let out = LayoutItem {
                i: item.i.clone(),
                x: 0,
                y,
                w: target_columns,
                h: item.h,
            };
            y = y.saturating_add(item.h);
            out
        })
        .collect()
}

/// First free row below every item of a tier.
pub fn bottom_of(items: &[LayoutItem]) -> u32 {
    items.iter().map(LayoutItem::bottom).max().unwrap_or(0)
}

/// Make renderer-supplied placements valid for a tier of `columns` columns.
///
/// Duplicate widget ids keep their first placement; spans and origins are
/// clamped into the grid.
pub fn sanitize(items: Vec<LayoutItem>, columns: u32) -> Vec<LayoutItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.i.clone()))
        .map(|mut item| {
            item.w = item.w.clamp(1, columns);
            item.x = item.x.min(columns - item.w);
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_same_columns_is_an_equal_copy() {
        let source = vec![LayoutItem::new("a", 3, 2, 4, 5)];
        let projected = project(&source, 12, 12);
        assert_eq!(projected, source);
        assert_ne!(projected.as_ptr(), source.as_ptr());
    }

    #[test]
    fn test_project_halves_columns() {
        let source = vec![LayoutItem::new("a", 0, 0, 6, 6)];
        assert_eq!(project(&source, 12, 6), vec![LayoutItem::new("a", 0, 0, 3, 6)]);
    }

    #[test]
    fn test_project_keeps_items_inside_grid() {
        let mut source = Vec::new();
        for x in 0..12 {
            for w in 1..=(12 - x) {
                source.push(LayoutItem::new(format!("{}-{}", x, w), x, x + w, w, 3));
            }
        }

        for target in [1, 2, 4, 6, 10] {
            for (before, after) in source.iter().zip(project(&source, 12, target)) {
                assert!(after.w >= 1 && after.w <= target);
                assert!(after.x + after.w <= target);
                assert_eq!(after.y, before.y);
                assert_eq!(after.h, before.h);
            }
        }
    }

    #[test]
    fn test_project_rounds_to_nearest() {
        let source = vec![LayoutItem::new("a", 6, 0, 6, 4)];
        // 6 * 10/12 = 5
        assert_eq!(project(&source, 12, 10), vec![LayoutItem::new("a", 5, 0, 5, 4)]);
        // 3 * 10/12 = 2.5 rounds up
        let source = vec![LayoutItem::new("b", 9, 1, 3, 4)];
        let projected = project(&source, 12, 10);
        assert_eq!(projected[0].w, 3);
        assert_eq!(projected[0].x, 7);
    }

    #[test]
    fn test_stack_orders_by_row_then_column() {
        let reference = vec![
            LayoutItem::new("first", 0, 5, 6, 4),
            LayoutItem::new("second", 6, 0, 6, 5),
        ];
        let stacked = stack(&reference, 2);
        assert_eq!(
            stacked,
            vec![
                LayoutItem::new("second", 0, 0, 2, 5),
                LayoutItem::new("first", 0, 5, 2, 4),
            ]
        );
    }

    #[test]
    fn test_stack_never_overlaps() {
        let reference = vec![
            LayoutItem::new("c", 4, 3, 4, 2),
            LayoutItem::new("a", 0, 0, 4, 3),
            LayoutItem::new("b", 4, 0, 8, 7),
            LayoutItem::new("d", 0, 3, 4, 1),
        ];
        let stacked = stack(&reference, 4);

        let mut expected_y = 0;
        for item in &stacked {
            assert_eq!(item.x, 0);
            assert_eq!(item.w, 4);
            assert_eq!(item.y, expected_y);
            expected_y += item.h;
        }
        let order: Vec<&str> = stacked.iter().map(|i| i.i.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_missing_height_falls_back() {
        let item: LayoutItem = serde_json::from_str(r#"{"i":"a","x":0,"y":0,"w":3}"#).unwrap();
        assert_eq!(item.h, FALLBACK_HEIGHT);
        let stacked = stack(&[item.clone(), LayoutItem { i: "b".into(), y: 1, ..item }], 2);
        assert_eq!(stacked[1].y, FALLBACK_HEIGHT);
    }

    #[test]
    fn test_sanitize_drops_duplicates_and_clamps() {
        let items = vec![
            LayoutItem::new("a", 8, 0, 12, 2),
            LayoutItem::new("a", 0, 4, 2, 2),
            LayoutItem::new("b", 5, 0, 0, 2),
        ];
        let clean = sanitize(items, 6);
        assert_eq!(
            clean,
            vec![LayoutItem::new("a", 0, 0, 6, 2), LayoutItem::new("b", 5, 0, 1, 2)]
        );
    }

    #[test]
    fn test_bottom_of_empty_tier_is_zero() {
        assert_eq!(bottom_of(&[]), 0);
        let items = vec![LayoutItem::new("a", 0, 0, 2, 6), LayoutItem::new("b", 2, 3, 2, 9)];
        assert_eq!(bottom_of(&items), 12);
    }

    #[test]
    fn test_layouts_serialize_as_tier_map() {
        let mut layouts = ResponsiveLayouts::reference_only();
        layouts.push(Breakpoint::Lg, LayoutItem::new("a", 0, 0, 6, 6));
        let json = serde_json::to_value(&layouts).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"lg": [{"i": "a", "x": 0, "y": 0, "w": 6, "h": 6}]})
        );
    }

    #[test]
    fn test_restack_derives_both_small_tiers() {
        let mut layouts = ResponsiveLayouts::reference_only();
        layouts.push(Breakpoint::Lg, LayoutItem::new("a", 6, 0, 6, 4));
        layouts.restack();
        assert_eq!(layouts.get(Breakpoint::Xs), &[LayoutItem::new("a", 0, 0, 4, 4)]);
        assert_eq!(layouts.get(Breakpoint::Xxs), &[LayoutItem::new("a", 0, 0, 2, 4)]);
    }
}
