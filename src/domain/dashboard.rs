// Dashboard domain model - widget set, per-tier layouts and the transitions between them
use super::breakpoint::Breakpoint;
use super::layout::{bottom_of, project, sanitize, LayoutItem, ResponsiveLayouts};
use super::widget::{Widget, WidgetKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("widget {0} is not on the dashboard")]
    UnknownWidget(String),
    #[error("container width has not been measured yet")]
    NotMeasured,
}

/// Why the container width was (re)measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureReason {
    Mount,
    Resize,
    Orientation,
    Visibility,
}

/// Every input the dashboard reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    /// New container width; `None` when the container is not laid out yet.
    Measured {
        width: Option<u32>,
        reason: MeasureReason,
    },
    AddWidget {
        kind: WidgetKind,
        title: Option<String>,
    },
    RemoveWidget {
        id: String,
    },
    /// Drag or resize finished on the active tier.
    LayoutChanged {
        items: Vec<LayoutItem>,
    },
    Clear,
}

/// What a single event did to the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Widgets or layouts changed and should be persisted.
    pub changed: bool,
    /// The dashboard was reset and the persisted snapshot should be dropped.
    pub cleared: bool,
    /// Active tier after the event, if the width is known.
    pub breakpoint: Option<Breakpoint>,
    /// Middle tier filled by projection during this event.
    pub projected: Option<Breakpoint>,
    /// Stacked tiers were recomputed during this event.
    pub restacked: bool,
    /// Widget created by this event.
    pub added: Option<String>,
}

/// The persisted part of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub widgets: Vec<Widget>,
    pub layouts: ResponsiveLayouts,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            widgets: Vec::new(),
            layouts: ResponsiveLayouts::reference_only(),
        }
    }
}

/// What the renderer needs to draw the active tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierView {
    pub breakpoint: Breakpoint,
    pub column_count: u32,
    pub width: u32,
    pub items: Vec<LayoutItem>,
    pub widgets: Vec<Widget>,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    width: Option<u32>,
    breakpoint: Option<Breakpoint>,
    widgets: Vec<Widget>,
    layouts: ResponsiveLayouts,
    /// Middle tiers that were projected or edited this session.
    derived: HashSet<Breakpoint>,
    /// Reference layout the stacked tiers were last computed from.
    stacked_from: Option<Vec<LayoutItem>>,
}

impl DashboardState {
    /// Rebuild the dashboard from a persisted snapshot.
    ///
    /// The returned transition reports derived tiers filled while restoring,
    /// so the caller can persist them.
    pub fn restore(snapshot: DashboardSnapshot, width: Option<u32>) -> (Self, Transition) {
        let mut state = Self {
            width: None,
            breakpoint: None,
            widgets: snapshot.widgets,
            layouts: snapshot.layouts,
            derived: HashSet::new(),
            stacked_from: None,
        };
        state.set_width(width);
        let mut transition = Transition::default();
        state.reconcile(&mut transition);
        transition.breakpoint = state.breakpoint;
        (state, transition)
    }

    pub fn breakpoint(&self) -> Option<Breakpoint> {
        self.breakpoint
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn layouts(&self) -> &ResponsiveLayouts {
        &self.layouts
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            widgets: self.widgets.clone(),
            layouts: self.layouts.clone(),
        }
    }

    /// Apply one event and bring derived tiers up to date.
    pub fn apply(&mut self, event: DashboardEvent) -> Result<Transition, DashboardError> {
        let mut transition = Transition::default();

        match event {
            DashboardEvent::Measured { width, .. } => self.set_width(width),
            DashboardEvent::AddWidget { kind, title } => {
                let id = self.add_widget(kind, title);
                transition.added = Some(id);
                transition.changed = true;
            }
            DashboardEvent::RemoveWidget { id } => {
                self.remove_widget(&id)?;
                transition.changed = true;
            }
            DashboardEvent::LayoutChanged { items } => {
                transition.changed = self.update_active_layout(items)?;
            }
            DashboardEvent::Clear => {
                self.clear();
                transition.cleared = true;
            }
        }

        self.reconcile(&mut transition);
        transition.breakpoint = self.breakpoint;
        Ok(transition)
    }

    /// Active tier's grid with orphaned placements filtered out.
    ///
    /// `None` until the container width is known.
    pub fn view(&self) -> Option<TierView> {
        let breakpoint = self.breakpoint?;
        let known: HashSet<&str> = self.widgets.iter().map(|w| w.id.as_str()).collect();
        let items = self
            .layouts
            .get(breakpoint)
            .iter()
            .filter(|item| known.contains(item.i.as_str()))
            .cloned()
            .collect();

        Some(TierView {
            breakpoint,
            column_count: breakpoint.columns(),
            width: self.width.unwrap_or_default(),
            items,
            widgets: self.widgets.clone(),
        })
    }

    fn set_width(&mut self, width: Option<u32>) {
        self.width = width;
        self.breakpoint = width.map(Breakpoint::resolve);
    }

    fn add_widget(&mut self, kind: WidgetKind, title: Option<String>) -> String {
        let widget = Widget::new(kind, title);
        let id = widget.id.clone();
        let size = kind.default_size();
        self.widgets.push(widget);

        // Stacked tiers follow the reference tier on reconcile; middle tiers
        // without an entry are filled by projection on first visit.
        for bp in Breakpoint::ALL {
            let placed_here = bp.is_reference() || (bp.is_middle() && self.layouts.contains(bp));
            if !placed_here {
                continue;
            }
            let y = bottom_of(self.layouts.get(bp));
            let w = size.w.clamp(1, bp.columns());
            self.layouts.push(bp, LayoutItem::new(id.clone(), 0, y, w, size.h));
        }

        id
    }

    fn remove_widget(&mut self, id: &str) -> Result<(), DashboardError> {
        let before = self.widgets.len();
        self.widgets.retain(|w| w.id != id);
        let placed = self
            .layouts
            .tiers()
            .any(|(_, items)| items.iter().any(|item| item.i == id));

        if before == self.widgets.len() && !placed {
            return Err(DashboardError::UnknownWidget(id.to_string()));
        }

        self.layouts.remove_widget(id);
        Ok(())
    }

    /// Replace the active tier's layout. Returns whether anything changed.
    fn update_active_layout(&mut self, items: Vec<LayoutItem>) -> Result<bool, DashboardError> {
        let breakpoint = self.breakpoint.ok_or(DashboardError::NotMeasured)?;

        // Stacked tiers always mirror the reference tier.
        if breakpoint.is_stacked() {
            return Ok(false);
        }

        let items = sanitize(items, breakpoint.columns());
        if breakpoint.is_middle() {
            self.derived.insert(breakpoint);
        }
        if self.layouts.get(breakpoint) == items.as_slice() {
            return Ok(false);
        }

        self.layouts.set(breakpoint, items);
        Ok(true)
    }

    fn clear(&mut self) {
        self.widgets.clear();
        self.layouts = ResponsiveLayouts::reference_only();
        self.derived.clear();
        self.stacked_from = None;
    }

    fn reconcile(&mut self, transition: &mut Transition) {
        if let Some(bp) = self.project_active_tier() {
            transition.projected = Some(bp);
            transition.changed = true;
        }
        if self.restack_if_reference_changed() {
            transition.restacked = true;
        }
    }

    /// Fill an unvisited middle tier from the reference tier, once per session.
    fn project_active_tier(&mut self) -> Option<Breakpoint> {
        let bp = self.breakpoint.filter(|bp| bp.is_middle())?;
        if self.derived.contains(&bp) || self.layouts.is_authored(bp) {
            return None;
        }

        let reference = self.layouts.reference();
        if reference.is_empty() {
            return None;
        }

        let projected = project(reference, Breakpoint::REFERENCE.columns(), bp.columns());
        self.layouts.set(bp, projected);
        self.derived.insert(bp);
        Some(bp)
    }

    fn restack_if_reference_changed(&mut self) -> bool {
        let reference = self.layouts.reference();
        if self.stacked_from.as_deref() == Some(reference) {
            return false;
        }

        self.stacked_from = Some(reference.to_vec());
        self.layouts.restack();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(width: u32) -> DashboardState {
        DashboardState::restore(DashboardSnapshot::default(), Some(width)).0
    }

    fn add(state: &mut DashboardState, kind: WidgetKind) -> String {
        state
            .apply(DashboardEvent::AddWidget { kind, title: None })
            .unwrap()
            .added
            .unwrap()
    }

    fn resize(state: &mut DashboardState, width: u32) -> Transition {
        state
            .apply(DashboardEvent::Measured {
                width: Some(width),
                reason: MeasureReason::Resize,
            })
            .unwrap()
    }

    #[test]
    fn test_unmeasured_dashboard_has_no_view() {
        let state = DashboardState::restore(DashboardSnapshot::default(), None).0;
        assert!(state.view().is_none());
        assert_eq!(state.breakpoint(), None);
    }

    #[test]
    fn test_layout_change_before_measurement_is_rejected() {
        let mut state = DashboardState::restore(DashboardSnapshot::default(), None).0;
        let result = state.apply(DashboardEvent::LayoutChanged { items: vec![] });
        assert_eq!(result, Err(DashboardError::NotMeasured));
    }

    #[test]
    fn test_add_places_below_existing_items() {
        let mut state = state_at(1300);
        let first = add(&mut state, WidgetKind::LineChart);
        let second = add(&mut state, WidgetKind::KpiCard);

        let lg = state.layouts().get(Breakpoint::Lg);
        assert_eq!(lg[0], LayoutItem::new(first.clone(), 0, 0, 12, 9));
        assert_eq!(lg[1], LayoutItem::new(second.clone(), 0, 9, 6, 6));

        let xxs = state.layouts().get(Breakpoint::Xxs);
        assert_eq!(xxs[0], LayoutItem::new(first, 0, 0, 2, 9));
        assert_eq!(xxs[1], LayoutItem::new(second, 0, 9, 2, 6));
    }

    #[test]
    fn test_add_leaves_unvisited_middle_tiers_alone() {
        let mut state = state_at(1300);
        add(&mut state, WidgetKind::BarChart);
        assert!(!state.layouts().is_authored(Breakpoint::Md));
        assert!(!state.layouts().is_authored(Breakpoint::Sm));
    }

    #[test]
    fn test_add_extends_authored_middle_tiers_with_clamped_width() {
        let mut state = state_at(1300);
        let first = add(&mut state, WidgetKind::KpiCard);
        resize(&mut state, 800);
        let before = state.layouts().get(Breakpoint::Sm).to_vec();

        let second = add(&mut state, WidgetKind::BarChart);
        let sm = state.layouts().get(Breakpoint::Sm);
        assert_eq!(&sm[..1], before.as_slice());
        assert_eq!(sm[1], LayoutItem::new(second, 0, 6, 6, 6));
        assert_eq!(sm[0].i, first);
    }

    #[test]
    fn test_entering_middle_tier_projects_once() {
        let mut state = state_at(1300);
        let id = add(&mut state, WidgetKind::KpiCard);

        let transition = resize(&mut state, 800);
        assert_eq!(transition.projected, Some(Breakpoint::Sm));
        assert!(transition.changed);
        assert_eq!(
            state.layouts().get(Breakpoint::Sm),
            &[LayoutItem::new(id.clone(), 0, 0, 3, 6)]
        );

        let edited = vec![LayoutItem::new(id.clone(), 3, 2, 3, 6)];
        state
            .apply(DashboardEvent::LayoutChanged { items: edited.clone() })
            .unwrap();

        resize(&mut state, 1300);
        let transition = resize(&mut state, 800);
        assert_eq!(transition.projected, None);
        assert_eq!(state.layouts().get(Breakpoint::Sm), edited.as_slice());
    }

    #[test]
    fn test_widget_added_after_middle_tier_emptied_is_placed_there() {
        let mut state = state_at(1300);
        let first = add(&mut state, WidgetKind::KpiCard);
        resize(&mut state, 1000);
        resize(&mut state, 1300);
        state.apply(DashboardEvent::RemoveWidget { id: first }).unwrap();
        assert!(state.layouts().contains(Breakpoint::Md));
        assert!(!state.layouts().is_authored(Breakpoint::Md));

        let second = add(&mut state, WidgetKind::BarChart);
        resize(&mut state, 1000);

        let view = state.view().unwrap();
        assert_eq!(view.breakpoint, Breakpoint::Md);
        assert_eq!(view.widgets.len(), 1);
        assert_eq!(view.items, vec![LayoutItem::new(second, 0, 0, 10, 6)]);
    }

    #[test]
    fn test_restore_reports_projection_at_startup() {
        let mut snapshot = DashboardSnapshot::default();
        let widget = Widget::new(WidgetKind::KpiCard, None);
        snapshot
            .layouts
            .push(Breakpoint::Lg, LayoutItem::new(widget.id.clone(), 6, 0, 6, 6));
        snapshot.widgets.push(widget.clone());

        let (state, transition) = DashboardState::restore(snapshot.clone(), Some(800));
        assert!(transition.changed);
        assert_eq!(transition.projected, Some(Breakpoint::Sm));
        assert_eq!(
            state.layouts().get(Breakpoint::Sm),
            &[LayoutItem::new(widget.id, 3, 0, 3, 6)]
        );

        let (_, transition) = DashboardState::restore(snapshot, Some(1300));
        assert!(!transition.changed);
        assert_eq!(transition.breakpoint, Some(Breakpoint::Lg));
    }

    #[test]
    fn test_empty_reference_is_not_projected() {
        let mut state = state_at(1300);
        let transition = resize(&mut state, 1000);
        assert_eq!(transition.breakpoint, Some(Breakpoint::Md));
        assert_eq!(transition.projected, None);
        assert!(!transition.changed);
    }

    #[test]
    fn test_add_then_remove_restores_every_tier() {
        let mut state = state_at(1300);
        add(&mut state, WidgetKind::KpiCard);
        add(&mut state, WidgetKind::PieChart);
        resize(&mut state, 1000);
        resize(&mut state, 1300);
        let before = state.snapshot();

        let id = add(&mut state, WidgetKind::LineChart);
        assert_ne!(state.snapshot(), before);
        state.apply(DashboardEvent::RemoveWidget { id }).unwrap();

        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_remove_unknown_widget_fails() {
        let mut state = state_at(1300);
        let result = state.apply(DashboardEvent::RemoveWidget { id: "w_nope".into() });
        assert_eq!(result, Err(DashboardError::UnknownWidget("w_nope".into())));
    }

    #[test]
    fn test_editing_middle_tier_leaves_other_tiers_alone() {
        let mut state = state_at(1300);
        let a = add(&mut state, WidgetKind::KpiCard);
        let b = add(&mut state, WidgetKind::KpiCard);
        resize(&mut state, 800);
        resize(&mut state, 1000);
        let before = state.layouts().clone();

        let edited = vec![LayoutItem::new(a, 5, 0, 5, 6), LayoutItem::new(b, 0, 0, 5, 6)];
        let transition = state
            .apply(DashboardEvent::LayoutChanged { items: edited.clone() })
            .unwrap();
        assert!(transition.changed);
        assert!(!transition.restacked);

        for bp in Breakpoint::ALL {
            if bp == Breakpoint::Md {
                assert_eq!(state.layouts().get(bp), edited.as_slice());
            } else {
                assert_eq!(state.layouts().get(bp), before.get(bp), "{} changed", bp);
            }
        }
    }

    #[test]
    fn test_editing_reference_restacks_small_tiers_only() {
        let mut state = state_at(1300);
        let a = add(&mut state, WidgetKind::KpiCard);
        let b = add(&mut state, WidgetKind::KpiCard);
        resize(&mut state, 800);
        resize(&mut state, 1300);
        let sm_before = state.layouts().get(Breakpoint::Sm).to_vec();

        let edited = vec![LayoutItem::new(a.clone(), 0, 6, 6, 6), LayoutItem::new(b.clone(), 6, 0, 6, 6)];
        let transition = state
            .apply(DashboardEvent::LayoutChanged { items: edited })
            .unwrap();
        assert!(transition.restacked);

        assert_eq!(state.layouts().get(Breakpoint::Sm), sm_before.as_slice());
        let xs = state.layouts().get(Breakpoint::Xs);
        assert_eq!(xs[0], LayoutItem::new(b, 0, 0, 4, 6));
        assert_eq!(xs[1], LayoutItem::new(a, 0, 6, 4, 6));
    }

    #[test]
    fn test_edits_on_stacked_tiers_are_ignored() {
        let mut state = state_at(1300);
        let id = add(&mut state, WidgetKind::KpiCard);
        resize(&mut state, 500);
        let before = state.layouts().clone();

        let transition = state
            .apply(DashboardEvent::LayoutChanged {
                items: vec![LayoutItem::new(id, 0, 12, 4, 3)],
            })
            .unwrap();
        assert!(!transition.changed);
        assert_eq!(state.layouts(), &before);
    }

    #[test]
    fn test_unchanged_layout_is_not_a_change() {
        let mut state = state_at(1300);
        add(&mut state, WidgetKind::KpiCard);
        let items = state.layouts().reference().to_vec();
        let transition = state.apply(DashboardEvent::LayoutChanged { items }).unwrap();
        assert!(!transition.changed);
    }

    #[test]
    fn test_view_filters_orphaned_items() {
        let mut snapshot = DashboardSnapshot::default();
        snapshot.layouts.push(Breakpoint::Lg, LayoutItem::new("ghost", 0, 0, 6, 6));
        let state = DashboardState::restore(snapshot, Some(1300)).0;

        let view = state.view().unwrap();
        assert_eq!(view.breakpoint, Breakpoint::Lg);
        assert_eq!(view.column_count, 12);
        assert!(view.items.is_empty());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut state = state_at(1000);
        add(&mut state, WidgetKind::BarChart);
        let transition = state.apply(DashboardEvent::Clear).unwrap();
        assert!(transition.cleared);
        assert!(state.widgets().is_empty());
        assert_eq!(state.layouts().tiers().map(|(_, i)| i.len()).sum::<usize>(), 0);
        assert!(!state.layouts().is_authored(Breakpoint::Md));
    }
}
