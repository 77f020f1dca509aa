//! Pointer-driven highlight of individual countries and the info readout
//! that follows it.
//!
//! Features are addressed by their position in the enriched collection.
//! Names are not unique once joined, so they are never used as keys here.
//!
//! The controller does not enforce a single highlighted feature; it relies on
//! the event source pairing every enter with a leave.

use crate::context::MapContext;
use crate::stats::AggregateStat;
use crate::style::FeatureStyle;
use crate::types::FeatureProperties;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightState {
    Normal,
    Highlighted,
}

/// The drawn feature layer, as seen by the controller.
pub trait FeatureLayer {
    fn set_style(&mut self, index: usize, style: FeatureStyle);

    fn bring_to_front(&mut self, index: usize);

    /// Renderers without z-order control return `false`.
    fn supports_reordering(&self) -> bool {
        true
    }
}

/// The info box. `None` means "no country selected", which shows the
/// worldwide aggregate.
pub trait InfoPanel {
    fn update(&mut self, properties: Option<&FeatureProperties>);
}

pub struct InteractionController<L, P> {
    states: Vec<HighlightState>,
    layer: L,
    info: P,
}

impl<L: FeatureLayer, P: InfoPanel> InteractionController<L, P> {
    /// Every feature starts out `Normal` and the info panel shows the
    /// aggregate.
    pub fn new(ctx: &MapContext, layer: L, mut info: P) -> Self {
        info.update(None);
        Self {
            states: vec![HighlightState::Normal; ctx.features.len()],
            layer,
            info,
        }
    }

    /// Returns `None`, touching nothing, when `index` is not a feature.
    pub fn on_feature_enter(&mut self, ctx: &MapContext, index: usize) -> Option<HighlightState> {
        let feature = ctx.features.features.get(index)?;
        self.layer
            .set_style(index, ctx.styles.highlight_style(&feature.properties));
        if ctx.styles.bring_to_front && self.layer.supports_reordering() {
            self.layer.bring_to_front(index);
        }
        self.info.update(Some(&feature.properties));
        self.set_state(index, HighlightState::Highlighted)
    }

    pub fn on_feature_leave(&mut self, ctx: &MapContext, index: usize) -> Option<HighlightState> {
        let feature = ctx.features.features.get(index)?;
        self.layer.set_style(index, ctx.base_style(feature));
        self.info.update(None);
        self.set_state(index, HighlightState::Normal)
    }

    pub fn state(&self, index: usize) -> Option<HighlightState> {
        self.states.get(index).copied()
    }

    pub fn highlighted(&self) -> impl Iterator<Item = usize> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == HighlightState::Highlighted)
            .map(|(index, _)| index)
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn info(&self) -> &P {
        &self.info
    }

    fn set_state(&mut self, index: usize, state: HighlightState) -> Option<HighlightState> {
        let slot = self.states.get_mut(index)?;
        *slot = state;
        Some(state)
    }
}

/// In-memory feature layer: current style per feature and draw order,
/// last drawn on top.
#[derive(Debug, Clone, Default)]
pub struct StyledLayer {
    styles: Vec<FeatureStyle>,
    order: Vec<usize>,
    reorderable: bool,
}

impl StyledLayer {
    /// Every feature painted with its base style, in collection order.
    pub fn new(ctx: &MapContext) -> Self {
        let features = &ctx.features.features;
        Self {
            styles: features.iter().map(|f| ctx.base_style(f)).collect(),
            order: (0..features.len()).collect(),
            reorderable: true,
        }
    }

    pub fn without_reordering(mut self) -> Self {
        self.reorderable = false;
        self
    }

    pub fn style(&self, index: usize) -> Option<&FeatureStyle> {
        self.styles.get(index)
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

impl FeatureLayer for StyledLayer {
    fn set_style(&mut self, index: usize, style: FeatureStyle) {
        if let Some(slot) = self.styles.get_mut(index) {
            *slot = style;
        }
    }

    fn bring_to_front(&mut self, index: usize) {
        if let Some(pos) = self.order.iter().position(|&i| i == index) {
            self.order.remove(pos);
            self.order.push(index);
        }
    }

    fn supports_reordering(&self) -> bool {
        self.reorderable
    }
}

/// What the info box currently displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoView {
    Country { name: String, percentage: f64 },
    Worldwide { average: AggregateStat },
}

#[derive(Debug, Clone)]
pub struct InfoReadout {
    aggregate: AggregateStat,
    current: Option<FeatureProperties>,
}

impl InfoReadout {
    pub fn new(aggregate: AggregateStat) -> Self {
        Self {
            aggregate,
            current: None,
        }
    }

    pub fn view(&self) -> InfoView {
        match &self.current {
            Some(props) => InfoView::Country {
                name: props.name.clone(),
                percentage: props.percentage,
            },
            None => InfoView::Worldwide {
                average: self.aggregate,
            },
        }
    }
}

impl InfoPanel for InfoReadout {
    fn update(&mut self, properties: Option<&FeatureProperties>) {
        self.current = properties.cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{JoinSummary, PipelineOutput};
    use crate::style::StyleSheet;
    use crate::types::{EnrichedFeatureCollection, GeoFeature};

    const BRAZIL: usize = 0;
    const NORWAY: usize = 1;

    fn feature(name: &str, percentage: f64) -> GeoFeature {
        GeoFeature {
            id: name.to_string(),
            bbox: None,
            geometry: None,
            properties: FeatureProperties {
                percentage,
                name: name.to_string(),
            },
        }
    }

    fn context_with(features: Vec<GeoFeature>) -> MapContext {
        MapContext::new(
            PipelineOutput {
                countries: Vec::new(),
                features: EnrichedFeatureCollection { features },
                aggregate: AggregateStat::Mean(74.0),
                joins: JoinSummary::default(),
            },
            StyleSheet::default(),
        )
    }

    fn context() -> MapContext {
        context_with(vec![feature("Brazil", 52.0), feature("Norway", 96.0)])
    }

    fn controller(ctx: &MapContext) -> InteractionController<StyledLayer, InfoReadout> {
        InteractionController::new(
            ctx,
            StyledLayer::new(ctx),
            InfoReadout::new(ctx.current_aggregate()),
        )
    }

    #[test]
    fn starts_normal_with_aggregate_shown() {
        let ctx = context();
        let controller = controller(&ctx);
        assert_eq!(controller.state(BRAZIL), Some(HighlightState::Normal));
        assert_eq!(controller.highlighted().count(), 0);
        assert_eq!(
            controller.info().view(),
            InfoView::Worldwide {
                average: AggregateStat::Mean(74.0)
            }
        );
    }

    #[test]
    fn enter_highlights_raises_and_shows_country() {
        let ctx = context();
        let mut controller = controller(&ctx);

        let state = controller.on_feature_enter(&ctx, BRAZIL);

        assert_eq!(state, Some(HighlightState::Highlighted));
        assert_eq!(controller.highlighted().collect::<Vec<_>>(), [BRAZIL]);
        assert_eq!(controller.layer().style(BRAZIL).unwrap().weight, 3.0);
        assert_eq!(controller.layer().order(), [NORWAY, BRAZIL]);
        assert_eq!(
            controller.info().view(),
            InfoView::Country {
                name: "Brazil".to_string(),
                percentage: 52.0
            }
        );
    }

    #[test]
    fn leave_restores_base_style_and_aggregate() {
        let ctx = context();
        let mut controller = controller(&ctx);
        let before = controller.info().view();
        let base = controller.layer().style(NORWAY).cloned();

        controller.on_feature_enter(&ctx, NORWAY);
        let state = controller.on_feature_leave(&ctx, NORWAY);

        assert_eq!(state, Some(HighlightState::Normal));
        assert_eq!(controller.highlighted().count(), 0);
        assert_eq!(controller.layer().style(NORWAY).cloned(), base);
        assert_eq!(controller.info().view(), before);
    }

    #[test]
    fn reordering_is_skipped_when_unsupported() {
        let ctx = context();
        let mut controller = InteractionController::new(
            &ctx,
            StyledLayer::new(&ctx).without_reordering(),
            InfoReadout::new(ctx.current_aggregate()),
        );

        controller.on_feature_enter(&ctx, BRAZIL);

        assert_eq!(controller.layer().order(), [BRAZIL, NORWAY]);
        assert_eq!(controller.state(BRAZIL), Some(HighlightState::Highlighted));
    }

    #[test]
    fn unpaired_enters_are_not_policed() {
        let ctx = context();
        let mut controller = controller(&ctx);

        controller.on_feature_enter(&ctx, BRAZIL);
        controller.on_feature_enter(&ctx, NORWAY);

        assert_eq!(controller.highlighted().count(), 2);
    }

    #[test]
    fn features_sharing_a_name_are_tracked_apart() {
        let ctx = context_with(vec![feature("Congo", 60.0), feature("Congo", 90.0)]);
        let mut controller = controller(&ctx);
        let base = controller.layer().style(1).cloned();

        controller.on_feature_enter(&ctx, 0);

        assert_eq!(controller.state(0), Some(HighlightState::Highlighted));
        assert_eq!(controller.state(1), Some(HighlightState::Normal));
        assert_eq!(controller.layer().style(1).cloned(), base);
        assert_eq!(controller.layer().order(), [1, 0]);
        assert_eq!(
            controller.info().view(),
            InfoView::Country {
                name: "Congo".to_string(),
                percentage: 60.0
            }
        );
    }

    #[test]
    fn unknown_index_changes_nothing() {
        let ctx = context();
        let mut controller = controller(&ctx);

        assert_eq!(controller.on_feature_enter(&ctx, 7), None);
        assert_eq!(controller.on_feature_leave(&ctx, 7), None);
        assert_eq!(controller.highlighted().count(), 0);
        assert_eq!(controller.layer().order(), [BRAZIL, NORWAY]);
        assert_eq!(
            controller.info().view(),
            InfoView::Worldwide {
                average: AggregateStat::Mean(74.0)
            }
        );
    }
}
