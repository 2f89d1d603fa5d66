//! Selection state → ordered layer specifications.
//!
//! `resolve` is a pure function: the same selection and catalog always give
//! the same specs in the same order. The order is the draw order, bottom
//! first: structural base layers, boundaries, infrastructure, then the
//! per-channel overlays.

use std::collections::HashSet;

use selection::{ChannelId, SelectionState, SubRange};
use serde::Serialize;

use crate::catalog::ResourceCatalog;
use crate::layer::LayerId;
use crate::query::PropertyFilter;
use crate::symbology::{LayerStyle, StyleVariant, style_for};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    BaseBasins,
    BaseStreams,
    TalukaBoundary,
    DistrictBoundary,
    Road,
    Railway,
    Canal,
    SubBasin,
    StreamOrder,
}

impl LayerKind {
    pub fn style_variant(self) -> StyleVariant {
        match self {
            LayerKind::BaseBasins | LayerKind::BaseStreams => StyleVariant::Structural,
            LayerKind::TalukaBoundary => StyleVariant::TalukaBoundary,
            LayerKind::DistrictBoundary => StyleVariant::DistrictBoundary,
            LayerKind::Road => StyleVariant::Road,
            LayerKind::Railway => StyleVariant::Railway,
            LayerKind::Canal => StyleVariant::Canal,
            LayerKind::SubBasin => StyleVariant::SubBasin,
            LayerKind::StreamOrder => StyleVariant::StreamOrder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSpec {
    pub id: LayerId,
    pub kind: LayerKind,
    pub resource: String,
    pub style: StyleVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PropertyFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_style_param: Option<u8>,
}

impl LayerSpec {
    fn new(id: impl Into<String>, kind: LayerKind, resource: String) -> Self {
        Self {
            id: LayerId::new(id),
            kind,
            resource,
            style: kind.style_variant(),
            filter: None,
            dynamic_style_param: None,
        }
    }

    fn filtered(mut self, filter: PropertyFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn resolved_style(&self) -> LayerStyle {
        style_for(self.style, self.dynamic_style_param)
    }

    fn identity(&self) -> (&str, Option<&PropertyFilter>, StyleVariant, Option<u8>) {
        (
            self.resource.as_str(),
            self.filter.as_ref(),
            self.style,
            self.dynamic_style_param,
        )
    }
}

pub fn resolve(selection: &SelectionState, catalog: &ResourceCatalog) -> Vec<LayerSpec> {
    let mut specs = vec![
        LayerSpec::new("base-basins", LayerKind::BaseBasins, catalog.basins.clone()),
        LayerSpec::new("base-streams", LayerKind::BaseStreams, catalog.streams.clone()),
    ];

    if selection.taluka_boundary {
        let mut spec = LayerSpec::new(
            "taluka-boundary",
            LayerKind::TalukaBoundary,
            catalog.taluka_boundary.clone(),
        );
        if !selection.talukas.is_empty() {
            spec = spec.filtered(PropertyFilter::one_of("NAME_3", selection.talukas.iter().cloned()));
        }
        specs.push(spec);
    }
    if selection.district_boundary {
        let mut spec = LayerSpec::new(
            "district-boundary",
            LayerKind::DistrictBoundary,
            catalog.district_boundary.clone(),
        );
        if !selection.districts.is_empty() {
            spec = spec.filtered(PropertyFilter::one_of(
                "NAME_2",
                selection.districts.iter().cloned(),
            ));
        }
        specs.push(spec);
    }
    if selection.road {
        specs.push(
            LayerSpec::new("roads", LayerKind::Road, catalog.roads.clone())
                .filtered(PropertyFilter::contains_any("Road", ["SH", "NH"])),
        );
    }
    if selection.railway {
        specs.push(LayerSpec::new("railway", LayerKind::Railway, catalog.railway.clone()));
    }
    if selection.canals {
        specs.push(LayerSpec::new("canals", LayerKind::Canal, catalog.canals.clone()));
    }

    for (channel, _) in selection.channels.checked() {
        specs.push(LayerSpec::new(
            format!("sub-basin-{channel}"),
            LayerKind::SubBasin,
            catalog.sub_basin(channel),
        ));
    }
    for (channel, state) in selection.channels.checked() {
        for range in state.active_sub_ranges() {
            specs.push(stream_order_spec(channel, range, catalog));
        }
    }

    dedup(specs)
}

fn stream_order_spec(channel: ChannelId, range: SubRange, catalog: &ResourceCatalog) -> LayerSpec {
    let order = range.order();
    let mut spec = LayerSpec::new(
        format!("stream-order-{order}-{channel}"),
        LayerKind::StreamOrder,
        catalog.stream_order(order),
    )
    .filtered(PropertyFilter::eq("layer", channel.to_string()));
    spec.dynamic_style_param = Some(order);
    spec
}

/// Drops specs that repeat an earlier (resource, filter, style, param),
/// keeping first occurrences in order.
pub fn dedup(specs: Vec<LayerSpec>) -> Vec<LayerSpec> {
    let mut seen = HashSet::new();
    let mut keep = Vec::with_capacity(specs.len());
    for spec in &specs {
        keep.push(seen.insert(spec.identity()));
    }
    drop(seen);
    specs
        .into_iter()
        .zip(keep)
        .filter_map(|(spec, keep)| keep.then_some(spec))
        .collect()
}
