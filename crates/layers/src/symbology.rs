use serde::Serialize;

/// Linear RGBA in `0.0..=1.0`.
pub type Rgba = [f32; 4];

pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Rgba {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a]
}

pub const TRANSPARENT: Rgba = rgba(0, 0, 255, 0.0);
pub const WHITE: Rgba = rgba(255, 255, 255, 1.0);
pub const BLACK: Rgba = rgba(0, 0, 0, 1.0);
pub const RED: Rgba = rgba(255, 0, 0, 1.0);
pub const BLUE: Rgba = rgba(0, 0, 255, 1.0);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f32,
    #[serde(skip_serializing_if = "is_solid")]
    pub dash: &'static [f32],
}

impl Stroke {
    pub const fn solid(color: Rgba, width: f32) -> Self {
        Self {
            color,
            width,
            dash: &[],
        }
    }

    pub const fn dashed(color: Rgba, width: f32, dash: &'static [f32]) -> Self {
        Self { color, width, dash }
    }
}

fn is_solid(dash: &&'static [f32]) -> bool {
    dash.is_empty()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointStyle {
    pub radius: f32,
    pub fill: Rgba,
    pub stroke: Stroke,
}

/// Text repeated along line features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineLabel {
    pub text: &'static str,
    pub color: Rgba,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerStyle {
    pub stroke: Option<Stroke>,
    pub fill: Option<Rgba>,
    pub point: Option<PointStyle>,
    pub label: Option<LineLabel>,
}

/// The closed set of looks a vector layer can have.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleVariant {
    /// Present for hit-testing only; draws nothing visible.
    Structural,
    TalukaBoundary,
    DistrictBoundary,
    Road,
    Railway,
    Canal,
    SubBasin,
    /// Blue stream lines whose width follows the stream order.
    StreamOrder,
}

const BOUNDARY_BLUE: Rgba = rgba(0x1f, 0x78, 0xb4, 1.0);
const ROAD_GREY: Rgba = rgba(0x87, 0x87, 0x87, 1.0);
const RAIL_RED: Rgba = rgba(0xe3, 0x1a, 0x1c, 1.0);
const CANAL_BLUE: Rgba = rgba(0x27, 0x41, 0xea, 1.0);

const DASH_LABEL: &str = "— — — — —";

pub fn stream_width(order: u8) -> f32 {
    f32::from(order) - 0.5
}

/// Builds the style for `variant`. `param` is the stream order for
/// `StreamOrder` and ignored otherwise; a missing order draws width 0.5.
pub fn style_for(variant: StyleVariant, param: Option<u8>) -> LayerStyle {
    match variant {
        StyleVariant::Structural => LayerStyle {
            stroke: Some(Stroke::solid(TRANSPARENT, 1.0)),
            fill: Some(TRANSPARENT),
            ..Default::default()
        },
        StyleVariant::TalukaBoundary => LayerStyle {
            stroke: Some(Stroke::dashed(BOUNDARY_BLUE, 2.0, &[6.0, 2.0])),
            ..Default::default()
        },
        StyleVariant::DistrictBoundary => LayerStyle {
            stroke: Some(Stroke::dashed(BLACK, 3.0, &[18.0, 6.0])),
            ..Default::default()
        },
        StyleVariant::Road => LayerStyle {
            stroke: Some(Stroke::solid(ROAD_GREY, 2.0)),
            label: Some(LineLabel {
                text: DASH_LABEL,
                color: WHITE,
                font: None,
            }),
            ..Default::default()
        },
        StyleVariant::Railway => LayerStyle {
            stroke: Some(Stroke::dashed(RAIL_RED, 2.5, &[10.0, 5.0])),
            label: Some(LineLabel {
                text: "| — | — | — | —|",
                color: RAIL_RED,
                font: Some("bold 14px sans-serif"),
            }),
            ..Default::default()
        },
        StyleVariant::Canal => LayerStyle {
            stroke: Some(Stroke::dashed(CANAL_BLUE, 2.5, &[10.0, 5.0])),
            fill: Some(rgba(39, 65, 234, 0.3)),
            label: Some(LineLabel {
                text: DASH_LABEL,
                color: WHITE,
                font: None,
            }),
            ..Default::default()
        },
        StyleVariant::SubBasin => LayerStyle {
            stroke: Some(Stroke::solid(RED, 1.0)),
            fill: Some(rgba(0, 0, 255, 0.1)),
            point: Some(PointStyle {
                radius: 2.0,
                fill: RED,
                stroke: Stroke::solid(BLACK, 1.0),
            }),
            label: None,
        },
        StyleVariant::StreamOrder => LayerStyle {
            stroke: Some(Stroke::solid(BLUE, stream_width(param.unwrap_or(1)))),
            fill: Some(rgba(0, 255, 0, 0.3)),
            point: Some(PointStyle {
                radius: 5.0,
                fill: BLUE,
                stroke: Stroke::solid(WHITE, 2.0),
            }),
            label: None,
        },
    }
}
