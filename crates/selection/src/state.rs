use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::channels::{ChannelMap, SelectionError};

/// Which base map the dashboard shows under the vector overlays.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Landuse,
    #[default]
    Hydrology,
    Terrain,
}

/// Snapshot of everything the user has switched on.
///
/// Owned by the view layer; the engine reads it and never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionState {
    pub road: bool,
    pub railway: bool,
    pub canals: bool,
    pub taluka_boundary: bool,
    pub district_boundary: bool,
    pub theme: Theme,
    pub channels: ChannelMap,
    /// District names (`NAME_2`) to keep on the district boundary layer. Empty keeps all.
    pub districts: BTreeSet<String>,
    /// Taluka names (`NAME_3`) to keep on the taluka boundary layer. Empty keeps all.
    pub talukas: BTreeSet<String>,
}

impl SelectionState {
    pub fn from_json_str(payload: &str) -> Result<Self, SelectionError> {
        serde_json::from_str(payload).map_err(|e| SelectionError::InvalidJson(e.to_string()))
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        // Plain data with string keys; conversion cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::{SelectionState, Theme};
    use crate::channels::{ChannelId, SubRange};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn partial_json_is_normalized() {
        let payload = json!({
            "road": true,
            "theme": "terrain",
            "channels": {
                "MainChannel3": { "isChecked": true, "subRanges": { "2-3": true } },
                "MainChannel5": { "isChecked": false, "subRanges": { "1-2": true } }
            },
            "districts": ["Panchmahal"]
        })
        .to_string();

        let state = SelectionState::from_json_str(&payload).expect("parse");
        assert!(state.road);
        assert!(!state.railway);
        assert_eq!(state.theme, Theme::Terrain);
        assert_eq!(state.districts.len(), 1);

        let c3 = state.channels.get(ChannelId::new(3).expect("id"));
        assert!(c3.is_checked());
        assert_eq!(c3.sub_ranges().count(), 3);
        assert_eq!(c3.active_sub_ranges().collect::<Vec<_>>(), vec![SubRange::new(2, 3)]);

        // Flags on an unchecked channel are dropped.
        let c5 = state.channels.get(ChannelId::new(5).expect("id"));
        assert_eq!(c5.active_sub_ranges().count(), 0);

        let c9 = state.channels.get(ChannelId::new(9).expect("id"));
        assert!(!c9.is_checked());
        assert_eq!(c9.sub_ranges().count(), 4);
    }

    #[test]
    fn unknown_channels_and_labels_are_rejected() {
        let bad_label = json!({
            "channels": { "MainChannel2": { "isChecked": true, "subRanges": { "5-6": true } } }
        })
        .to_string();
        let err = SelectionState::from_json_str(&bad_label).unwrap_err();
        assert!(err.to_string().contains("5-6"), "{err}");

        let bad_channel = json!({ "channels": { "MainChannel0": { "isChecked": true } } }).to_string();
        assert!(SelectionState::from_json_str(&bad_channel).is_err());
    }

    #[test]
    fn serialized_form_round_trips() {
        let mut state = SelectionState {
            canals: true,
            district_boundary: true,
            ..Default::default()
        };
        let c1 = ChannelId::new(1).expect("id");
        state.channels.set_channel(c1, true);
        state.channels.toggle_sub_range(c1, "5-6").expect("toggle");

        let value = state.to_json_value();
        assert_eq!(value["districtBoundary"], json!(true));
        assert_eq!(value["theme"], json!("hydrology"));
        assert_eq!(value["channels"]["MainChannel1"]["subRanges"]["5-6"], json!(true));
        assert_eq!(value["channels"]["MainChannel10"]["isChecked"], json!(false));

        let back = SelectionState::from_json_str(&value.to_string()).expect("parse");
        assert_eq!(back, state);
    }
}
