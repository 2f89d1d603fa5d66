//! Main channels of the basin and their stream-order sub-ranges.
//!
//! The catalog is fixed: ten channels, each with a contiguous run of
//! `lower-upper` order ranges starting at `1-2`. A `ChannelMap` always holds
//! every channel with exactly its catalog labels.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

pub const CHANNEL_COUNT: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    UnknownChannel(String),
    UnknownSubRange { channel: ChannelId, label: String },
    ChannelUnchecked(ChannelId),
    InvalidJson(String),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::UnknownChannel(id) => write!(f, "unknown channel id: {id}"),
            SelectionError::UnknownSubRange { channel, label } => {
                write!(f, "{channel} has no sub-range {label}")
            }
            SelectionError::ChannelUnchecked(channel) => {
                write!(f, "{channel} must be checked before selecting sub-ranges")
            }
            SelectionError::InvalidJson(reason) => write!(f, "invalid selection state: {reason}"),
        }
    }
}

impl std::error::Error for SelectionError {}

/// One of the ten main channels, `MainChannel1..=MainChannel10`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number <= CHANNEL_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = ChannelId> {
        (1..=CHANNEL_COUNT).map(ChannelId)
    }

    /// The catalog labels for this channel, ascending.
    pub fn sub_ranges(self) -> &'static [SubRange] {
        match self.0 {
            1 => &FULL_RANGES[..5],
            2 | 3 | 6 => &FULL_RANGES[..3],
            _ => &FULL_RANGES[..4],
        }
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MainChannel{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("MainChannel")
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(ChannelId::new)
            .ok_or_else(|| SelectionError::UnknownChannel(s.to_string()))
    }
}

impl Serialize for ChannelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A stream-order range such as `3-4`; its lower bound is the order it selects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubRange {
    pub lower: u8,
    pub upper: u8,
}

const FULL_RANGES: [SubRange; 5] = [
    SubRange::new(1, 2),
    SubRange::new(2, 3),
    SubRange::new(3, 4),
    SubRange::new(4, 5),
    SubRange::new(5, 6),
];

impl SubRange {
    pub const fn new(lower: u8, upper: u8) -> Self {
        Self { lower, upper }
    }

    pub const fn order(self) -> u8 {
        self.lower
    }
}

impl fmt::Display for SubRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower, self.upper)
    }
}

impl FromStr for SubRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lower, upper) = s
            .split_once('-')
            .ok_or_else(|| format!("malformed range label: {s}"))?;
        let lower = lower
            .trim()
            .parse()
            .map_err(|_| format!("malformed range label: {s}"))?;
        let upper = upper
            .trim()
            .parse()
            .map_err(|_| format!("malformed range label: {s}"))?;
        Ok(SubRange::new(lower, upper))
    }
}

impl Serialize for SubRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelState {
    is_checked: bool,
    sub_ranges: BTreeMap<SubRange, bool>,
}

impl ChannelState {
    fn unchecked(channel: ChannelId) -> Self {
        Self {
            is_checked: false,
            sub_ranges: channel.sub_ranges().iter().map(|r| (*r, false)).collect(),
        }
    }

    pub fn is_checked(&self) -> bool {
        self.is_checked
    }

    pub fn sub_range(&self, range: SubRange) -> Option<bool> {
        self.sub_ranges.get(&range).copied()
    }

    pub fn sub_ranges(&self) -> impl Iterator<Item = (SubRange, bool)> + '_ {
        self.sub_ranges.iter().map(|(r, on)| (*r, *on))
    }

    /// Ranges that are switched on, ascending by order.
    pub fn active_sub_ranges(&self) -> impl Iterator<Item = SubRange> + '_ {
        self.sub_ranges
            .iter()
            .filter(|(_, on)| **on)
            .map(|(r, _)| *r)
    }

    fn reset(&mut self, checked: bool) {
        self.is_checked = checked;
        for on in self.sub_ranges.values_mut() {
            *on = false;
        }
    }
}

/// Checkbox state for every main channel.
///
/// Invariants:
/// - all ten channels are present, each with exactly its catalog labels
/// - an unchecked channel has every sub-range flag cleared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    channels: Vec<ChannelState>,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            channels: ChannelId::all().map(ChannelState::unchecked).collect(),
        }
    }
}

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, channel: ChannelId) -> &ChannelState {
        &self.channels[channel.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &ChannelState)> {
        ChannelId::all().zip(self.channels.iter())
    }

    pub fn checked(&self) -> impl Iterator<Item = (ChannelId, &ChannelState)> {
        self.iter().filter(|(_, state)| state.is_checked)
    }

    /// Checking or unchecking a channel always starts its sub-ranges from
    /// all-off.
    pub fn set_channel(&mut self, channel: ChannelId, checked: bool) {
        self.channels[channel.index()].reset(checked);
    }

    pub fn toggle_channel(&mut self, channel: ChannelId) -> bool {
        let checked = !self.get(channel).is_checked;
        self.set_channel(channel, checked);
        checked
    }

    pub fn set_sub_range(
        &mut self,
        channel: ChannelId,
        range: SubRange,
        on: bool,
    ) -> Result<(), SelectionError> {
        let state = &mut self.channels[channel.index()];
        if !state.is_checked {
            return Err(SelectionError::ChannelUnchecked(channel));
        }
        let flag = state
            .sub_ranges
            .get_mut(&range)
            .ok_or_else(|| SelectionError::UnknownSubRange {
                channel,
                label: range.to_string(),
            })?;
        *flag = on;
        Ok(())
    }

    /// Flips the sub-range named `label` and returns its new value.
    pub fn toggle_sub_range(
        &mut self,
        channel: ChannelId,
        label: &str,
    ) -> Result<bool, SelectionError> {
        let range: SubRange = label.parse().map_err(|_| SelectionError::UnknownSubRange {
            channel,
            label: label.to_string(),
        })?;
        let on = !self.get(channel).sub_range(range).unwrap_or(false);
        self.set_sub_range(channel, range, on)?;
        Ok(on)
    }

    pub fn all_checked(&self) -> bool {
        self.channels.iter().all(|c| c.is_checked)
    }

    /// Checks every channel unless all are already checked, in which case
    /// unchecks every channel. Returns the state applied.
    pub fn select_all(&mut self) -> bool {
        let checked = !self.all_checked();
        for state in &mut self.channels {
            state.reset(checked);
        }
        checked
    }
}

impl Serialize for ChannelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len()))?;
        for (id, state) in self.iter() {
            map.serialize_entry(&id, state)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChannelState {
    #[serde(default)]
    is_checked: bool,
    #[serde(default)]
    sub_ranges: BTreeMap<String, bool>,
}

impl TryFrom<BTreeMap<String, RawChannelState>> for ChannelMap {
    type Error = SelectionError;

    fn try_from(raw: BTreeMap<String, RawChannelState>) -> Result<Self, Self::Error> {
        let mut out = ChannelMap::default();
        for (key, raw_state) in raw {
            let channel: ChannelId = key.parse()?;
            let state = &mut out.channels[channel.index()];
            state.is_checked = raw_state.is_checked;
            for (label, on) in raw_state.sub_ranges {
                let flag = label
                    .parse::<SubRange>()
                    .ok()
                    .and_then(|r| state.sub_ranges.get_mut(&r))
                    .ok_or_else(|| SelectionError::UnknownSubRange {
                        channel,
                        label: label.clone(),
                    })?;
                *flag = on && raw_state.is_checked;
            }
        }
        Ok(out)
    }
}

impl<'de> Deserialize<'de> for ChannelMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawChannelState>::deserialize(deserializer)?;
        ChannelMap::try_from(raw).map_err(de::Error::custom)
    }
}
