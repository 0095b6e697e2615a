//! Scope parameter blocks.
//!
//! A [`ScopeSetup`] is written with Save Parameter and tells the firmware
//! which RAM locations to sample and when to trigger. Load Parameter reads
//! back the sampler status as [`ScopeData`].

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ServiceError};
use crate::id::ServiceId;

/// Maximum number of channels the firmware samples.
pub const MAX_CHANNELS: usize = 8;

/// Parameter id of the scope block for Save/Load Parameter.
pub const SCOPE_PARAMETER_ID: u16 = 1;

/// Bit 7 of the trigger data type marks the current scope layout.
const TRIGGER_TYPE_VERSION: u8 = 0x80;
const TRIGGER_TYPE_SIGNED: u8 = 0x20;
const TRIGGER_TYPE_FLOAT: u8 = 0x10;
const NO_TRIGGER_LEVEL_SIZE: usize = 2;

/// Sampling mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// Sample once the trigger condition is met.
    Triggered,
    /// Sample continuously without a trigger.
    #[default]
    Auto,
}

impl ScopeMode {
    pub fn as_u8(self) -> u8 {
        match self {
            ScopeMode::Triggered => 1,
            ScopeMode::Auto => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEdge {
    Falling,
    #[default]
    Rising,
}

impl TriggerEdge {
    pub fn as_u8(self) -> u8 {
        match self {
            TriggerEdge::Falling => 0,
            TriggerEdge::Rising => 1,
        }
    }
}

/// One sampled RAM location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeChannel {
    pub name: String,
    pub address: u32,
    /// Sample size in bytes: 1, 2, 4 or 8.
    pub data_size: u8,
    #[serde(default)]
    pub source_type: u8,
    #[serde(default = "default_true")]
    pub signed: bool,
    #[serde(default)]
    pub float: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl ScopeChannel {
    /// An enabled, signed integer channel.
    pub fn new(name: impl Into<String>, address: u32, data_size: u8) -> Self {
        Self {
            name: name.into(),
            address,
            data_size,
            source_type: 0,
            signed: true,
            float: false,
            enabled: true,
        }
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.data_size, 1 | 2 | 4 | 8) {
            return Err(ServiceError::invalid(format!(
                "channel {:?}: data size must be 1, 2, 4 or 8 bytes, got {}",
                self.name, self.data_size
            )));
        }
        Ok(())
    }

    fn trigger_data_type(&self) -> u8 {
        let mut ty = TRIGGER_TYPE_VERSION | self.data_size;
        if self.signed {
            ty |= TRIGGER_TYPE_SIGNED;
        }
        if self.float {
            ty |= TRIGGER_TYPE_FLOAT;
        }
        ty
    }
}

/// Trigger condition on one of the setup's channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTrigger {
    /// Name of the channel the trigger watches.
    pub channel: String,
    #[serde(default)]
    pub level: i64,
    /// Delay in samples; scaled by the dataset size on the wire.
    #[serde(default)]
    pub delay: i32,
    #[serde(default)]
    pub edge: TriggerEdge,
    #[serde(default)]
    pub mode: u8,
}

impl ScopeTrigger {
    pub fn new(channel: impl Into<String>, level: i64) -> Self {
        Self {
            channel: channel.into(),
            level,
            delay: 0,
            edge: TriggerEdge::Rising,
            mode: 0,
        }
    }
}

/// Scope configuration written with Save Parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSetup {
    #[serde(default)]
    pub mode: ScopeMode,
    #[serde(default = "default_sample_time_factor")]
    pub sample_time_factor: u16,
    #[serde(default)]
    pub channels: Vec<ScopeChannel>,
    #[serde(default)]
    pub trigger: Option<ScopeTrigger>,
}

fn default_sample_time_factor() -> u16 {
    1
}

impl Default for ScopeSetup {
    fn default() -> Self {
        Self {
            mode: ScopeMode::Auto,
            sample_time_factor: default_sample_time_factor(),
            channels: Vec::new(),
            trigger: None,
        }
    }
}

impl ScopeSetup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel. A channel with the same name is kept as is.
    ///
    /// Returns the number of channels in the setup.
    pub fn add_channel(&mut self, channel: ScopeChannel) -> Result<usize> {
        channel.validate()?;
        if self.channel(&channel.name).is_none() {
            if self.channels.len() >= MAX_CHANNELS {
                return Err(ServiceError::invalid(format!(
                    "scope supports at most {MAX_CHANNELS} channels"
                )));
            }
            self.channels.push(channel);
        }
        Ok(self.channels.len())
    }

    /// Remove a channel by name. Removing the trigger channel also removes
    /// the trigger.
    pub fn remove_channel(&mut self, name: &str) -> Option<ScopeChannel> {
        let idx = self.channels.iter().position(|c| c.name == name)?;
        if self.trigger.as_ref().is_some_and(|t| t.channel == name) {
            self.reset_trigger();
        }
        Some(self.channels.remove(idx))
    }

    pub fn channel(&self, name: &str) -> Option<&ScopeChannel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Arm a trigger and switch to triggered mode.
    pub fn set_trigger(&mut self, trigger: ScopeTrigger) -> Result<()> {
        if self.channel(&trigger.channel).is_none() {
            return Err(ServiceError::invalid(format!(
                "trigger channel {:?} is not part of the setup",
                trigger.channel
            )));
        }
        self.trigger = Some(trigger);
        self.mode = ScopeMode::Triggered;
        Ok(())
    }

    /// Drop the trigger and go back to auto mode.
    pub fn reset_trigger(&mut self) {
        self.trigger = None;
        self.mode = ScopeMode::Auto;
    }

    fn enabled_channels(&self) -> impl Iterator<Item = &ScopeChannel> {
        self.channels.iter().filter(|c| c.enabled)
    }

    /// Bytes sampled per dataset over all enabled channels.
    pub fn dataset_size(&self) -> usize {
        self.enabled_channels().map(|c| c.data_size as usize).sum()
    }

    /// Append the parameter block. An empty setup appends nothing.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        if self.channels.is_empty() {
            return Ok(());
        }
        if self.channels.len() > MAX_CHANNELS {
            return Err(ServiceError::invalid(format!(
                "scope supports at most {MAX_CHANNELS} channels, got {}",
                self.channels.len()
            )));
        }
        for channel in &self.channels {
            channel.validate()?;
        }

        let trigger = match &self.trigger {
            Some(trigger) => {
                let channel = self.channel(&trigger.channel).ok_or_else(|| {
                    ServiceError::invalid(format!(
                        "trigger channel {:?} is not part of the setup",
                        trigger.channel
                    ))
                })?;
                Some((trigger, channel))
            }
            None => None,
        };

        let enabled = self.enabled_channels().count();
        let mut block = BytesMut::with_capacity(64);
        block.put_u8(self.mode.as_u8());
        // MAX_CHANNELS fits a byte.
        block.put_u8(enabled as u8);
        block.put_u16_le(self.sample_time_factor);
        for channel in self.enabled_channels() {
            block.put_u8(channel.source_type);
            block.put_u32_le(channel.address);
            block.put_u8(channel.data_size);
        }

        match trigger {
            Some((trigger, channel)) => {
                block.put_u8(channel.trigger_data_type());
                block.put_u8(channel.source_type);
                block.put_u32_le(channel.address);
                put_level(&mut block, trigger.level, channel)?;
                block.put_i32_le(self.scaled_delay(trigger.delay)?);
                block.put_u8(trigger.edge.as_u8());
                block.put_u8(trigger.mode);
            }
            None => {
                block.put_u8(TRIGGER_TYPE_VERSION | NO_TRIGGER_LEVEL_SIZE as u8);
                block.put_u8(0);
                block.put_u32_le(0);
                block.put_bytes(0, NO_TRIGGER_LEVEL_SIZE);
                block.put_i32_le(0);
                block.put_u8(TriggerEdge::Rising.as_u8());
                block.put_u8(0);
            }
        }
        debug!(
            channels = enabled,
            triggered = self.trigger.is_some(),
            len = block.len(),
            "encoded scope setup"
        );
        dst.extend_from_slice(&block);
        Ok(())
    }

    fn scaled_delay(&self, delay: i32) -> Result<i32> {
        let scaled = i64::from(delay) * self.dataset_size() as i64;
        i32::try_from(scaled).map_err(|_| {
            ServiceError::invalid(format!(
                "trigger delay {delay} exceeds the range of the sample counter"
            ))
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn put_level(dst: &mut BytesMut, level: i64, channel: &ScopeChannel) -> Result<()> {
    let size = channel.data_size as usize;
    let fits = if size >= 8 {
        channel.signed || level >= 0
    } else {
        let bits = (size * 8) as u32;
        if channel.signed {
            let min = -(1i64 << (bits - 1));
            let max = (1i64 << (bits - 1)) - 1;
            (min..=max).contains(&level)
        } else {
            (0..(1i64 << bits)).contains(&level)
        }
    };
    if !fits {
        return Err(ServiceError::invalid(format!(
            "trigger level {level} does not fit channel {:?} ({size} bytes, {})",
            channel.name,
            if channel.signed { "signed" } else { "unsigned" }
        )));
    }
    dst.put_slice(&level.to_le_bytes()[..size]);
    Ok(())
}

/// Sampler status read with Load Parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeData {
    /// Zero when idle; sampling is complete and data can be read.
    pub scope_state: u8,
    pub channel_count: u8,
    pub sample_time_factor: u16,
    /// Index of the next free dataset slot.
    pub data_array_pointer: u32,
    pub data_array_address: u32,
    pub trigger_delay: i32,
    pub trigger_event_position: u32,
    pub data_array_used_length: u32,
    pub data_array_size: u32,
    pub scope_version: u8,
}

impl ScopeData {
    pub const ENCODED_LEN: usize = 29;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() != Self::ENCODED_LEN {
            return Err(ServiceError::PayloadLength {
                service: ServiceId::LoadParameter,
                expected: Self::ENCODED_LEN,
                actual: payload.len(),
            });
        }
        let mut buf = payload;
        Ok(Self {
            scope_state: buf.get_u8(),
            channel_count: buf.get_u8(),
            sample_time_factor: buf.get_u16_le(),
            data_array_pointer: buf.get_u32_le(),
            data_array_address: buf.get_u32_le(),
            trigger_delay: buf.get_i32_le(),
            trigger_event_position: buf.get_u32_le(),
            data_array_used_length: buf.get_u32_le(),
            data_array_size: buf.get_u32_le(),
            scope_version: buf.get_u8(),
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(Self::ENCODED_LEN);
        dst.put_u8(self.scope_state);
        dst.put_u8(self.channel_count);
        dst.put_u16_le(self.sample_time_factor);
        dst.put_u32_le(self.data_array_pointer);
        dst.put_u32_le(self.data_array_address);
        dst.put_i32_le(self.trigger_delay);
        dst.put_u32_le(self.trigger_event_position);
        dst.put_u32_le(self.data_array_used_length);
        dst.put_u32_le(self.data_array_size);
        dst.put_u8(self.scope_version);
    }

    /// True once the sampler is idle and the data array is complete.
    pub fn is_data_ready(&self) -> bool {
        self.scope_state == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(setup: &ScopeSetup) -> Vec<u8> {
        let mut buf = BytesMut::new();
        setup.encode(&mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn empty_setup_encodes_to_nothing() {
        assert!(encoded(&ScopeSetup::new()).is_empty());
    }

    #[test]
    fn auto_mode_block_layout() {
        let mut setup = ScopeSetup::new();
        setup.sample_time_factor = 0x0102;
        setup
            .add_channel(ScopeChannel::new("speed", 0xDEAD_CAFE, 4))
            .unwrap();

        assert_eq!(
            encoded(&setup),
            vec![
                0x02, 0x01, 0x02, 0x01, // mode, channels, sample time factor
                0x00, 0xFE, 0xCA, 0xAD, 0xDE, 0x04, // channel
                0x82, 0x00, 0x00, 0x00, 0x00, 0x00, // no trigger channel
                0x00, 0x00, // level
                0x00, 0x00, 0x00, 0x00, // delay
                0x01, 0x00, // edge, mode
            ]
        );
    }

    #[test]
    fn triggered_block_layout() {
        let mut setup = ScopeSetup::new();
        setup
            .add_channel(ScopeChannel::new("current", 0x1000, 2))
            .unwrap();
        setup
            .add_channel(ScopeChannel::new("voltage", 0x2000, 4))
            .unwrap();
        let mut trigger = ScopeTrigger::new("current", -2);
        trigger.delay = 10;
        trigger.edge = TriggerEdge::Falling;
        setup.set_trigger(trigger).unwrap();
        assert_eq!(setup.mode, ScopeMode::Triggered);

        let block = encoded(&setup);
        assert_eq!(&block[..4], &[0x01, 0x02, 0x01, 0x00]);
        assert_eq!(block.len(), 4 + 2 * 6 + 6 + 2 + 4 + 2);
        let trigger = &block[16..];
        // signed, integer, 2 bytes
        assert_eq!(trigger[0], 0xA2);
        assert_eq!(&trigger[1..6], &[0x00, 0x00, 0x10, 0x00, 0x00]);
        assert_eq!(&trigger[6..8], &[0xFE, 0xFF]);
        // 10 samples of a 6-byte dataset
        assert_eq!(&trigger[8..12], &60i32.to_le_bytes());
        assert_eq!(&trigger[12..], &[0x00, 0x00]);
    }

    #[test]
    fn disabled_channels_are_not_sent() {
        let mut setup = ScopeSetup::new();
        setup.add_channel(ScopeChannel::new("a", 0x10, 2)).unwrap();
        let mut off = ScopeChannel::new("b", 0x20, 4);
        off.enabled = false;
        setup.add_channel(off).unwrap();

        let block = encoded(&setup);
        assert_eq!(block[1], 1);
        assert_eq!(block.len(), 4 + 6 + 14);
        assert_eq!(setup.dataset_size(), 2);
    }

    #[test]
    fn float_trigger_channel_sets_type_bit() {
        let mut channel = ScopeChannel::new("temp", 0x40, 4);
        channel.float = true;
        assert_eq!(channel.trigger_data_type(), 0x80 | 0x20 | 0x10 | 4);
        channel.signed = false;
        assert_eq!(channel.trigger_data_type(), 0x80 | 0x10 | 4);
    }

    #[test]
    fn ninth_channel_is_rejected() {
        let mut setup = ScopeSetup::new();
        for i in 0..MAX_CHANNELS {
            let count = setup
                .add_channel(ScopeChannel::new(format!("ch{i}"), i as u32, 2))
                .unwrap();
            assert_eq!(count, i + 1);
        }
        assert!(setup
            .add_channel(ScopeChannel::new("ch8", 0x99, 2))
            .is_err());
        // Re-adding an existing name is not a new channel.
        assert_eq!(
            setup.add_channel(ScopeChannel::new("ch0", 0, 2)).unwrap(),
            MAX_CHANNELS
        );
    }

    #[test]
    fn removing_trigger_channel_resets_trigger() {
        let mut setup = ScopeSetup::new();
        setup.add_channel(ScopeChannel::new("a", 0x10, 2)).unwrap();
        setup.set_trigger(ScopeTrigger::new("a", 5)).unwrap();

        assert!(setup.remove_channel("a").is_some());
        assert!(setup.trigger.is_none());
        assert_eq!(setup.mode, ScopeMode::Auto);
        assert!(setup.remove_channel("a").is_none());
    }

    #[test]
    fn trigger_needs_known_channel() {
        let mut setup = ScopeSetup::new();
        setup.add_channel(ScopeChannel::new("a", 0x10, 2)).unwrap();
        assert!(setup.set_trigger(ScopeTrigger::new("b", 0)).is_err());

        setup.trigger = Some(ScopeTrigger::new("b", 0));
        let mut buf = BytesMut::new();
        assert!(setup.encode(&mut buf).is_err());
    }

    #[test]
    fn trigger_level_must_fit_channel() {
        let mut setup = ScopeSetup::new();
        setup.add_channel(ScopeChannel::new("a", 0x10, 1)).unwrap();
        setup.set_trigger(ScopeTrigger::new("a", 200)).unwrap();
        let mut buf = BytesMut::new();
        let err = setup.encode(&mut buf).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));

        let mut unsigned = ScopeChannel::new("u", 0x20, 1);
        unsigned.signed = false;
        setup.add_channel(unsigned).unwrap();
        setup.set_trigger(ScopeTrigger::new("u", 200)).unwrap();
        buf.clear();
        setup.encode(&mut buf).unwrap();
    }

    #[test]
    fn invalid_data_size_is_rejected() {
        let mut setup = ScopeSetup::new();
        assert!(setup.add_channel(ScopeChannel::new("a", 0x10, 3)).is_err());
    }

    #[test]
    fn json_roundtrip_with_defaults() {
        let json = r#"{
            "channels": [
                {"name": "speed", "address": 4096, "data_size": 2}
            ],
            "trigger": {"channel": "speed", "level": 100}
        }"#;
        let setup = ScopeSetup::from_json(json).unwrap();
        assert_eq!(setup.sample_time_factor, 1);
        assert!(setup.channels[0].signed);
        assert!(setup.channels[0].enabled);
        assert_eq!(setup.trigger.as_ref().unwrap().edge, TriggerEdge::Rising);

        let back = ScopeSetup::from_json(&setup.to_json().unwrap()).unwrap();
        assert_eq!(back, setup);
    }

    #[test]
    fn bad_json_is_reported() {
        let err = ScopeSetup::from_json("{\"channels\": 3}").unwrap_err();
        assert!(matches!(err, ServiceError::Json(_)));
    }

    #[test]
    fn scope_data_layout() {
        let data = ScopeData {
            scope_state: 0,
            channel_count: 2,
            sample_time_factor: 1,
            data_array_pointer: 12,
            data_array_address: 0x2000_0000,
            trigger_delay: -6,
            trigger_event_position: 3,
            data_array_used_length: 600,
            data_array_size: 4096,
            scope_version: 1,
        };
        let mut buf = BytesMut::new();
        data.encode(&mut buf);
        assert_eq!(buf.len(), ScopeData::ENCODED_LEN);
        assert_eq!(&buf[12..16], &(-6i32).to_le_bytes());

        let decoded = ScopeData::decode(&buf).unwrap();
        assert_eq!(decoded, data);
        assert!(decoded.is_data_ready());
    }

    #[test]
    fn busy_scope_is_not_ready() {
        let mut raw = [0u8; ScopeData::ENCODED_LEN];
        raw[0] = 1;
        assert!(!ScopeData::decode(&raw).unwrap().is_data_ready());
    }

    #[test]
    fn short_scope_data_is_rejected() {
        let err = ScopeData::decode(&[0u8; 28]).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::PayloadLength {
                service: ServiceId::LoadParameter,
                expected: 29,
                actual: 28
            }
        ));
    }
}
