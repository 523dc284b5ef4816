//! Minimal TOML parser for the transmitter configuration
//!
//! Handles only the subset transmitter.toml uses:
//! - `[section]` headers (`startup`, `bands`, `timing`)
//! - `key = value` pairs with integer or boolean values
//! - Comments (`# ...`), including after a value
//!
//! Missing keys keep their defaults. The result is validated before it is
//! returned.

use crate::channel::Channel;
use crate::registers::{InputAttenuation, TxPower};

use super::{ConfigError, TransmitterConfig};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown section header
    InvalidSection,
    /// Key not valid in its section
    UnknownKey,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Parsed values fail validation
    Config(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Config(e)
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParseError::InvalidSection => f.write_str("unknown section"),
            ParseError::UnknownKey => f.write_str("unknown key"),
            ParseError::InvalidValue => f.write_str("invalid value"),
            ParseError::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl core::error::Error for ParseError {}

/// Current section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Startup,
    Bands,
    Timing,
}

/// Parse transmitter.toml into a validated configuration
pub fn parse_config(input: &str) -> Result<TransmitterConfig, ParseError> {
    let mut config = TransmitterConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidValue)?;
        match section {
            Section::Startup => apply_startup(&mut config, key, value)?,
            Section::Bands => apply_bands(&mut config, key, value)?,
            Section::Timing => apply_timing(&mut config, key, value)?,
            Section::Root => return Err(ParseError::UnknownKey),
        }
    }

    config.validate()?;
    Ok(config)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_section_header(name: &str) -> Result<Section, ParseError> {
    match name.trim() {
        "startup" => Ok(Section::Startup),
        "bands" => Ok(Section::Bands),
        "timing" => Ok(Section::Timing),
        _ => Err(ParseError::InvalidSection),
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse an integer value
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_startup(config: &mut TransmitterConfig, key: &str, value: &str) -> Result<(), ParseError> {
    let startup = &mut config.startup;
    match key {
        "channel" => startup.channel = parse_int(value)?,
        "frequency" => {
            let channel =
                Channel::from_frequency(parse_int(value)?).ok_or(ParseError::InvalidValue)?;
            startup.channel = channel.index();
        }
        "tx_power" => {
            startup.tx_power =
                TxPower::try_from(parse_int::<u8>(value)?).map_err(|_| ParseError::InvalidValue)?
        }
        "attenuation" => {
            startup.attenuation = InputAttenuation::try_from(parse_int::<u8>(value)?)
                .map_err(|_| ParseError::InvalidValue)?
        }
        "online" => startup.online = parse_bool(value)?,
        "muted" => startup.muted = parse_bool(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

fn apply_bands(config: &mut TransmitterConfig, key: &str, value: &str) -> Result<(), ParseError> {
    let bands = &mut config.bands;
    match key {
        "band0_start" => bands.band0_start = parse_int(value)?,
        "band1_start" => bands.band1_start = parse_int(value)?,
        "band2_start" => bands.band2_start = parse_int(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

fn apply_timing(config: &mut TransmitterConfig, key: &str, value: &str) -> Result<(), ParseError> {
    let timing = &mut config.timing;
    match key {
        "cex_settle_ms" => timing.cex_settle_ms = parse_int(value)?,
        "search_settle_ms" => timing.search_settle_ms = parse_int(value)?,
        "lock_samples" => timing.lock_samples = parse_int(value)?,
        "lock_sample_interval_us" => timing.lock_sample_interval_us = parse_int(value)?,
        "bus_reset_settle_us" => timing.bus_reset_settle_us = parse_int(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
[startup]
frequency = 875
tx_power = 3
attenuation = 0
online = true
muted = false

[bands]
band0_start = 71
band1_start = 41
band2_start = 12

[timing]
cex_settle_ms = 175
search_settle_ms = 500
lock_samples = 50
lock_sample_interval_us = 2500
bus_reset_settle_us = 1000
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config, TransmitterConfig::default());
    }

    #[test]
    fn test_parse_channel_and_bands() {
        let config_str = "[startup]\nchannel = 102\nmuted = true\n[bands]\nband0_start = 80";

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.startup.channel, 102);
        assert!(config.startup.muted);
        assert_eq!(config.bands.band0_start, 80);
        assert_eq!(config.bands.band1_start, 41);
    }

    #[test]
    fn test_parse_frequency_and_comments() {
        let config_str = r#"
# comment line
[startup]
frequency = 895   # 89.5 MHz
tx_power = 1
online = false

[timing]
search_settle_ms = 250
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.startup.channel, 10);
        assert_eq!(config.startup.tx_power, TxPower::Low);
        assert!(!config.startup.online);
        assert_eq!(config.timing.search_settle_ms, 250);
        assert_eq!(config.timing.cex_settle_ms, 175);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_config("[radio]"), Err(ParseError::InvalidSection));
        assert_eq!(parse_config("channel = 3"), Err(ParseError::UnknownKey));
        assert_eq!(
            parse_config("[startup]\ntx_power = 0"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[startup]\nonline = yes"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[bands]\nband2_start = 90"),
            Err(ParseError::Config(ConfigError::InvalidBands))
        );
        assert_eq!(
            parse_config("[startup]\nchannel = 103"),
            Err(ParseError::Config(ConfigError::InvalidChannel))
        );
        assert_eq!(
            parse_config("[startup]\nfrequency = 1082"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[timing]\nlock_samples = 0"),
            Err(ParseError::Config(ConfigError::NoLockSamples))
        );
    }
}
