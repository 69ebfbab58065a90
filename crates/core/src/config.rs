//! String-keyed configuration consumed at transport setup.
//!
//! The library does not load configuration files. It reads values through
//! [`ConfigSource`], which callers implement over whatever store they use;
//! plain `HashMap`/`BTreeMap` implementations are provided.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{ParseErrorKind, Result, RtspError};

/// Key holding the allocatable RTP port range, e.g. `"30000-35000"`.
pub const PORT_RANGE_KEY: &str = "rtp_proxy.port_range";

/// Range used when [`PORT_RANGE_KEY`] is not set.
pub const DEFAULT_PORT_RANGE: PortRange = PortRange {
    min: 30000,
    max: 35000,
};

/// Smallest number of raw ports a pool may span.
pub const MIN_PORT_SPAN: u16 = 36;

/// A source of configuration values looked up by key.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// Inclusive range of raw ports available for RTP/RTCP pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl PortRange {
    /// Read the range from `source`, falling back to [`DEFAULT_PORT_RANGE`]
    /// when the key is absent. The result is validated.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let range = match source.get(PORT_RANGE_KEY) {
            Some(value) => value.parse()?,
            None => DEFAULT_PORT_RANGE,
        };
        range.validate()?;
        Ok(range)
    }

    /// Fails with [`RtspError::PortRangeTooNarrow`] below [`MIN_PORT_SPAN`] ports.
    pub fn validate(&self) -> Result<()> {
        if u32::from(self.max) + 1 < u32::from(self.min) + u32::from(MIN_PORT_SPAN) {
            return Err(RtspError::PortRangeTooNarrow {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Half-open range of pair indices; index `i` maps to ports `2i` and `2i + 1`.
    pub fn pair_indices(&self) -> std::ops::Range<u16> {
        let start = ((u32::from(self.min) + 1) / 2) as u16;
        start..self.max / 2
    }
}

impl FromStr for PortRange {
    type Err = RtspError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RtspError::Parse {
            kind: ParseErrorKind::InvalidPortRange(s.to_string()),
        };
        let (min, max) = s.trim().split_once('-').ok_or_else(invalid)?;
        let min: u16 = min.trim().parse().map_err(|_| invalid())?;
        let max: u16 = max.trim().parse().map_err(|_| invalid())?;
        if min > max {
            return Err(invalid());
        }
        Ok(PortRange { min, max })
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}
