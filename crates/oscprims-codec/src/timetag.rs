//! NTP-format time tags carried in bundle headers.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, BytesMut};

use crate::error::Result;
use crate::primitive::read_u32;

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch.
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Encoded size of a time tag.
pub const TIMETAG_SIZE: usize = 8;

const FRACTION_SCALE: f64 = 4_294_967_296.0; // 2^32

/// When a bundle should take effect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TimeTag {
    /// The reserved NTP value `{seconds: 0, fraction: 1}`.
    #[default]
    Immediate,
    /// Seconds since the Unix epoch.
    At(f64),
}

impl TimeTag {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Build from seconds since the Unix epoch. Non-finite input means
    /// "immediately".
    pub fn from_unix_seconds(seconds: f64) -> Self {
        if seconds.is_finite() {
            Self::At(seconds)
        } else {
            Self::Immediate
        }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self::At(since.as_secs_f64()),
            Err(before) => Self::At(-before.duration().as_secs_f64()),
        }
    }

    /// Seconds since the Unix epoch, or `None` for [`TimeTag::Immediate`].
    pub fn as_unix_seconds(&self) -> Option<f64> {
        match self {
            Self::Immediate => None,
            Self::At(seconds) => Some(*seconds),
        }
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self.to_ntp(), (0, 1))
    }

    /// The raw `(seconds since 1900, fraction of 2^32)` pair.
    ///
    /// Times outside the 32-bit NTP era saturate at its bounds.
    pub fn to_ntp(&self) -> (u32, u32) {
        match self {
            Self::At(seconds) if seconds.is_finite() => {
                let whole = seconds.floor();
                let ntp_seconds = whole + NTP_UNIX_OFFSET as f64;
                let fraction = ((seconds - whole) * FRACTION_SCALE) as u32;
                (ntp_seconds as u32, fraction)
            }
            _ => (0, 1),
        }
    }

    /// Inverse of [`TimeTag::to_ntp`]; `(0, 1)` maps back to `Immediate`.
    pub fn from_ntp(seconds: u32, fraction: u32) -> Self {
        if (seconds, fraction) == (0, 1) {
            return Self::Immediate;
        }
        let unix = i64::from(seconds) - NTP_UNIX_OFFSET as i64;
        Self::At(unix as f64 + f64::from(fraction) / FRACTION_SCALE)
    }
}

impl From<SystemTime> for TimeTag {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

pub fn write_timetag(tag: &TimeTag, dst: &mut BytesMut) {
    let (seconds, fraction) = tag.to_ntp();
    dst.reserve(TIMETAG_SIZE);
    dst.put_u32(seconds);
    dst.put_u32(fraction);
}

pub fn read_timetag(buf: &[u8], offset: usize) -> Result<(TimeTag, usize)> {
    let (seconds, next) = read_u32(buf, offset)?;
    let (fraction, next) = read_u32(buf, next)?;
    Ok((TimeTag::from_ntp(seconds, fraction), next))
}
