//! HTTP/2 settings registry
//!
//! The six parameters of RFC 7540 Section 6.5.2, driven by an explicit
//! static definition table consulted by id during encode and decode. Each
//! definition carries the default, the bounds check, and the accessor that
//! stores the value, so no per-parameter dispatch is scattered elsewhere.
//!
//! A connection holds two independent `Settings` instances: the values it
//! advertised (local) and the values the peer advertised (remote).

use crate::base64url;
use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

/// SETTINGS_HEADER_TABLE_SIZE (0x1)
pub const SETTINGS_HEADER_TABLE_SIZE: u16 = 0x1;
/// SETTINGS_ENABLE_PUSH (0x2)
pub const SETTINGS_ENABLE_PUSH: u16 = 0x2;
/// SETTINGS_MAX_CONCURRENT_STREAMS (0x3)
pub const SETTINGS_MAX_CONCURRENT_STREAMS: u16 = 0x3;
/// SETTINGS_INITIAL_WINDOW_SIZE (0x4)
pub const SETTINGS_INITIAL_WINDOW_SIZE: u16 = 0x4;
/// SETTINGS_MAX_FRAME_SIZE (0x5)
pub const SETTINGS_MAX_FRAME_SIZE: u16 = 0x5;
/// SETTINGS_MAX_HEADER_LIST_SIZE (0x6)
pub const SETTINGS_MAX_HEADER_LIST_SIZE: u16 = 0x6;

/// One entry of the settings registry.
pub struct SettingDef {
    pub id: u16,
    pub name: &'static str,
    /// Wire default; None means the parameter starts out unbounded
    pub default: Option<u32>,
    /// Bounds check applied before the value is stored
    check: fn(u32) -> Result<()>,
    /// Accessor storing a validated value into a `Settings`
    store: fn(&mut Settings, u32),
}

fn check_any(_value: u32) -> Result<()> {
    Ok(())
}

fn check_enable_push(value: u32) -> Result<()> {
    if value > 1 {
        return Err(Error::protocol(format!(
            "SETTINGS_ENABLE_PUSH must be 0 or 1, got {value}"
        )));
    }
    Ok(())
}

fn check_initial_window_size(value: u32) -> Result<()> {
    if value > 0x7FFF_FFFF {
        return Err(Error::flow_control(format!(
            "SETTINGS_INITIAL_WINDOW_SIZE {value} exceeds 2^31-1"
        )));
    }
    Ok(())
}

fn check_max_frame_size(value: u32) -> Result<()> {
    if !(16_384..=16_777_215).contains(&value) {
        return Err(Error::protocol(format!(
            "SETTINGS_MAX_FRAME_SIZE {value} outside [2^14, 2^24-1]"
        )));
    }
    Ok(())
}

/// The settings registry, in id order.
pub const SETTING_DEFS: [SettingDef; 6] = [
    SettingDef {
        id: SETTINGS_HEADER_TABLE_SIZE,
        name: "HEADER_TABLE_SIZE",
        default: Some(4096),
        check: check_any,
        store: |s, v| s.header_table_size = v,
    },
    SettingDef {
        id: SETTINGS_ENABLE_PUSH,
        name: "ENABLE_PUSH",
        default: Some(1),
        check: check_enable_push,
        store: |s, v| s.enable_push = v == 1,
    },
    SettingDef {
        id: SETTINGS_MAX_CONCURRENT_STREAMS,
        name: "MAX_CONCURRENT_STREAMS",
        default: None,
        check: check_any,
        store: |s, v| s.max_concurrent_streams = Some(v),
    },
    SettingDef {
        id: SETTINGS_INITIAL_WINDOW_SIZE,
        name: "INITIAL_WINDOW_SIZE",
        default: Some(65_535),
        check: check_initial_window_size,
        store: |s, v| s.initial_window_size = v,
    },
    SettingDef {
        id: SETTINGS_MAX_FRAME_SIZE,
        name: "MAX_FRAME_SIZE",
        default: Some(16_384),
        check: check_max_frame_size,
        store: |s, v| s.max_frame_size = v,
    },
    SettingDef {
        id: SETTINGS_MAX_HEADER_LIST_SIZE,
        name: "MAX_HEADER_LIST_SIZE",
        default: None,
        check: check_any,
        store: |s, v| s.max_header_list_size = Some(v),
    },
];

/// Look up a registry entry by id
pub fn setting_def(id: u16) -> Option<&'static SettingDef> {
    SETTING_DEFS.iter().find(|def| def.id == id)
}

/// One endpoint's view of the negotiated parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    /// None = unbounded
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    /// None = unbounded
    pub max_header_list_size: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            header_table_size: 4096,
            enable_push: true,
            max_concurrent_streams: None,
            initial_window_size: 65_535,
            max_frame_size: 16_384,
            max_header_list_size: None,
        }
    }
}

impl Settings {
    /// Apply one `(id, value)` pair through the registry.
    ///
    /// Unknown ids are skipped with a warning, per RFC 7540 Section 6.5.2.
    pub fn apply(&mut self, id: u16, value: u32) -> Result<()> {
        match setting_def(id) {
            Some(def) => {
                (def.check)(value)?;
                debug!(setting = def.name, value, "applying setting");
                (def.store)(self, value);
                Ok(())
            }
            None => {
                warn!(id, value, "ignoring unknown settings identifier");
                Ok(())
            }
        }
    }

    /// Unpack a SETTINGS payload of `(2-octet id, 4-octet value)` pairs.
    ///
    /// A length that is not a multiple of 6 is a FRAME_SIZE_ERROR. Duplicate
    /// ids apply last-write-wins in payload order.
    pub fn unpack(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() % 6 != 0 {
            return Err(Error::frame_size(format!(
                "SETTINGS payload length {} not a multiple of 6",
                payload.len()
            )));
        }
        for pair in payload.chunks_exact(6) {
            let id = u16::from_be_bytes([pair[0], pair[1]]);
            let value = u32::from_be_bytes([pair[2], pair[3], pair[4], pair[5]]);
            self.apply(id, value)?;
        }
        Ok(())
    }

    /// Pack every parameter that differs from its default into a SETTINGS
    /// payload.
    pub fn pack(&self) -> Bytes {
        let defaults = Settings::default();
        let mut buf = BytesMut::new();
        let mut put = |id: u16, value: u32| {
            buf.put_u16(id);
            buf.put_u32(value);
        };

        if self.header_table_size != defaults.header_table_size {
            put(SETTINGS_HEADER_TABLE_SIZE, self.header_table_size);
        }
        if self.enable_push != defaults.enable_push {
            put(SETTINGS_ENABLE_PUSH, self.enable_push as u32);
        }
        if let Some(max) = self.max_concurrent_streams {
            put(SETTINGS_MAX_CONCURRENT_STREAMS, max);
        }
        if self.initial_window_size != defaults.initial_window_size {
            put(SETTINGS_INITIAL_WINDOW_SIZE, self.initial_window_size);
        }
        if self.max_frame_size != defaults.max_frame_size {
            put(SETTINGS_MAX_FRAME_SIZE, self.max_frame_size);
        }
        if let Some(max) = self.max_header_list_size {
            put(SETTINGS_MAX_HEADER_LIST_SIZE, max);
        }

        buf.freeze()
    }

    /// Decode an `HTTP2-Settings` upgrade header (unpadded base64url of a
    /// SETTINGS payload) into `self`.
    ///
    /// Returns `false` on any failure instead of an error: a broken upgrade
    /// header means the server answers with 400 and stays on HTTP/1.1, it
    /// never tears the connection down.
    pub fn decode_from_upgrade(&mut self, header_value: &str) -> bool {
        let payload = match base64url::decode(header_value.trim()) {
            Some(bytes) => bytes,
            None => {
                warn!("HTTP2-Settings header is not valid base64url");
                return false;
            }
        };
        if payload.len() % 6 != 0 {
            warn!(
                len = payload.len(),
                "HTTP2-Settings payload length not a multiple of 6"
            );
            return false;
        }

        // Stage into a copy so a mid-payload failure leaves self untouched.
        let mut staged = self.clone();
        if let Err(err) = staged.unpack(&payload) {
            warn!(%err, "HTTP2-Settings payload rejected");
            return false;
        }
        *self = staged;
        true
    }
}

/// Builder for local settings, mirroring the registry's bounds checks at
/// construction time.
pub struct SettingsBuilder {
    settings: Settings,
    error: Option<Error>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings::default(),
            error: None,
        }
    }

    fn set(mut self, id: u16, value: u32) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.settings.apply(id, value) {
                self.error = Some(err);
            }
        }
        self
    }

    pub fn header_table_size(self, size: u32) -> Self {
        self.set(SETTINGS_HEADER_TABLE_SIZE, size)
    }

    pub fn enable_push(self, enable: bool) -> Self {
        self.set(SETTINGS_ENABLE_PUSH, enable as u32)
    }

    pub fn max_concurrent_streams(self, max: u32) -> Self {
        self.set(SETTINGS_MAX_CONCURRENT_STREAMS, max)
    }

    pub fn initial_window_size(self, size: u32) -> Self {
        self.set(SETTINGS_INITIAL_WINDOW_SIZE, size)
    }

    pub fn max_frame_size(self, size: u32) -> Self {
        self.set(SETTINGS_MAX_FRAME_SIZE, size)
    }

    pub fn max_header_list_size(self, size: u32) -> Self {
        self.set(SETTINGS_MAX_HEADER_LIST_SIZE, size)
    }

    pub fn build(self) -> Result<Settings> {
        match self.error {
            Some(err) => Err(Error::InvalidSettings(err.to_string())),
            None => Ok(self.settings),
        }
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_defaults_match_registry() {
        let settings = Settings::default();
        assert_eq!(settings.header_table_size, 4096);
        assert!(settings.enable_push);
        assert_eq!(settings.max_concurrent_streams, None);
        assert_eq!(settings.initial_window_size, 65_535);
        assert_eq!(settings.max_frame_size, 16_384);
        assert_eq!(settings.max_header_list_size, None);

        for def in &SETTING_DEFS {
            assert_eq!(setting_def(def.id).map(|d| d.name), Some(def.name));
        }
        assert!(setting_def(0x99).is_none());
    }

    #[test]
    fn test_unpack_rejects_ragged_payload() {
        let mut settings = Settings::default();
        let err = settings.unpack(&[0, 1, 0, 0, 0]).unwrap_err();
        assert_eq!(err.connection_code(), Some(ErrorCode::FrameSizeError));
    }

    #[test]
    fn test_unpack_last_write_wins() {
        let mut settings = Settings::default();
        let mut payload = Vec::new();
        payload.extend_from_slice(&[0, 3, 0, 0, 0, 10]); // max streams = 10
        payload.extend_from_slice(&[0, 3, 0, 0, 0, 20]); // then 20
        settings.unpack(&payload).unwrap();
        assert_eq!(settings.max_concurrent_streams, Some(20));
    }

    #[test]
    fn test_unknown_id_skipped() {
        let mut settings = Settings::default();
        settings.unpack(&[0xAB, 0xCD, 0, 0, 0, 1]).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_bounds_checks() {
        let mut settings = Settings::default();

        let err = settings.apply(SETTINGS_ENABLE_PUSH, 2).unwrap_err();
        assert_eq!(err.connection_code(), Some(ErrorCode::ProtocolError));

        let err = settings
            .apply(SETTINGS_INITIAL_WINDOW_SIZE, 0x8000_0000)
            .unwrap_err();
        assert_eq!(err.connection_code(), Some(ErrorCode::FlowControlError));

        let err = settings.apply(SETTINGS_MAX_FRAME_SIZE, 1024).unwrap_err();
        assert_eq!(err.connection_code(), Some(ErrorCode::ProtocolError));
        let err = settings
            .apply(SETTINGS_MAX_FRAME_SIZE, 16_777_216)
            .unwrap_err();
        assert_eq!(err.connection_code(), Some(ErrorCode::ProtocolError));
    }

    #[test]
    fn test_pack_round_trip() {
        let settings = SettingsBuilder::new()
            .header_table_size(8192)
            .enable_push(false)
            .max_concurrent_streams(100)
            .build()
            .unwrap();

        let payload = settings.pack();
        assert_eq!(payload.len(), 18); // three non-default pairs

        let mut decoded = Settings::default();
        decoded.unpack(&payload).unwrap();
        assert_eq!(decoded, settings);
    }

    #[test]
    fn test_decode_from_upgrade_vector() {
        let mut settings = Settings::default();
        assert!(settings.decode_from_upgrade("AAMAAABkAARAAAAAAAIAAAAA"));
        assert!(!settings.enable_push);
        assert_eq!(settings.max_concurrent_streams, Some(100));
        assert_eq!(settings.initial_window_size, 1_073_741_824);
    }

    #[test]
    fn test_decode_from_upgrade_failures() {
        let mut settings = Settings::default();
        // Not base64url
        assert!(!settings.decode_from_upgrade("!!!!"));
        // Valid base64url but not a multiple of 6 octets (4 chars = 3 bytes)
        assert!(!settings.decode_from_upgrade("AAAA"));
        // Bad value: ENABLE_PUSH = 2; settings must stay untouched
        let payload = [0u8, 2, 0, 0, 0, 2];
        let header = base64url::encode(&payload);
        assert!(!settings.decode_from_upgrade(&header));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_builder_surfaces_bad_values() {
        assert!(SettingsBuilder::new().max_frame_size(1024).build().is_err());
        assert!(SettingsBuilder::new()
            .initial_window_size(0x7FFF_FFFF)
            .build()
            .is_ok());
    }
}
