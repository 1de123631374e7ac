//! Status codes carried in reply records and returned to callers.

use std::fmt;

/// A 32-bit MAPI status code.
///
/// Zero is success. Local failure kinds use the four codes the client
/// itself raises; any other code comes from the server and is passed
/// through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapiStatus(pub u32);

impl MapiStatus {
    /// `MAPI_E_SUCCESS`.
    pub const SUCCESS: MapiStatus = MapiStatus(0x0000_0000);
    /// `MAPI_E_CALL_FAILED`.
    pub const CALL_FAILED: MapiStatus = MapiStatus(0x8000_4005);
    /// `MAPI_E_NOT_ENOUGH_RESOURCES`.
    pub const NOT_ENOUGH_RESOURCES: MapiStatus = MapiStatus(0x8007_000E);
    /// `MAPI_E_INVALID_PARAMETER`.
    pub const INVALID_PARAMETER: MapiStatus = MapiStatus(0x8007_0057);
    /// `MAPI_E_NOT_INITIALIZED`.
    pub const NOT_INITIALIZED: MapiStatus = MapiStatus(0x8004_0605);
    /// `MAPI_E_NO_SUPPORT`.
    pub const NO_SUPPORT: MapiStatus = MapiStatus(0x8004_0102);
    /// `MAPI_E_NOT_FOUND`.
    pub const NOT_FOUND: MapiStatus = MapiStatus(0x8004_010F);
    /// `MAPI_E_SESSION_LIMIT`.
    pub const SESSION_LIMIT: MapiStatus = MapiStatus(0x8004_0112);
    /// `MAPI_E_NO_ACCESS`.
    pub const NO_ACCESS: MapiStatus = MapiStatus(0x8007_0005);
    /// `MAPI_E_INVALID_OBJECT`.
    pub const INVALID_OBJECT: MapiStatus = MapiStatus(0x8004_0108);
    /// `MAPI_E_TOO_COMPLEX`.
    pub const TOO_COMPLEX: MapiStatus = MapiStatus(0x8004_0117);
    /// `MAPI_E_NOT_ENOUGH_MEMORY`.
    pub const NOT_ENOUGH_MEMORY: MapiStatus = MapiStatus(0x8007_000E);
    /// `MAPI_E_LOGON_FAILED`.
    pub const LOGON_FAILED: MapiStatus = MapiStatus(0x8004_0111);

    /// Returns the raw code.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns true for the success code.
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Symbolic name for known codes.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            MapiStatus::SUCCESS => "MAPI_E_SUCCESS",
            MapiStatus::CALL_FAILED => "MAPI_E_CALL_FAILED",
            MapiStatus::NOT_ENOUGH_RESOURCES => "MAPI_E_NOT_ENOUGH_RESOURCES",
            MapiStatus::INVALID_PARAMETER => "MAPI_E_INVALID_PARAMETER",
            MapiStatus::NOT_INITIALIZED => "MAPI_E_NOT_INITIALIZED",
            MapiStatus::NO_SUPPORT => "MAPI_E_NO_SUPPORT",
            MapiStatus::NOT_FOUND => "MAPI_E_NOT_FOUND",
            MapiStatus::SESSION_LIMIT => "MAPI_E_SESSION_LIMIT",
            MapiStatus::NO_ACCESS => "MAPI_E_NO_ACCESS",
            MapiStatus::INVALID_OBJECT => "MAPI_E_INVALID_OBJECT",
            MapiStatus::TOO_COMPLEX => "MAPI_E_TOO_COMPLEX",
            MapiStatus::LOGON_FAILED => "MAPI_E_LOGON_FAILED",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for MapiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:08X})", self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

impl From<u32> for MapiStatus {
    fn from(code: u32) -> Self {
        MapiStatus(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_zero() {
        assert!(MapiStatus::SUCCESS.is_success());
        assert!(!MapiStatus::CALL_FAILED.is_success());
    }

    #[test]
    fn display_known_and_unknown() {
        assert_eq!(
            MapiStatus::NOT_FOUND.to_string(),
            "MAPI_E_NOT_FOUND (0x8004010F)"
        );
        assert_eq!(MapiStatus(0x1234).to_string(), "0x00001234");
    }

    #[test]
    fn aliases_share_a_name() {
        assert_eq!(
            MapiStatus::NOT_ENOUGH_MEMORY.name(),
            Some("MAPI_E_NOT_ENOUGH_RESOURCES")
        );
    }
}
