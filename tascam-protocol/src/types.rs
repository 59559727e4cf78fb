//! Value types shared by commands, responses and the device status record

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;

/// Transport mechanism state reported by MECHA STATUS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechaStatus {
    NoMedia,
    Ejecting,
    Stopped,
    Playing,
    Ready,
    SearchingForward,
    SearchingBackward,
    Other,
    #[default]
    Unknown,
}

impl MechaStatus {
    /// Map the two-character status code. Unlisted codes are `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "00" => MechaStatus::NoMedia,
            "01" => MechaStatus::Ejecting,
            "10" => MechaStatus::Stopped,
            "11" => MechaStatus::Playing,
            "12" => MechaStatus::Ready,
            "28" => MechaStatus::SearchingForward,
            "29" => MechaStatus::SearchingBackward,
            "FF" => MechaStatus::Other,
            _ => MechaStatus::Unknown,
        }
    }
}

/// Kind of loaded media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    CdDa,
    CdRom,
    #[default]
    Unknown,
}

impl MediaType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "00" => MediaType::CdDa,
            "10" => MediaType::CdRom,
            _ => MediaType::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaType::CdDa => "CD-DA/Audio",
            MediaType::CdRom => "CD-ROM/Data",
            MediaType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Playback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    #[default]
    Continuous,
    Single,
    Random,
}

impl PlayMode {
    /// Map the PLAY MODE RETURN code. Unlisted codes fall back to `Continuous`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "01" => PlayMode::Single,
            "06" => PlayMode::Random,
            _ => PlayMode::Continuous,
        }
    }

    pub fn wire_code(&self) -> &'static str {
        match self {
            PlayMode::Continuous => "00",
            PlayMode::Single => "01",
            PlayMode::Random => "06",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlayMode::Continuous => "continuous",
            PlayMode::Single => "single",
            PlayMode::Random => "random",
        }
    }
}

impl FromStr for PlayMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continuous" => Ok(PlayMode::Continuous),
            "single" => Ok(PlayMode::Single),
            "random" => Ok(PlayMode::Random),
            _ => Err(ValidationError::invalid_value(
                "play_mode",
                s,
                "expected one of continuous, single, random",
            )),
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the front panel is locked out while under serial control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteLocalMode {
    RemoteOnly,
    RemoteAndLocal,
    #[default]
    Unknown,
}

impl RemoteLocalMode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "00" => RemoteLocalMode::RemoteOnly,
            "01" => RemoteLocalMode::RemoteAndLocal,
            _ => RemoteLocalMode::Unknown,
        }
    }

    /// Code for REMOTE/LOCAL SELECT, `None` for `Unknown`
    pub fn wire_code(&self) -> Option<&'static str> {
        match self {
            RemoteLocalMode::RemoteOnly => Some("00"),
            RemoteLocalMode::RemoteAndLocal => Some("01"),
            RemoteLocalMode::Unknown => None,
        }
    }
}

/// Active input source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputDevice {
    #[default]
    Cd,
    Usb,
    Sd,
    Bluetooth,
    Fm,
    Am,
    Aux,
    Unknown,
}

impl InputDevice {
    /// Every selectable source, in wire-code order
    pub const SELECTABLE: [InputDevice; 7] = [
        InputDevice::Sd,
        InputDevice::Usb,
        InputDevice::Cd,
        InputDevice::Bluetooth,
        InputDevice::Fm,
        InputDevice::Am,
        InputDevice::Aux,
    ];

    /// Map the device-kind code of a DEVICE SELECT RETURN
    pub fn from_kind_code(code: &str) -> Option<Self> {
        Self::SELECTABLE
            .into_iter()
            .find(|device| device.kind_code() == Some(code))
    }

    pub fn kind_code(&self) -> Option<&'static str> {
        match self {
            InputDevice::Sd => Some("00"),
            InputDevice::Usb => Some("10"),
            InputDevice::Cd => Some("11"),
            InputDevice::Bluetooth => Some("20"),
            InputDevice::Fm => Some("30"),
            InputDevice::Am => Some("31"),
            InputDevice::Aux => Some("40"),
            InputDevice::Unknown => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InputDevice::Cd => "cd",
            InputDevice::Usb => "usb",
            InputDevice::Sd => "sd",
            InputDevice::Bluetooth => "bluetooth",
            InputDevice::Fm => "fm",
            InputDevice::Am => "am",
            InputDevice::Aux => "aux",
            InputDevice::Unknown => "unknown",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            InputDevice::Cd => "CD",
            InputDevice::Usb => "USB",
            InputDevice::Sd => "SD Card",
            InputDevice::Bluetooth => "Bluetooth",
            InputDevice::Fm => "FM Radio",
            InputDevice::Am => "AM Radio",
            InputDevice::Aux => "AUX Input",
            InputDevice::Unknown => "Unknown",
        }
    }

    /// FM and AM reinterpret track commands as tuner navigation
    pub fn is_tuner(&self) -> bool {
        matches!(self, InputDevice::Fm | InputDevice::Am)
    }
}

impl FromStr for InputDevice {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::SELECTABLE
            .into_iter()
            .find(|device| device.name() == lower)
            .ok_or_else(|| {
                ValidationError::invalid_value(
                    "device",
                    s,
                    "expected one of cd, usb, sd, bluetooth, fm, am, aux",
                )
            })
    }
}

impl fmt::Display for InputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Minutes and seconds of a track or disc
///
/// Minutes may exceed 99; formatting pads to two digits but never truncates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TrackTime {
    pub minutes: u16,
    pub seconds: u8,
}

impl TrackTime {
    pub fn new(minutes: u16, seconds: u8) -> Self {
        Self { minutes, seconds }
    }

    pub fn total_seconds(&self) -> u32 {
        u32::from(self.minutes) * 60 + u32::from(self.seconds)
    }
}

impl fmt::Display for TrackTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

impl Serialize for TrackTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which clock a CURRENT TRACK TIME query asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeKind {
    Elapsed,
    Remaining,
}

impl TimeKind {
    pub fn wire_code(&self) -> &'static str {
        match self {
            TimeKind::Elapsed => "00",
            TimeKind::Remaining => "01",
        }
    }

    /// Map the echoed kind of a CURRENT TRACK TIME RETURN
    ///
    /// Total-disc clocks (`02`, `03`) and anything else map to `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "00" => Some(TimeKind::Elapsed),
            "01" => Some(TimeKind::Remaining),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchSpeed {
    #[default]
    Normal,
    High,
}

/// Fault named by a bit of the ERROR SENSE byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFault {
    FocusError,
    TrackingError,
    SpindleError,
    SledError,
    TrayError,
    NoDisc,
    CannotPlay,
    OtherError,
}

impl DeviceFault {
    pub const BITS: [(u8, DeviceFault); 8] = [
        (0x01, DeviceFault::FocusError),
        (0x02, DeviceFault::TrackingError),
        (0x04, DeviceFault::SpindleError),
        (0x08, DeviceFault::SledError),
        (0x10, DeviceFault::TrayError),
        (0x20, DeviceFault::NoDisc),
        (0x40, DeviceFault::CannotPlay),
        (0x80, DeviceFault::OtherError),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DeviceFault::FocusError => "focus_error",
            DeviceFault::TrackingError => "tracking_error",
            DeviceFault::SpindleError => "spindle_error",
            DeviceFault::SledError => "sled_error",
            DeviceFault::TrayError => "tray_error",
            DeviceFault::NoDisc => "no_disc",
            DeviceFault::CannotPlay => "cannot_play",
            DeviceFault::OtherError => "other_error",
        }
    }
}

/// Advisory named by a bit of the CAUTION SENSE byte
///
/// Bits 5-7 are reserved and carry no name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCaution {
    UnsupportedDisc,
    DirtyDisc,
    NoAudio,
    TemperatureHigh,
    CopyrightProtected,
}

impl DeviceCaution {
    pub const BITS: [(u8, DeviceCaution); 5] = [
        (0x01, DeviceCaution::UnsupportedDisc),
        (0x02, DeviceCaution::DirtyDisc),
        (0x04, DeviceCaution::NoAudio),
        (0x08, DeviceCaution::TemperatureHigh),
        (0x10, DeviceCaution::CopyrightProtected),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DeviceCaution::UnsupportedDisc => "unsupported_disc",
            DeviceCaution::DirtyDisc => "dirty_disc",
            DeviceCaution::NoAudio => "no_audio",
            DeviceCaution::TemperatureHigh => "temperature_high",
            DeviceCaution::CopyrightProtected => "copyright_protected",
        }
    }
}

/// Decoded ERROR SENSE byte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStatus {
    pub raw: u8,
    pub errors: Vec<DeviceFault>,
    pub has_error: bool,
}

impl ErrorStatus {
    pub fn from_byte(raw: u8) -> Self {
        let errors: Vec<DeviceFault> = DeviceFault::BITS
            .iter()
            .filter(|(bit, _)| raw & bit != 0)
            .map(|(_, fault)| *fault)
            .collect();
        let has_error = !errors.is_empty();

        Self {
            raw,
            errors,
            has_error,
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.errors.iter().map(DeviceFault::name).collect()
    }
}

/// Decoded CAUTION SENSE byte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CautionStatus {
    pub raw: u8,
    pub cautions: Vec<DeviceCaution>,
    pub has_caution: bool,
}

impl CautionStatus {
    pub fn from_byte(raw: u8) -> Self {
        let cautions: Vec<DeviceCaution> = DeviceCaution::BITS
            .iter()
            .filter(|(bit, _)| raw & bit != 0)
            .map(|(_, caution)| *caution)
            .collect();
        let has_caution = !cautions.is_empty();

        Self {
            raw,
            cautions,
            has_caution,
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.cautions.iter().map(DeviceCaution::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("00", MechaStatus::NoMedia)]
    #[case("11", MechaStatus::Playing)]
    #[case("28", MechaStatus::SearchingForward)]
    #[case("FF", MechaStatus::Other)]
    #[case("42", MechaStatus::Unknown)]
    fn test_mecha_status_table(#[case] code: &str, #[case] expected: MechaStatus) {
        assert_eq!(MechaStatus::from_code(code), expected);
    }

    #[test]
    fn test_error_status_from_byte() {
        let status = ErrorStatus::from_byte(0x05);
        assert_eq!(status.names(), vec!["focus_error", "spindle_error"]);
        assert!(status.has_error);

        let clear = ErrorStatus::from_byte(0x00);
        assert!(clear.errors.is_empty());
        assert!(!clear.has_error);
    }

    #[test]
    fn test_caution_status_ignores_reserved_bits() {
        let status = CautionStatus::from_byte(0xE2);
        assert_eq!(status.cautions, vec![DeviceCaution::DirtyDisc]);
        assert!(status.has_caution);

        let reserved_only = CautionStatus::from_byte(0x80);
        assert!(!reserved_only.has_caution);
        assert_eq!(reserved_only.raw, 0x80);
    }

    #[test]
    fn test_input_device_lookup() {
        assert_eq!(InputDevice::from_kind_code("30"), Some(InputDevice::Fm));
        assert_eq!(InputDevice::from_kind_code("99"), None);
        assert_eq!("USB".parse::<InputDevice>().unwrap(), InputDevice::Usb);
        assert!("unknown".parse::<InputDevice>().is_err());
        assert!("tape".parse::<InputDevice>().is_err());
        assert!(InputDevice::Am.is_tuner());
        assert!(!InputDevice::Bluetooth.is_tuner());
    }

    #[test]
    fn test_play_mode_names() {
        assert_eq!("random".parse::<PlayMode>().unwrap(), PlayMode::Random);
        assert!("shuffle".parse::<PlayMode>().is_err());
        assert_eq!(PlayMode::from_code("07"), PlayMode::Continuous);
        assert_eq!(PlayMode::Random.wire_code(), "06");
    }

    #[test]
    fn test_track_time_formatting() {
        assert_eq!(TrackTime::new(5, 7).to_string(), "05:07");
        assert_eq!(TrackTime::new(105, 30).to_string(), "105:30");
        assert_eq!(TrackTime::default().to_string(), "00:00");
        assert_eq!(serde_json::to_string(&TrackTime::new(3, 45)).unwrap(), "\"03:45\"");
    }
}
