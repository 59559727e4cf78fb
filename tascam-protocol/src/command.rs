//! Typed commands
//!
//! Every command the deck understands is built here. Builders that take an
//! argument validate it before returning, so an invalid command can never be
//! queued.

use std::fmt;

use crate::digits::encode_ordered;
use crate::error::ValidationError;
use crate::frame;
use crate::types::{
    InputDevice, PlayMode, RemoteLocalMode, SearchDirection, SearchSpeed, TimeKind,
};

/// Command codes
pub mod codes {
    pub const INFORMATION_REQUEST: &str = "0F";
    pub const STOP: &str = "10";
    pub const PLAY: &str = "12";
    pub const READY: &str = "14";
    pub const SEARCH: &str = "16";
    pub const EJECT: &str = "18";
    pub const SKIP: &str = "1A";
    pub const DIRECT_TRACK: &str = "23";
    pub const RESUME_SELECT: &str = "34";
    pub const RESUME_SENSE: &str = "35";
    pub const REPEAT_SELECT: &str = "37";
    pub const REPEAT_SENSE: &str = "38";
    pub const INCREMENTAL_SELECT: &str = "3A";
    pub const INCREMENTAL_SENSE: &str = "3B";
    pub const CLEAR: &str = "4A";
    pub const REMOTE_LOCAL_SELECT: &str = "4C";
    pub const REMOTE_LOCAL_SENSE: &str = "4D";
    pub const PLAY_MODE_SELECT: &str = "4E";
    pub const PLAY_MODE_SENSE: &str = "4F";
    pub const MECHA_STATUS_SENSE: &str = "50";
    pub const TRACK_NUMBER_SENSE: &str = "55";
    pub const MEDIA_STATUS_SENSE: &str = "56";
    pub const CURRENT_TRACK_INFO_SENSE: &str = "57";
    pub const CURRENT_TRACK_TIME_SENSE: &str = "58";
    pub const TOTAL_TRACK_TIME_SENSE: &str = "5D";
    pub const ERROR_SENSE: &str = "78";
    pub const CAUTION_SENSE: &str = "79";
    pub const DEVICE_SELECT: &str = "7F01";
    pub const ENTER: &str = "7F7049";
    pub const BACK: &str = "7F704A";
}

/// Data payload of a DEVICE SELECT query
pub const DEVICE_QUERY: &str = "FF";

/// Highest track accepted by DIRECT TRACK SEARCH
pub const MAX_TRACK: u16 = 999;

/// Highest tuner preset
pub const MAX_PRESET: u8 = 20;

/// A single outgoing command
///
/// Immutable once built. The dispatch queue consumes it exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    code: &'static str,
    data: String,
}

impl Command {
    pub fn new(code: &'static str, data: impl Into<String>) -> Self {
        Self {
            code,
            data: data.into(),
        }
    }

    /// Command without a data payload
    pub fn bare(code: &'static str) -> Self {
        Self::new(code, String::new())
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Wire bytes including LF, machine id and CR
    pub fn encode(&self) -> Vec<u8> {
        frame::encode(self.code, &self.data)
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub fn play() -> Self {
        Self::bare(codes::PLAY)
    }

    pub fn stop() -> Self {
        Self::bare(codes::STOP)
    }

    pub fn eject() -> Self {
        Self::bare(codes::EJECT)
    }

    /// READY with the pause flag
    pub fn pause() -> Self {
        Self::new(codes::READY, "01")
    }

    /// Resuming from pause is a plain PLAY
    pub fn resume() -> Self {
        Self::play()
    }

    pub fn next_track() -> Self {
        Self::new(codes::SKIP, "00")
    }

    pub fn previous_track() -> Self {
        Self::new(codes::SKIP, "01")
    }

    /// DIRECT TRACK SEARCH PRESET for tracks 1..=999
    pub fn goto_track(track: u16) -> Result<Self, ValidationError> {
        if !(1..=MAX_TRACK).contains(&track) {
            return Err(ValidationError::range_error("track", 1, MAX_TRACK, track));
        }
        Ok(Self::new(codes::DIRECT_TRACK, encode_ordered(track)))
    }

    pub fn search(direction: SearchDirection, speed: SearchSpeed) -> Self {
        let data = match (direction, speed) {
            (SearchDirection::Forward, SearchSpeed::Normal) => "00",
            (SearchDirection::Backward, SearchSpeed::Normal) => "01",
            (SearchDirection::Forward, SearchSpeed::High) => "10",
            (SearchDirection::Backward, SearchSpeed::High) => "11",
        };
        Self::new(codes::SEARCH, data)
    }

    /// Leaving search mode returns to playback
    pub fn search_stop() -> Self {
        Self::play()
    }

    // ========================================================================
    // Modes
    // ========================================================================

    pub fn play_mode_select(mode: PlayMode) -> Self {
        Self::new(codes::PLAY_MODE_SELECT, mode.wire_code())
    }

    pub fn repeat_select(enabled: bool) -> Self {
        Self::new(codes::REPEAT_SELECT, flag(enabled))
    }

    pub fn resume_select(enabled: bool) -> Self {
        Self::new(codes::RESUME_SELECT, flag(enabled))
    }

    pub fn incremental_select(enabled: bool) -> Self {
        Self::new(codes::INCREMENTAL_SELECT, flag(enabled))
    }

    pub fn remote_local_select(mode: RemoteLocalMode) -> Result<Self, ValidationError> {
        let code = mode.wire_code().ok_or_else(|| {
            ValidationError::invalid_value(
                "remote_local_mode",
                format!("{mode:?}"),
                "mode must be remote_only or remote_and_local",
            )
        })?;
        Ok(Self::new(codes::REMOTE_LOCAL_SELECT, code))
    }

    /// Remote control with the front panel left enabled; sent on every connect
    pub fn enable_remote_and_local() -> Self {
        Self::new(codes::REMOTE_LOCAL_SELECT, "01")
    }

    pub fn device_select(device: InputDevice) -> Result<Self, ValidationError> {
        let code = device.kind_code().ok_or_else(|| {
            ValidationError::invalid_value("device", device.name(), "device is not selectable")
        })?;
        Ok(Self::new(codes::DEVICE_SELECT, code))
    }

    // ========================================================================
    // Tuner and navigation
    // ========================================================================

    pub fn frequency_up() -> Self {
        Self::new(codes::SKIP, "00")
    }

    pub fn frequency_down() -> Self {
        Self::new(codes::SKIP, "01")
    }

    pub fn seek_up() -> Self {
        Self::new(codes::SEARCH, "00")
    }

    pub fn seek_down() -> Self {
        Self::new(codes::SEARCH, "01")
    }

    /// Recall a tuner preset, 1..=20
    pub fn tuner_preset(preset: u8) -> Result<Self, ValidationError> {
        if !(1..=MAX_PRESET).contains(&preset) {
            return Err(ValidationError::range_error("preset", 1, MAX_PRESET, preset));
        }
        Ok(Self::new(
            codes::DIRECT_TRACK,
            encode_ordered(u16::from(preset)),
        ))
    }

    pub fn clear() -> Self {
        Self::bare(codes::CLEAR)
    }

    pub fn enter() -> Self {
        Self::new(codes::ENTER, "01")
    }

    pub fn back() -> Self {
        Self::new(codes::BACK, "01")
    }

    // ========================================================================
    // Sense queries
    // ========================================================================

    pub fn information_request() -> Self {
        Self::bare(codes::INFORMATION_REQUEST)
    }

    pub fn mecha_status_sense() -> Self {
        Self::bare(codes::MECHA_STATUS_SENSE)
    }

    pub fn track_number_sense() -> Self {
        Self::bare(codes::TRACK_NUMBER_SENSE)
    }

    pub fn media_status_sense() -> Self {
        Self::bare(codes::MEDIA_STATUS_SENSE)
    }

    pub fn current_track_info_sense() -> Self {
        Self::bare(codes::CURRENT_TRACK_INFO_SENSE)
    }

    pub fn track_time_sense(kind: TimeKind) -> Self {
        Self::new(codes::CURRENT_TRACK_TIME_SENSE, kind.wire_code())
    }

    pub fn total_track_time_sense() -> Self {
        Self::bare(codes::TOTAL_TRACK_TIME_SENSE)
    }

    pub fn play_mode_sense() -> Self {
        Self::bare(codes::PLAY_MODE_SENSE)
    }

    pub fn resume_sense() -> Self {
        Self::bare(codes::RESUME_SENSE)
    }

    pub fn repeat_sense() -> Self {
        Self::bare(codes::REPEAT_SENSE)
    }

    pub fn incremental_sense() -> Self {
        Self::bare(codes::INCREMENTAL_SENSE)
    }

    pub fn remote_local_sense() -> Self {
        Self::bare(codes::REMOTE_LOCAL_SENSE)
    }

    pub fn error_sense() -> Self {
        Self::bare(codes::ERROR_SENSE)
    }

    pub fn caution_sense() -> Self {
        Self::bare(codes::CAUTION_SENSE)
    }

    /// Ask which input is active; answered by a vendor `FF 01` frame
    pub fn device_query() -> Self {
        Self::new(codes::DEVICE_SELECT, DEVICE_QUERY)
    }
}

fn flag(enabled: bool) -> &'static str {
    if enabled {
        "01"
    } else {
        "00"
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.is_empty() {
            f.write_str(self.code)
        } else {
            write!(f, "{} {}", self.code, self.data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Command::play(), b"\n012\r".to_vec())]
    #[case(Command::pause(), b"\n01401\r".to_vec())]
    #[case(Command::next_track(), b"\n01A00\r".to_vec())]
    #[case(Command::device_query(), b"\n07F01FF\r".to_vec())]
    #[case(Command::enter(), b"\n07F704901\r".to_vec())]
    #[case(Command::track_time_sense(TimeKind::Elapsed), b"\n05800\r".to_vec())]
    fn test_encoded_bytes(#[case] command: Command, #[case] expected: Vec<u8>) {
        assert_eq!(command.encode(), expected);
    }

    #[rstest]
    #[case(SearchDirection::Forward, SearchSpeed::Normal, "00")]
    #[case(SearchDirection::Backward, SearchSpeed::Normal, "01")]
    #[case(SearchDirection::Forward, SearchSpeed::High, "10")]
    #[case(SearchDirection::Backward, SearchSpeed::High, "11")]
    fn test_search_payload(
        #[case] direction: SearchDirection,
        #[case] speed: SearchSpeed,
        #[case] expected: &str,
    ) {
        let command = Command::search(direction, speed);
        assert_eq!(command.code(), codes::SEARCH);
        assert_eq!(command.data(), expected);
    }

    #[test]
    fn test_goto_track_validation() {
        assert_eq!(Command::goto_track(12).unwrap().data(), "1200");
        assert_eq!(Command::goto_track(999).unwrap().data(), "9909");
        assert!(matches!(
            Command::goto_track(0),
            Err(ValidationError::RangeError { .. })
        ));
        assert!(Command::goto_track(1000).is_err());
    }

    #[test]
    fn test_tuner_preset_validation() {
        assert_eq!(Command::tuner_preset(5).unwrap().data(), "0500");
        assert_eq!(Command::tuner_preset(20).unwrap().code(), codes::DIRECT_TRACK);
        assert!(Command::tuner_preset(0).is_err());
        assert!(Command::tuner_preset(21).is_err());
    }

    #[test]
    fn test_device_select() {
        assert_eq!(Command::device_select(InputDevice::Fm).unwrap().data(), "30");
        assert_eq!(Command::device_select(InputDevice::Sd).unwrap().data(), "00");
        assert!(Command::device_select(InputDevice::Unknown).is_err());
    }

    #[test]
    fn test_mode_selects() {
        assert_eq!(Command::play_mode_select(PlayMode::Random).data(), "06");
        assert_eq!(Command::repeat_select(true).data(), "01");
        assert_eq!(Command::resume_select(false).data(), "00");
        assert_eq!(Command::incremental_select(true).code(), codes::INCREMENTAL_SELECT);
        assert_eq!(
            Command::remote_local_select(RemoteLocalMode::RemoteOnly)
                .unwrap()
                .data(),
            "00"
        );
        assert!(Command::remote_local_select(RemoteLocalMode::Unknown).is_err());
    }

    #[test]
    fn test_tuner_commands_reuse_track_codes() {
        assert_eq!(Command::frequency_up(), Command::next_track());
        assert_eq!(Command::frequency_down(), Command::previous_track());
        assert_eq!(
            Command::seek_down(),
            Command::search(SearchDirection::Backward, SearchSpeed::Normal)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::stop().to_string(), "10");
        assert_eq!(Command::device_query().to_string(), "7F01 FF");
    }
}
