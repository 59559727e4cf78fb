//! The device status record

use serde::Serialize;

use tascam_protocol::{
    CautionStatus, ErrorStatus, InputDevice, MechaStatus, MediaType, PlayMode, RemoteLocalMode,
    TrackTime,
};

/// Last-known state of the deck
///
/// Created with defaults when a session starts, updated only by the
/// [`StatusDecoder`](crate::StatusDecoder) and reset on disconnect. Readers
/// always receive a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub mecha_status: MechaStatus,
    /// 0 when no track is selected
    pub track_number: u16,
    pub current_track: u16,
    pub total_tracks: u16,
    pub time_elapsed: TrackTime,
    pub time_remaining: TrackTime,
    pub total_time: TrackTime,
    pub media_present: bool,
    pub media_type: MediaType,
    pub play_mode: PlayMode,
    pub repeat_mode: bool,
    pub resume_mode: bool,
    pub incremental_play: bool,
    pub remote_local_mode: RemoteLocalMode,
    pub device: InputDevice,
    pub device_name: String,
    pub is_tuner: bool,
    pub error_status: Option<ErrorStatus>,
    pub caution_status: Option<CautionStatus>,
}

impl DeviceStatus {
    /// Switch the active input, keeping the derived fields in step
    pub fn set_device(&mut self, device: InputDevice) {
        self.device = device;
        self.device_name = device.display_name().to_string();
        self.is_tuner = device.is_tuner();
    }

    pub fn is_playing(&self) -> bool {
        self.mecha_status == MechaStatus::Playing
    }

    /// True if the last ERROR SENSE reported any fault
    pub fn has_error(&self) -> bool {
        self.error_status
            .as_ref()
            .map(|status| status.has_error)
            .unwrap_or(false)
    }

    pub fn has_caution(&self) -> bool {
        self.caution_status
            .as_ref()
            .map(|status| status.has_caution)
            .unwrap_or(false)
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        let device = InputDevice::default();
        Self {
            mecha_status: MechaStatus::Unknown,
            track_number: 0,
            current_track: 0,
            total_tracks: 0,
            time_elapsed: TrackTime::default(),
            time_remaining: TrackTime::default(),
            total_time: TrackTime::default(),
            media_present: false,
            media_type: MediaType::Unknown,
            play_mode: PlayMode::Continuous,
            repeat_mode: false,
            resume_mode: false,
            incremental_play: false,
            remote_local_mode: RemoteLocalMode::Unknown,
            device,
            device_name: device.display_name().to_string(),
            is_tuner: device.is_tuner(),
            error_status: None,
            caution_status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let status = DeviceStatus::default();
        assert_eq!(status.mecha_status, MechaStatus::Unknown);
        assert_eq!(status.device, InputDevice::Cd);
        assert_eq!(status.device_name, "CD");
        assert!(!status.is_tuner);
        assert_eq!(status.time_elapsed.to_string(), "00:00");
        assert!(status.error_status.is_none());
        assert!(!status.has_error());
    }

    #[test]
    fn test_set_device_updates_derived_fields() {
        let mut status = DeviceStatus::default();
        status.set_device(InputDevice::Am);
        assert_eq!(status.device_name, "AM Radio");
        assert!(status.is_tuner);

        status.set_device(InputDevice::Usb);
        assert!(!status.is_tuner);
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let mut status = DeviceStatus::default();
        status.mecha_status = MechaStatus::SearchingForward;
        status.time_elapsed = TrackTime::new(105, 30);
        status.error_status = Some(ErrorStatus::from_byte(0x20));

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["mecha_status"], "searching_forward");
        assert_eq!(json["time_elapsed"], "105:30");
        assert_eq!(json["media_type"], "unknown");
        assert_eq!(json["error_status"]["errors"][0], "no_disc");
        assert!(json["caution_status"].is_null());
    }
}
