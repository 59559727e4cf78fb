//! Response decoder - applies typed responses to the status record
//!
//! [`Response`] parsing lives in `tascam-protocol`; this module decides what
//! each response means for [`DeviceStatus`] and which follow-up query, if any,
//! the device is asking for.

use tracing::{debug, info, warn};

use tascam_protocol::{Command, Frame, ParseError, Response, TimeKind};

use crate::status::DeviceStatus;

/// Outcome of applying one response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decoded {
    /// Whether any status field now holds a different value
    pub changed: bool,
    /// Query the device asked us to send
    pub follow_up: Option<Command>,
}

impl Decoded {
    fn unchanged() -> Self {
        Self::default()
    }

    fn follow_up(command: Command) -> Self {
        Self {
            changed: false,
            follow_up: Some(command),
        }
    }
}

/// Applies decoded responses to a [`DeviceStatus`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusDecoder;

impl StatusDecoder {
    /// Parse a frame and apply it
    ///
    /// A frame that fails to parse leaves `status` untouched.
    pub fn apply_frame(status: &mut DeviceStatus, frame: &Frame) -> Result<Decoded, ParseError> {
        let response = Response::parse(frame)?;
        Ok(Self::apply(status, &response))
    }

    /// Apply a parsed response in place
    pub fn apply(status: &mut DeviceStatus, response: &Response) -> Decoded {
        let before = status.clone();

        match response {
            Response::MechaStatus(mecha) => status.mecha_status = *mecha,
            Response::TrackNumber(track) => status.track_number = *track,
            Response::CurrentTrackInfo(track) => status.current_track = *track,
            Response::TrackTime { kind, time } => match kind {
                Some(TimeKind::Remaining) => status.time_remaining = *time,
                Some(TimeKind::Elapsed) => status.time_elapsed = *time,
                None => {
                    debug!("Ignoring track time for an untracked clock");
                    return Decoded::unchanged();
                }
            },
            Response::MediaStatus {
                present,
                media_type,
            } => {
                status.media_present = *present;
                status.media_type = *media_type;
            }
            Response::PlayMode(mode) => status.play_mode = *mode,
            Response::TotalTrackTime { tracks, time } => {
                status.total_tracks = *tracks;
                if let Some(time) = time {
                    status.total_time = *time;
                }
            }
            Response::DeviceSelect(Some(device)) => {
                if status.device != *device {
                    debug!("Device changed to: {}", device.display_name());
                }
                status.set_device(*device);
            }
            Response::DeviceSelect(None) => {
                debug!("Ignoring device select echo with unknown device kind");
            }
            Response::Vendor { category } => {
                debug!("Ignoring vendor return category {}", category);
            }
            Response::Resume(enabled) => status.resume_mode = *enabled,
            Response::Repeat(enabled) => status.repeat_mode = *enabled,
            Response::IncrementalPlay(enabled) => status.incremental_play = *enabled,
            Response::RemoteLocal(mode) => status.remote_local_mode = *mode,
            Response::ErrorSense(error_status) => {
                if error_status.has_error {
                    warn!("Device errors: {}", error_status.names().join(", "));
                }
                status.error_status = Some(error_status.clone());
            }
            Response::CautionSense(caution_status) => {
                if caution_status.has_caution {
                    info!("Device cautions: {}", caution_status.names().join(", "));
                }
                status.caution_status = Some(caution_status.clone());
            }
            Response::ErrorSenseRequest => {
                debug!("Device reported an error, requesting details");
                return Decoded::follow_up(Command::error_sense());
            }
            Response::CautionSenseRequest => {
                debug!("Device reported a caution, requesting details");
                return Decoded::follow_up(Command::caution_sense());
            }
            Response::ChangeStatus => {
                info!("Status changed notification received");
                return Decoded::follow_up(Command::device_query());
            }
            Response::PowerOn => {
                info!("Device reported power on");
                return Decoded::follow_up(Command::device_query());
            }
            Response::IllegalStatus => {
                warn!("Illegal command/status received");
                return Decoded::unchanged();
            }
            Response::Information(payload) => {
                debug!("Information return: {}", payload);
                return Decoded::unchanged();
            }
            Response::Unknown { code, data } => {
                debug!("Unhandled response {} with data '{}'", code, data);
                return Decoded::unchanged();
            }
        }

        Decoded {
            changed: *status != before,
            follow_up: None,
        }
    }
}
