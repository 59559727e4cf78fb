//! Typed responses
//!
//! [`Response::parse`] turns a [`Frame`] into one variant per response family.
//! Parsing is pure: it never touches device state, and a frame that fails to
//! parse is rejected as a whole.

use crate::digits::{decode_ordered, decode_pair};
use crate::error::ParseError;
use crate::frame::Frame;
use crate::types::{
    CautionStatus, ErrorStatus, InputDevice, MechaStatus, MediaType, PlayMode, RemoteLocalMode,
    TimeKind, TrackTime,
};

/// Vendor category carrying a DEVICE SELECT echo
pub const VENDOR_DEVICE_SELECT: &str = "01";

/// Minimum payload for a vendor device-select echo
pub const VENDOR_DEVICE_SELECT_LEN: usize = 8;

/// Total-time field value meaning "not supported for this media"
const TOTAL_TIME_UNSUPPORTED: &str = "000000";

/// Response codes the deck can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Information,
    ResumeReturn,
    RepeatReturn,
    IncrementalReturn,
    RemoteLocalReturn,
    PlayModeReturn,
    MechaStatusReturn,
    TrackNumberReturn,
    MediaStatusReturn,
    CurrentTrackInfoReturn,
    CurrentTrackTimeReturn,
    TotalTrackTimeReturn,
    ErrorSenseRequest,
    CautionSenseRequest,
    IllegalStatus,
    PowerOnStatus,
    ChangeStatus,
    ErrorSenseReturn,
    CautionSenseReturn,
    VendorReturn,
}

impl ResponseCode {
    pub fn from_code(code: &str) -> Option<Self> {
        let code = match code {
            "8F" => ResponseCode::Information,
            "B5" => ResponseCode::ResumeReturn,
            "B8" => ResponseCode::RepeatReturn,
            "BB" => ResponseCode::IncrementalReturn,
            "CD" => ResponseCode::RemoteLocalReturn,
            "CF" => ResponseCode::PlayModeReturn,
            "D0" => ResponseCode::MechaStatusReturn,
            "D5" => ResponseCode::TrackNumberReturn,
            "D6" => ResponseCode::MediaStatusReturn,
            "D7" => ResponseCode::CurrentTrackInfoReturn,
            "D8" => ResponseCode::CurrentTrackTimeReturn,
            "DD" => ResponseCode::TotalTrackTimeReturn,
            "F0" => ResponseCode::ErrorSenseRequest,
            "F1" => ResponseCode::CautionSenseRequest,
            "F2" => ResponseCode::IllegalStatus,
            "F4" => ResponseCode::PowerOnStatus,
            "F6" => ResponseCode::ChangeStatus,
            "F8" => ResponseCode::ErrorSenseReturn,
            "F9" => ResponseCode::CautionSenseReturn,
            "FF" => ResponseCode::VendorReturn,
            _ => return None,
        };
        Some(code)
    }

    pub fn code(&self) -> &'static str {
        match self {
            ResponseCode::Information => "8F",
            ResponseCode::ResumeReturn => "B5",
            ResponseCode::RepeatReturn => "B8",
            ResponseCode::IncrementalReturn => "BB",
            ResponseCode::RemoteLocalReturn => "CD",
            ResponseCode::PlayModeReturn => "CF",
            ResponseCode::MechaStatusReturn => "D0",
            ResponseCode::TrackNumberReturn => "D5",
            ResponseCode::MediaStatusReturn => "D6",
            ResponseCode::CurrentTrackInfoReturn => "D7",
            ResponseCode::CurrentTrackTimeReturn => "D8",
            ResponseCode::TotalTrackTimeReturn => "DD",
            ResponseCode::ErrorSenseRequest => "F0",
            ResponseCode::CautionSenseRequest => "F1",
            ResponseCode::IllegalStatus => "F2",
            ResponseCode::PowerOnStatus => "F4",
            ResponseCode::ChangeStatus => "F6",
            ResponseCode::ErrorSenseReturn => "F8",
            ResponseCode::CautionSenseReturn => "F9",
            ResponseCode::VendorReturn => "FF",
        }
    }

    /// Minimum payload length before a frame of this code is accepted
    pub fn min_len(&self) -> usize {
        match self {
            ResponseCode::MechaStatusReturn
            | ResponseCode::PlayModeReturn
            | ResponseCode::VendorReturn
            | ResponseCode::ResumeReturn
            | ResponseCode::RepeatReturn
            | ResponseCode::IncrementalReturn
            | ResponseCode::RemoteLocalReturn
            | ResponseCode::ErrorSenseReturn
            | ResponseCode::CautionSenseReturn => 2,
            ResponseCode::TrackNumberReturn
            | ResponseCode::CurrentTrackInfoReturn
            | ResponseCode::MediaStatusReturn => 4,
            ResponseCode::CurrentTrackTimeReturn => 10,
            ResponseCode::TotalTrackTimeReturn => 12,
            ResponseCode::Information
            | ResponseCode::ErrorSenseRequest
            | ResponseCode::CautionSenseRequest
            | ResponseCode::IllegalStatus
            | ResponseCode::PowerOnStatus
            | ResponseCode::ChangeStatus => 0,
        }
    }
}

/// A decoded response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    MechaStatus(MechaStatus),
    TrackNumber(u16),
    CurrentTrackInfo(u16),
    /// `kind` is `None` for a clock the status does not track
    TrackTime {
        kind: Option<TimeKind>,
        time: TrackTime,
    },
    MediaStatus {
        present: bool,
        media_type: MediaType,
    },
    PlayMode(PlayMode),
    /// `time` is `None` when the media does not report a total time
    TotalTrackTime {
        tracks: u16,
        time: Option<TrackTime>,
    },
    /// Vendor device-select echo; `None` for an unrecognised device kind
    DeviceSelect(Option<InputDevice>),
    /// Vendor return of a category this driver does not interpret
    Vendor {
        category: String,
    },
    Resume(bool),
    Repeat(bool),
    IncrementalPlay(bool),
    RemoteLocal(RemoteLocalMode),
    ErrorSense(ErrorStatus),
    CautionSense(CautionStatus),
    ErrorSenseRequest,
    CautionSenseRequest,
    ChangeStatus,
    IllegalStatus,
    PowerOn,
    Information(String),
    Unknown {
        code: String,
        data: String,
    },
}

impl Response {
    pub fn parse(frame: &Frame) -> Result<Self, ParseError> {
        Self::parse_parts(&frame.code, &frame.data)
    }

    pub fn parse_parts(code: &str, data: &str) -> Result<Self, ParseError> {
        let Some(response_code) = ResponseCode::from_code(code) else {
            return Ok(Response::Unknown {
                code: code.to_string(),
                data: data.to_string(),
            });
        };

        if !data.is_ascii() {
            return Err(ParseError::NonAscii {
                code: code.to_string(),
            });
        }
        require_len(code, data, response_code.min_len())?;

        let response = match response_code {
            ResponseCode::MechaStatusReturn => Response::MechaStatus(MechaStatus::from_code(&data[..2])),
            ResponseCode::TrackNumberReturn => {
                Response::TrackNumber(decode_ordered(code, "track_number", &data[..4])?)
            }
            ResponseCode::CurrentTrackInfoReturn => {
                Response::CurrentTrackInfo(decode_ordered(code, "current_track", &data[..4])?)
            }
            ResponseCode::CurrentTrackTimeReturn => Response::TrackTime {
                kind: TimeKind::from_code(&data[..2]),
                time: decode_time(code, &data[2..8])?,
            },
            ResponseCode::MediaStatusReturn => Response::MediaStatus {
                present: &data[..2] == "01",
                media_type: MediaType::from_code(&data[2..4]),
            },
            ResponseCode::PlayModeReturn => Response::PlayMode(PlayMode::from_code(&data[..2])),
            ResponseCode::TotalTrackTimeReturn => {
                let tracks = decode_ordered(code, "total_tracks", &data[..4])?;
                let time = match &data[4..10] {
                    TOTAL_TIME_UNSUPPORTED => None,
                    raw => Some(decode_time(code, raw)?),
                };
                Response::TotalTrackTime { tracks, time }
            }
            ResponseCode::VendorReturn => parse_vendor(code, data)?,
            ResponseCode::ResumeReturn => Response::Resume(is_on(data)),
            ResponseCode::RepeatReturn => Response::Repeat(is_on(data)),
            ResponseCode::IncrementalReturn => Response::IncrementalPlay(is_on(data)),
            ResponseCode::RemoteLocalReturn => {
                Response::RemoteLocal(RemoteLocalMode::from_code(&data[..2]))
            }
            ResponseCode::ErrorSenseReturn => {
                Response::ErrorSense(ErrorStatus::from_byte(decode_hex(code, &data[..2])?))
            }
            ResponseCode::CautionSenseReturn => {
                Response::CautionSense(CautionStatus::from_byte(decode_hex(code, &data[..2])?))
            }
            ResponseCode::ErrorSenseRequest => Response::ErrorSenseRequest,
            ResponseCode::CautionSenseRequest => Response::CautionSenseRequest,
            ResponseCode::ChangeStatus => Response::ChangeStatus,
            ResponseCode::IllegalStatus => Response::IllegalStatus,
            ResponseCode::PowerOnStatus => Response::PowerOn,
            ResponseCode::Information => Response::Information(data.to_string()),
        };

        Ok(response)
    }
}

fn require_len(code: &str, data: &str, expected: usize) -> Result<(), ParseError> {
    if data.len() < expected {
        return Err(ParseError::TooShort {
            code: code.to_string(),
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// `[min:4 ordered][sec:2]`
fn decode_time(code: &str, raw: &str) -> Result<TrackTime, ParseError> {
    let minutes = decode_ordered(code, "minutes", &raw[..4])?;
    let seconds = decode_pair(code, "seconds", &raw[4..6])?;
    Ok(TrackTime::new(minutes, seconds))
}

fn decode_hex(code: &str, raw: &str) -> Result<u8, ParseError> {
    let invalid = || ParseError::InvalidHex {
        code: code.to_string(),
        value: raw.to_string(),
    };
    // from_str_radix alone would accept a sign
    if raw.len() != 2 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    u8::from_str_radix(raw, 16).map_err(|_| invalid())
}

fn is_on(data: &str) -> bool {
    &data[..2] == "01"
}

fn parse_vendor(code: &str, data: &str) -> Result<Response, ParseError> {
    let category = &data[..2];
    if category != VENDOR_DEVICE_SELECT {
        return Ok(Response::Vendor {
            category: category.to_string(),
        });
    }

    require_len(code, data, VENDOR_DEVICE_SELECT_LEN)?;
    Ok(Response::DeviceSelect(InputDevice::from_kind_code(&data[6..8])))
}
