// Fixed-size little-endian frames. A frame is recognised by its leading
// action id and its length.

use byte_struct::*;
use thiserror::Error;

use crate::constants::SENSOR_COUNT;
use crate::model::{Payload, RequestKind, TelemetryResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Probe,
    StartLogging,
    StopLogging,
    ReadSensors,
    SensorData,
    ProbeAck,
    Unknown(i32),
}

impl From<i32> for ActionKind {
    fn from(value: i32) -> Self {
        match value {
            1001 => ActionKind::Probe,
            1002 => ActionKind::StartLogging,
            1003 => ActionKind::StopLogging,
            3001 => ActionKind::ReadSensors,
            2001 => ActionKind::SensorData,
            2002 => ActionKind::ProbeAck,
            other => ActionKind::Unknown(other),
        }
    }
}

impl From<ActionKind> for i32 {
    fn from(value: ActionKind) -> Self {
        match value {
            ActionKind::Probe => 1001,
            ActionKind::StartLogging => 1002,
            ActionKind::StopLogging => 1003,
            ActionKind::ReadSensors => 3001,
            ActionKind::SensorData => 2001,
            ActionKind::ProbeAck => 2002,
            ActionKind::Unknown(other) => other,
        }
    }
}

#[derive(ByteStruct, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct ProbeFrame {
    pub action_id: i32,
}

#[derive(ByteStruct, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct CommandFrame {
    pub action_id: i32,
    pub value: f32,
}

#[derive(ByteStruct, Clone, Copy, Debug, Default)]
#[byte_struct_le]
pub struct SensorFrame {
    pub action_id: i32,
    pub sens: [f32; SENSOR_COUNT],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    Request(RequestKind),
    Response(TelemetryResponse),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame of {len} bytes is too short for action {action:?}")]
    Short { action: ActionKind, len: usize },
    #[error("unknown action id {0}")]
    UnknownAction(i32),
}

fn to_bytes<T: ByteStruct>(frame: &T) -> Vec<u8> {
    let mut buf = vec![0u8; T::BYTE_LEN];
    frame.write_bytes(&mut buf);
    buf
}

pub fn encode_request(kind: RequestKind) -> Vec<u8> {
    match kind {
        RequestKind::Probe => to_bytes(&ProbeFrame {
            action_id: ActionKind::Probe.into(),
        }),
        RequestKind::ReadSensors => to_bytes(&CommandFrame {
            action_id: ActionKind::ReadSensors.into(),
            value: 0.0,
        }),
        RequestKind::SetLogging(armed) => {
            let action = if armed {
                ActionKind::StartLogging
            } else {
                ActionKind::StopLogging
            };
            to_bytes(&CommandFrame {
                action_id: action.into(),
                value: if armed { 1.0 } else { 0.0 },
            })
        }
    }
}

pub fn encode_response(response: &TelemetryResponse) -> Vec<u8> {
    match response.payload {
        Payload::Readings(sens) => to_bytes(&SensorFrame {
            action_id: response.action.into(),
            sens,
        }),
        Payload::Ack => to_bytes(&ProbeFrame {
            action_id: response.action.into(),
        }),
    }
}

pub fn decode(buf: &[u8]) -> Result<Frame, DecodeError> {
    if buf.len() < ProbeFrame::BYTE_LEN {
        return Err(DecodeError::Short {
            action: ActionKind::Unknown(0),
            len: buf.len(),
        });
    }
    let action = ActionKind::from(ProbeFrame::read_bytes(&buf[..ProbeFrame::BYTE_LEN]).action_id);
    let need = |min: usize| {
        if buf.len() < min {
            Err(DecodeError::Short {
                action,
                len: buf.len(),
            })
        } else {
            Ok(())
        }
    };
    match action {
        ActionKind::Probe => Ok(Frame::Request(RequestKind::Probe)),
        ActionKind::StartLogging => {
            need(CommandFrame::BYTE_LEN)?;
            Ok(Frame::Request(RequestKind::SetLogging(true)))
        }
        ActionKind::StopLogging => {
            need(CommandFrame::BYTE_LEN)?;
            Ok(Frame::Request(RequestKind::SetLogging(false)))
        }
        ActionKind::ReadSensors => {
            need(CommandFrame::BYTE_LEN)?;
            Ok(Frame::Request(RequestKind::ReadSensors))
        }
        ActionKind::ProbeAck => Ok(Frame::Response(TelemetryResponse {
            action,
            payload: Payload::Ack,
        })),
        ActionKind::SensorData => {
            need(SensorFrame::BYTE_LEN)?;
            let frame = SensorFrame::read_bytes(&buf[..SensorFrame::BYTE_LEN]);
            Ok(Frame::Response(TelemetryResponse {
                action,
                payload: Payload::Readings(frame.sens),
            }))
        }
        ActionKind::Unknown(id) => Err(DecodeError::UnknownAction(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sizes() {
        assert_eq!(encode_request(RequestKind::Probe).len(), 4);
        assert_eq!(encode_request(RequestKind::ReadSensors).len(), 8);
        assert_eq!(encode_request(RequestKind::SetLogging(true)).len(), 8);
        let response = TelemetryResponse {
            action: ActionKind::SensorData,
            payload: Payload::Readings([0.0; SENSOR_COUNT]),
        };
        assert_eq!(encode_response(&response).len(), 40);
    }

    #[test]
    fn test_read_request_layout() {
        let buf = encode_request(RequestKind::ReadSensors);
        assert_eq!(&buf[..4], &3001i32.to_le_bytes());
        assert_eq!(&buf[4..], &0.0f32.to_le_bytes());
    }

    #[test]
    fn test_logging_broadcast_actions() {
        let start = encode_request(RequestKind::SetLogging(true));
        let stop = encode_request(RequestKind::SetLogging(false));
        assert_eq!(&start[..4], &1002i32.to_le_bytes());
        assert_eq!(&stop[..4], &1003i32.to_le_bytes());
        assert_eq!(
            decode(&stop),
            Ok(Frame::Request(RequestKind::SetLogging(false)))
        );
    }

    #[test]
    fn test_decode_sensor_frame() {
        let mut buf = 2001i32.to_le_bytes().to_vec();
        for i in 0..SENSOR_COUNT {
            buf.extend_from_slice(&(20.0f32 + i as f32).to_le_bytes());
        }
        match decode(&buf) {
            Ok(Frame::Response(TelemetryResponse {
                action: ActionKind::SensorData,
                payload: Payload::Readings(sens),
            })) => {
                assert_eq!(sens[0], 20.0);
                assert_eq!(sens[8], 28.0);
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_truncated_and_unknown() {
        let buf = 2001i32.to_le_bytes();
        assert_eq!(
            decode(&buf),
            Err(DecodeError::Short {
                action: ActionKind::SensorData,
                len: 4
            })
        );
        assert_eq!(
            decode(&4242i32.to_le_bytes()),
            Err(DecodeError::UnknownAction(4242))
        );
        assert!(decode(&[0u8; 2]).is_err());
    }
}
