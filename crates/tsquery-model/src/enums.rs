//! Numeric enumerations used in response fields

use serde::Serialize;

/// `client_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClientType {
    Regular,
    ServerQuery,
}

impl ClientType {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(ClientType::Regular),
            1 => Some(ClientType::ServerQuery),
            _ => None,
        }
    }
}

/// `channel_codec`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CodecType {
    SpeexNarrowBand,
    SpeexWideBand,
    SpeexUltraWideBand,
    CeltMono,
}

impl CodecType {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(CodecType::SpeexNarrowBand),
            1 => Some(CodecType::SpeexWideBand),
            2 => Some(CodecType::SpeexUltraWideBand),
            3 => Some(CodecType::CeltMono),
            _ => None,
        }
    }
}

/// `virtualserver_hostmessage_mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HostMessageMode {
    None,
    Log,
    Modal,
    ModalQuit,
}

impl HostMessageMode {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(HostMessageMode::None),
            1 => Some(HostMessageMode::Log),
            2 => Some(HostMessageMode::Modal),
            3 => Some(HostMessageMode::ModalQuit),
            _ => None,
        }
    }
}
