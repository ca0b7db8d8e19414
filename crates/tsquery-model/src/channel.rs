//! Channels (`channellist`, `channelinfo`, `channelfind`)

use serde::Serialize;
use tsquery_protocol::Group;

use crate::enums::CodecType;
use crate::{flag, text, FromGroup};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Channel {
    pub id: Option<u32>,
    pub parent_id: Option<u32>,
    pub name: Option<String>,
    pub name_phonetic: Option<String>,
    pub topic: Option<String>,
    pub description: Option<String>,
    pub order: Option<u32>,
    pub total_clients: Option<u32>,
    pub max_clients: Option<i32>,
    pub max_family_clients: Option<i32>,
    pub needed_subscribe_power: Option<u32>,
    pub needed_talk_power: Option<u32>,
    pub codec: Option<CodecType>,
    pub codec_quality: Option<u8>,
    pub codec_latency_factor: Option<u32>,
    pub codec_is_unencrypted: Option<bool>,
    pub forced_silence: Option<bool>,
    pub icon_id: Option<i64>,
    pub file_path: Option<String>,
    pub is_default: Option<bool>,
    pub has_password: Option<bool>,
    pub is_permanent: Option<bool>,
    pub is_semi_permanent: Option<bool>,
    pub max_clients_unlimited: Option<bool>,
    pub max_family_clients_unlimited: Option<bool>,
    pub max_family_clients_inherited: Option<bool>,
}

impl Channel {
    /// Top-level channels have parent id 0
    pub fn is_top_level(&self) -> bool {
        self.parent_id == Some(0)
    }
}

impl FromGroup for Channel {
    fn from_group(group: &Group) -> Self {
        Channel {
            id: group.get_parsed("cid"),
            // Not sent by channelfind.
            parent_id: group.get_parsed("pid"),
            name: text(group, "channel_name"),
            name_phonetic: text(group, "channel_name_phonetic"),
            topic: text(group, "channel_topic"),
            description: text(group, "channel_description"),
            order: group.get_parsed("channel_order"),
            total_clients: group.get_parsed("total_clients"),
            max_clients: group.get_parsed("channel_maxclients"),
            max_family_clients: group.get_parsed("channel_maxfamilyclients"),
            needed_subscribe_power: group.get_parsed("channel_needed_subscribe_power"),
            needed_talk_power: group.get_parsed("channel_needed_talk_power"),
            codec: group.get_parsed("channel_codec").and_then(CodecType::from_id),
            codec_quality: group.get_parsed("channel_codec_quality"),
            codec_latency_factor: group.get_parsed("channel_codec_latency_factor"),
            codec_is_unencrypted: flag(group, "channel_codec_is_unencrypted"),
            forced_silence: flag(group, "channel_forced_silence"),
            icon_id: group.get_parsed("channel_icon_id"),
            file_path: text(group, "channel_filepath"),
            is_default: flag(group, "channel_flag_default"),
            has_password: flag(group, "channel_flag_password"),
            is_permanent: flag(group, "channel_flag_permanent"),
            is_semi_permanent: flag(group, "channel_flag_semi_permanent"),
            max_clients_unlimited: flag(group, "channel_flag_maxclients_unlimited"),
            max_family_clients_unlimited: flag(group, "channel_flag_maxfamilyclients_unlimited"),
            max_family_clients_inherited: flag(group, "channel_flag_maxfamilyclients_inherited"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsquery_protocol::Message;

    #[test]
    fn test_channellist() {
        let message = Message::parse(
            "cid=1 pid=0 channel_order=0 channel_name=Default\\sChannel total_clients=1 channel_needed_subscribe_power=0|cid=2 pid=1 channel_order=1 channel_name=AFK total_clients=0 channel_needed_subscribe_power=0\n\rerror id=0 msg=ok\n\r",
        );
        let channels = Channel::from_message(&message);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name.as_deref(), Some("Default Channel"));
        assert!(channels[0].is_top_level());
        assert_eq!(channels[1].parent_id, Some(1));
        assert_eq!(channels[1].total_clients, Some(0));
        assert_eq!(channels[1].codec, None);
    }

    #[test]
    fn test_channelinfo_flags_and_codec() {
        let group = Group::parse(
            "pid=0 channel_name=Lobby channel_codec=2 channel_codec_quality=7 channel_maxclients=-1 channel_flag_default=1 channel_flag_password=0",
        );
        let channel = Channel::from_group(&group);
        assert_eq!(channel.id, None);
        assert_eq!(channel.codec, Some(CodecType::SpeexUltraWideBand));
        assert_eq!(channel.max_clients, Some(-1));
        assert_eq!(channel.is_default, Some(true));
        assert_eq!(channel.has_password, Some(false));
        assert_eq!(channel.is_permanent, None);
    }
}
