//! Connected clients (`clientlist`, `clientinfo`, `clientfind`)

use serde::Serialize;
use tsquery_protocol::Group;

use crate::enums::ClientType;
use crate::{flag, text, FromGroup};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Client {
    pub id: Option<u32>,
    pub channel_id: Option<u32>,
    pub database_id: Option<u32>,
    pub nickname: Option<String>,
    pub nickname_phonetic: Option<String>,
    pub client_type: Option<ClientType>,
    pub unique_identifier: Option<String>,
    pub login_name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub platform: Option<String>,
    pub country: Option<String>,
    pub ip: Option<String>,
    pub server_groups: Vec<u32>,
    pub channel_group_id: Option<u32>,
    pub away: Option<bool>,
    pub away_message: Option<String>,
    pub input_muted: Option<bool>,
    pub output_muted: Option<bool>,
    pub input_hardware: Option<bool>,
    pub output_hardware: Option<bool>,
    pub is_recording: Option<bool>,
    pub is_talker: Option<bool>,
    pub is_priority_speaker: Option<bool>,
    pub is_channel_commander: Option<bool>,
    pub talk_power: Option<u32>,
    pub idle_time_ms: Option<u64>,
    pub created: Option<u64>,
    pub last_connected: Option<u64>,
    pub total_connections: Option<u32>,
    pub connected_time_ms: Option<u64>,
    pub bytes_sent_total: Option<u64>,
    pub bytes_received_total: Option<u64>,
}

impl Client {
    pub fn is_query_client(&self) -> bool {
        self.client_type == Some(ClientType::ServerQuery)
    }
}

impl FromGroup for Client {
    fn from_group(group: &Group) -> Self {
        Client {
            id: group.get_parsed("clid"),
            channel_id: group.get_parsed("cid"),
            database_id: group.get_parsed("client_database_id"),
            nickname: text(group, "client_nickname"),
            nickname_phonetic: text(group, "client_nickname_phonetic"),
            client_type: group.get_parsed("client_type").and_then(ClientType::from_id),
            unique_identifier: text(group, "client_unique_identifier"),
            login_name: text(group, "client_login_name"),
            description: text(group, "client_description"),
            version: text(group, "client_version"),
            platform: text(group, "client_platform"),
            country: text(group, "client_country"),
            ip: text(group, "connection_client_ip"),
            server_groups: group
                .get("client_servergroups")
                .map(|v| v.split(',').filter_map(|id| id.trim().parse().ok()).collect())
                .unwrap_or_default(),
            channel_group_id: group.get_parsed("client_channel_group_id"),
            away: flag(group, "client_away"),
            away_message: text(group, "client_away_message"),
            input_muted: flag(group, "client_input_muted"),
            output_muted: flag(group, "client_output_muted"),
            input_hardware: flag(group, "client_input_hardware"),
            output_hardware: flag(group, "client_output_hardware"),
            is_recording: flag(group, "client_is_recording"),
            is_talker: flag(group, "client_is_talker"),
            is_priority_speaker: flag(group, "client_is_priority_speaker"),
            is_channel_commander: flag(group, "client_is_channel_commander"),
            talk_power: group.get_parsed("client_talk_power"),
            idle_time_ms: group.get_parsed("client_idle_time"),
            created: group.get_parsed("client_created"),
            last_connected: group.get_parsed("client_lastconnected"),
            total_connections: group.get_parsed("client_totalconnections"),
            connected_time_ms: group.get_parsed("connection_connected_time"),
            bytes_sent_total: group.get_parsed("connection_bytes_sent_total"),
            bytes_received_total: group.get_parsed("connection_bytes_received_total"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsquery_protocol::Message;

    #[test]
    fn test_clientfind() {
        let message = Message::parse("clid=1 client_nickname=Imisnew2\n\rerror id=0 msg=ok\n\r");
        let clients = Client::from_message(&message);
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, Some(1));
        assert_eq!(clients[0].nickname.as_deref(), Some("Imisnew2"));
        assert!(clients[0].server_groups.is_empty());
    }

    #[test]
    fn test_clientinfo() {
        let group = Group::parse(
            "cid=3 client_database_id=12 client_type=1 client_servergroups=6,8 client_away=1 client_away_message=brb client_input_muted=0 client_idle_time=4521 connection_client_ip=10.0.0.5",
        );
        let client = Client::from_group(&group);
        assert_eq!(client.channel_id, Some(3));
        assert!(client.is_query_client());
        assert_eq!(client.server_groups, vec![6, 8]);
        assert_eq!(client.away, Some(true));
        assert_eq!(client.away_message.as_deref(), Some("brb"));
        assert_eq!(client.input_muted, Some(false));
        assert_eq!(client.idle_time_ms, Some(4521));
        assert_eq!(client.ip.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_serialize() {
        let client = Client::from_group(&Group::parse("clid=4 client_nickname=Bob"));
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["nickname"], "Bob");
        assert!(json["away"].is_null());
    }
}
