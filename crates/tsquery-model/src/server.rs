//! Virtual servers (`serverlist`, `serverinfo`)

use serde::Serialize;
use tsquery_protocol::Group;

use crate::enums::HostMessageMode;
use crate::{flag, text, FromGroup};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualServer {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub port: Option<u16>,
    pub status: Option<String>,
    pub machine_id: Option<String>,
    pub uptime: Option<u64>,
    pub clients_online: Option<u32>,
    pub query_clients_online: Option<u32>,
    pub max_clients: Option<u32>,
    pub auto_start: Option<bool>,
    pub welcome_message: Option<String>,
    pub host_message: Option<String>,
    pub host_message_mode: Option<HostMessageMode>,
    pub platform: Option<String>,
    pub version: Option<String>,
}

impl VirtualServer {
    pub fn is_online(&self) -> bool {
        self.status.as_deref() == Some("online")
    }
}

impl FromGroup for VirtualServer {
    fn from_group(group: &Group) -> Self {
        VirtualServer {
            id: group.get_parsed("virtualserver_id"),
            name: text(group, "virtualserver_name"),
            port: group.get_parsed("virtualserver_port"),
            status: text(group, "virtualserver_status"),
            machine_id: text(group, "virtualserver_machine_id"),
            uptime: group.get_parsed("virtualserver_uptime"),
            clients_online: group.get_parsed("virtualserver_clientsonline"),
            query_clients_online: group.get_parsed("virtualserver_queryclientsonline"),
            max_clients: group.get_parsed("virtualserver_maxclients"),
            auto_start: flag(group, "virtualserver_autostart"),
            welcome_message: text(group, "virtualserver_welcomemessage"),
            host_message: text(group, "virtualserver_hostmessage"),
            host_message_mode: group
                .get_parsed("virtualserver_hostmessage_mode")
                .and_then(HostMessageMode::from_id),
            platform: text(group, "virtualserver_platform"),
            version: text(group, "virtualserver_version"),
        }
    }
}
