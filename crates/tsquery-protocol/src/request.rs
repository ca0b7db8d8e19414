//! Outgoing ServerQuery commands

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};
use crate::escape::escape;

/// A command line to be sent to the server
///
/// Parameters keep their insertion order. Adding a key that is already
/// present replaces its value in place; adding an option twice has no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: String,
    parameters: Vec<(String, String)>,
    options: Vec<String>,
}

impl Request {
    /// Start a request for `command`.
    ///
    /// The name is written unescaped, so it must be a single word.
    pub fn new(command: impl Into<String>) -> ProtocolResult<Self> {
        let command = command.into().trim().to_string();
        if command.is_empty() {
            return Err(ProtocolError::EmptyCommand);
        }
        if command.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ProtocolError::InvalidCommand(command));
        }

        Ok(Request {
            command,
            parameters: Vec::new(),
            options: Vec::new(),
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Parameters in insertion order, unescaped
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn options(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(String::as_str)
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Add or replace a `key=value` parameter. Key and value are trimmed.
    pub fn add_parameter(&mut self, key: &str, value: &str) -> ProtocolResult<&mut Self> {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(ProtocolError::EmptyKey);
        }
        if value.is_empty() {
            return Err(ProtocolError::EmptyValue { key: key.to_string() });
        }

        match self.parameters.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.parameters.push((key.to_string(), value.to_string())),
        }
        Ok(self)
    }

    /// Add a `-option` flag. The option is trimmed.
    pub fn add_option(&mut self, option: &str) -> ProtocolResult<&mut Self> {
        let option = option.trim();
        if option.is_empty() {
            return Err(ProtocolError::EmptyOption);
        }

        if !self.has_option(option) {
            self.options.push(option.to_string());
        }
        Ok(self)
    }

    /// Remove a parameter, returning its value if it was present.
    pub fn remove_parameter(&mut self, key: &str) -> Option<String> {
        let pos = self.parameters.iter().position(|(k, _)| k == key.trim())?;
        Some(self.parameters.remove(pos).1)
    }

    pub fn remove_option(&mut self, option: &str) -> bool {
        let before = self.options.len();
        self.options.retain(|o| o != option.trim());
        self.options.len() != before
    }

    /// Consuming form of [`Request::add_parameter`]
    pub fn with_parameter(mut self, key: &str, value: &str) -> ProtocolResult<Self> {
        self.add_parameter(key, value)?;
        Ok(self)
    }

    /// Consuming form of [`Request::add_option`]
    pub fn with_option(mut self, option: &str) -> ProtocolResult<Self> {
        self.add_option(option)?;
        Ok(self)
    }

    /// The full wire line, including the trailing newline
    pub fn encode(&self) -> Vec<u8> {
        let mut line = self.to_string();
        line.push('\n');
        line.into_bytes()
    }

    // Numeric values never trim to empty, and keys below are literals.
    fn number(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.parameters.push((key.to_string(), value.to_string()));
        self
    }

    fn simple(command: &str) -> Self {
        Request {
            command: command.to_string(),
            parameters: Vec::new(),
            options: Vec::new(),
        }
    }
}

impl fmt::Display for Request {
    /// The wire line without its trailing newline
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for (key, value) in &self.parameters {
            write!(f, " {}={}", escape(key), escape(value))?;
        }
        for option in &self.options {
            write!(f, " -{}", escape(option))?;
        }
        Ok(())
    }
}

/// `reasonid` accepted by `clientkick`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickReason {
    Channel = 4,
    Server = 5,
}

/// `targetmode` accepted by `sendtextmessage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMessageTarget {
    Client = 1,
    Channel = 2,
    Server = 3,
}

// Instance and session commands
impl Request {
    pub fn version() -> Self {
        Self::simple("version")
    }

    pub fn hostinfo() -> Self {
        Self::simple("hostinfo")
    }

    pub fn instanceinfo() -> Self {
        Self::simple("instanceinfo")
    }

    pub fn quit() -> Self {
        Self::simple("quit")
    }

    pub fn login(username: &str, password: &str) -> ProtocolResult<Self> {
        Self::simple("login")
            .with_parameter("client_login_name", username)?
            .with_parameter("client_login_password", password)
    }

    pub fn logout() -> Self {
        Self::simple("logout")
    }

    pub fn whoami() -> Self {
        Self::simple("whoami")
    }

    /// `use sid=<id>`
    pub fn use_id(server_id: u32) -> Self {
        Self::simple("use").number("sid", server_id)
    }

    /// `use port=<port>`
    pub fn use_port(port: u16) -> Self {
        Self::simple("use").number("port", port)
    }

    /// `servernotifyregister event=<event> [id=<channel>]`
    pub fn servernotifyregister(event: &str, channel_id: Option<u32>) -> ProtocolResult<Self> {
        let request = Self::simple("servernotifyregister").with_parameter("event", event)?;
        Ok(match channel_id {
            Some(id) => request.number("id", id),
            None => request,
        })
    }

    /// Global message to every virtual server
    pub fn gm(message: &str) -> ProtocolResult<Self> {
        Self::simple("gm").with_parameter("msg", message)
    }

    pub fn sendtextmessage(
        mode: TextMessageTarget,
        target: u32,
        message: &str,
    ) -> ProtocolResult<Self> {
        Self::simple("sendtextmessage")
            .number("targetmode", mode as u8)
            .number("target", target)
            .with_parameter("msg", message)
    }
}

// Virtual servers
impl Request {
    pub fn serverlist() -> Self {
        Self::simple("serverlist")
    }

    pub fn serverinfo() -> Self {
        Self::simple("serverinfo")
    }

    pub fn serverrequestconnectioninfo() -> Self {
        Self::simple("serverrequestconnectioninfo")
    }

    pub fn serveridgetbyport(port: u16) -> Self {
        Self::simple("serveridgetbyport").number("virtualserver_port", port)
    }

    pub fn servercreate(name: &str) -> ProtocolResult<Self> {
        Self::simple("servercreate").with_parameter("virtualserver_name", name)
    }

    pub fn serverdelete(server_id: u32) -> Self {
        Self::simple("serverdelete").number("sid", server_id)
    }

    pub fn serverstart(server_id: u32) -> Self {
        Self::simple("serverstart").number("sid", server_id)
    }

    pub fn serverstop(server_id: u32) -> Self {
        Self::simple("serverstop").number("sid", server_id)
    }
}

// Channels
impl Request {
    pub fn channellist() -> Self {
        Self::simple("channellist")
    }

    pub fn channelinfo(channel_id: u32) -> Self {
        Self::simple("channelinfo").number("cid", channel_id)
    }

    pub fn channelfind(pattern: &str) -> ProtocolResult<Self> {
        Self::simple("channelfind").with_parameter("pattern", pattern)
    }

    pub fn channelmove(channel_id: u32, parent_id: u32, order: Option<u32>) -> Self {
        let request = Self::simple("channelmove")
            .number("cid", channel_id)
            .number("cpid", parent_id);
        match order {
            Some(order) => request.number("order", order),
            None => request,
        }
    }

    pub fn channelcreate(
        name: &str,
        parent_id: Option<u32>,
        order: Option<u32>,
    ) -> ProtocolResult<Self> {
        let mut request = Self::simple("channelcreate").with_parameter("channel_name", name)?;
        if let Some(parent_id) = parent_id {
            request = request.number("cpid", parent_id);
        }
        if let Some(order) = order {
            request = request.number("channel_order", order);
        }
        Ok(request)
    }

    pub fn channeldelete(channel_id: u32, force: bool) -> Self {
        Self::simple("channeldelete")
            .number("cid", channel_id)
            .number("force", u8::from(force))
    }
}

// Clients
impl Request {
    pub fn clientlist() -> Self {
        Self::simple("clientlist")
    }

    pub fn clientinfo(client_id: u32) -> Self {
        Self::simple("clientinfo").number("clid", client_id)
    }

    pub fn clientfind(pattern: &str) -> ProtocolResult<Self> {
        Self::simple("clientfind").with_parameter("pattern", pattern)
    }

    pub fn clientmove(client_id: u32, channel_id: u32) -> Self {
        Self::simple("clientmove")
            .number("clid", client_id)
            .number("cid", channel_id)
    }

    /// Kick from the channel or the server. A blank message is left out.
    pub fn clientkick(client_id: u32, reason: KickReason, message: Option<&str>) -> Self {
        let mut request = Self::simple("clientkick")
            .number("clid", client_id)
            .number("reasonid", reason as u8);
        if let Some(message) = message {
            // Only fails on a blank message, which is simply omitted.
            let _ = request.add_parameter("reasonmsg", message);
        }
        request
    }

    pub fn clientpoke(client_id: u32, message: &str) -> ProtocolResult<Self> {
        Self::simple("clientpoke")
            .number("clid", client_id)
            .with_parameter("msg", message)
    }
}

// Bans
impl Request {
    pub fn banlist() -> Self {
        Self::simple("banlist")
    }

    pub fn bandel(ban_id: u32) -> Self {
        Self::simple("bandel").number("banid", ban_id)
    }

    pub fn bandelall() -> Self {
        Self::simple("bandelall")
    }

    pub fn banadd_ip(ip: &str, reason: &str, seconds: Option<u64>) -> ProtocolResult<Self> {
        Self::banadd("ip", ip, reason, seconds)
    }

    pub fn banadd_uid(uid: &str, reason: &str, seconds: Option<u64>) -> ProtocolResult<Self> {
        Self::banadd("uid", uid, reason, seconds)
    }

    pub fn banadd_name(name: &str, reason: &str, seconds: Option<u64>) -> ProtocolResult<Self> {
        Self::banadd("name", name, reason, seconds)
    }

    pub fn banclient(client_id: u32, reason: &str, seconds: Option<u64>) -> ProtocolResult<Self> {
        let request = Self::simple("banclient")
            .number("clid", client_id)
            .with_parameter("banreason", reason)?;
        Ok(with_duration(request, seconds))
    }

    fn banadd(rule: &str, value: &str, reason: &str, seconds: Option<u64>) -> ProtocolResult<Self> {
        let request = Self::simple("banadd")
            .with_parameter(rule, value)?
            .with_parameter("banreason", reason)?;
        Ok(with_duration(request, seconds))
    }
}

fn with_duration(request: Request, seconds: Option<u64>) -> Request {
    match seconds {
        Some(seconds) => request.number("time", seconds),
        None => request,
    }
}
