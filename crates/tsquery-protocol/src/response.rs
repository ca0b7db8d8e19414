//! Parsed server output: pairs, groups, sections, messages and notifications

use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::escape::unescape;

/// Error id of a flood ban
pub const FLOOD_BAN_ID: u32 = 3331;
/// Error id returned when connecting while banned
pub const BANNED_ID: u32 = 3329;

/// One `key=value` token. The key and value are unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    key: String,
    value: Option<String>,
}

impl Pair {
    /// Split on the first `=` only; a token without one is a bare key.
    pub fn parse(token: &str) -> Self {
        match token.split_once('=') {
            Some((key, value)) => Pair {
                key: unescape(key),
                value: Some(unescape(value)),
            },
            None => Pair {
                key: unescape(token),
                value: None,
            },
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Space-separated pairs describing one entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pairs: Vec<Pair>,
}

impl Group {
    pub fn parse(line: &str) -> Self {
        let mut group = Group::default();
        for token in line.split(' ').filter(|t| !t.is_empty()) {
            group.insert(Pair::parse(token));
        }
        group
    }

    /// A repeated key drops the earlier pair.
    pub fn insert(&mut self, pair: Pair) {
        self.pairs.retain(|p| p.key != pair.key);
        self.pairs.push(pair);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| p.key == key)
            .and_then(Pair::value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|p| p.key == key)
    }

    /// Value parsed with [`FromStr`]; `None` when absent or malformed.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// `"1"` is true, anything else (or absence) is false.
    pub fn get_flag(&self, key: &str) -> bool {
        self.get(key) == Some("1")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for pair in &self.pairs {
            map.serialize_entry(&pair.key, &pair.value)?;
        }
        map.end()
    }
}

/// One data line: `|`-separated groups
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Section {
    groups: Vec<Group>,
}

impl Section {
    pub fn parse(line: &str) -> Self {
        Section {
            groups: line.split('|').map(Group::parse).collect(),
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// First group of the section
    pub fn group(&self) -> Option<&Group> {
        self.groups.first()
    }
}

/// A complete response: the data lines plus the closing `error` line
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Message {
    error: Group,
    sections: Vec<Section>,
}

impl Message {
    /// Parse a block of `\n\r`-separated lines ending in `error id=...`.
    pub fn parse(text: &str) -> Self {
        let mut lines: Vec<&str> = text
            .split("\n\r")
            .map(|l| l.trim_end_matches(['\n', '\r']))
            .filter(|l| !l.is_empty())
            .collect();

        let error = match lines.last() {
            Some(last) if last.starts_with("error ") => {
                let group = Group::parse(&last["error ".len()..]);
                lines.pop();
                group
            }
            _ => Group::default(),
        };

        Message {
            error,
            sections: lines.into_iter().map(Section::parse).collect(),
        }
    }

    /// Numeric error id; `None` when missing or not a number
    pub fn id(&self) -> Option<u32> {
        self.error.get_parsed("id")
    }

    pub fn is_ok(&self) -> bool {
        self.id() == Some(0)
    }

    pub fn is_banned(&self) -> bool {
        matches!(self.id(), Some(BANNED_ID) | Some(FLOOD_BAN_ID))
    }

    /// The `msg` text of the error line
    pub fn message(&self) -> Option<&str> {
        self.error.get("msg")
    }

    pub fn extra_message(&self) -> Option<&str> {
        self.error.get("extra_msg")
    }

    pub fn error(&self) -> &Group {
        &self.error
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self) -> Option<&Section> {
        self.sections.first()
    }

    /// First group of the first section
    pub fn group(&self) -> Option<&Group> {
        self.section().and_then(Section::group)
    }

    /// Every group of every section, in order
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.sections.iter().flat_map(|s| s.groups.iter())
    }
}

/// An unsolicited `notify...` line
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Notification {
    event: String,
    group: Group,
}

impl Notification {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\n', '\r']);
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        let event = head.strip_prefix("notify").unwrap_or(head);

        Notification {
            event: unescape(event),
            group: Group::parse(rest),
        }
    }

    /// Event name without the `notify` prefix, e.g. `clientleftview`
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.group.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_splits_on_first_equals() {
        let pair = Pair::parse("msg=a=b");
        assert_eq!(pair.key(), "msg");
        assert_eq!(pair.value(), Some("a=b"));

        let bare = Pair::parse("-flag");
        assert_eq!(bare.key(), "-flag");
        assert_eq!(bare.value(), None);
    }

    #[test]
    fn test_group_later_duplicate_wins() {
        let group = Group::parse("a=1 b=2 a=3");
        assert_eq!(group.len(), 2);
        assert_eq!(group.get("a"), Some("3"));
        let keys: Vec<&str> = group.iter().map(Pair::key).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_group_typed_lookups() {
        let group = Group::parse("clid=5 client_away=1 client_input_muted=0 cid=x");
        assert_eq!(group.get_parsed::<u32>("clid"), Some(5));
        assert_eq!(group.get_parsed::<u32>("cid"), None);
        assert!(group.get_flag("client_away"));
        assert!(!group.get_flag("client_input_muted"));
        assert!(!group.get_flag("missing"));
    }

    #[test]
    fn test_message_with_sections() {
        let message = Message::parse(
            "clid=1 client_nickname=Alice|clid=2 client_nickname=Bob\\sB\n\rerror id=0 msg=ok\n\r",
        );
        assert!(message.is_ok());
        assert_eq!(message.sections().len(), 1);
        let names: Vec<&str> = message
            .groups()
            .filter_map(|g| g.get("client_nickname"))
            .collect();
        assert_eq!(names, vec!["Alice", "Bob B"]);
    }

    #[test]
    fn test_message_error_fields() {
        let message = Message::parse(
            "error id=3329 msg=connection\\sfailed,\\syou\\sare\\sbanned extra_msg=you\\smay\\sretry\\sin\\s600\\sseconds",
        );
        assert_eq!(message.id(), Some(3329));
        assert!(message.is_banned());
        assert!(!message.is_ok());
        assert_eq!(message.message(), Some("connection failed, you are banned"));
        assert_eq!(message.extra_message(), Some("you may retry in 600 seconds"));
        assert!(message.sections().is_empty());
        assert!(message.group().is_none());
    }

    #[test]
    fn test_message_non_numeric_id() {
        let message = Message::parse("error id=abc msg=weird\n\r");
        assert_eq!(message.id(), None);
        assert!(!message.is_ok());
    }

    #[test]
    fn test_notification() {
        let notification =
            Notification::parse("notifyclientleftview cfid=1 ctid=0 reasonid=8 reasonmsg=leaving clid=5\n\r");
        assert_eq!(notification.event(), "clientleftview");
        assert_eq!(notification.get("clid"), Some("5"));
        assert_eq!(notification.get("reasonmsg"), Some("leaving"));
    }

    #[test]
    fn test_serialize_group_as_map() {
        let message = Message::parse("version=3.0.6.1 build=1340956745\n\rerror id=0 msg=ok\n\r");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["error"]["id"], "0");
        assert_eq!(json["sections"][0][0]["version"], "3.0.6.1");
    }
}
