//! Incremental parser for server output
//!
//! Bytes are fed in as they arrive. Each call to [`Parser::next_unit`]
//! matches one unit at the head of the buffer, in this order:
//!
//! 1. greeting header (`TS3`), until seen
//! 2. greeting banner, after the header and until seen
//! 3. notification line
//! 4. message block ending in an `error id=` line, reported as
//!    [`Unit::Banned`] when the id is a ban id

use bytes::BytesMut;
use tracing::trace;

use crate::error::{ProtocolError, ProtocolResult};
use crate::response::{Message, Notification};

/// Line terminator used by the server
pub const TERMINATOR: &[u8] = b"\n\r";

/// Default cap on buffered, unmatched input (4MB)
pub const MAX_BUFFER_SIZE: usize = 4 * 1024 * 1024;

const GREETING_HEADER: &[u8] = b"TS3";
const GREETING_BANNER: &[u8] = b"Welcome to the TeamSpeak 3 ServerQuery interface";
const NOTIFY_PREFIX: &[u8] = b"notify";
const ERROR_PREFIX: &[u8] = b"error id=";

/// One matched unit of server output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    GreetingHeader,
    GreetingBanner,
    Notification(Notification),
    Message(Message),
    Banned(Message),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Greeting {
    AwaitHeader,
    AwaitBanner,
    Done,
}

/// ServerQuery output parser
pub struct Parser {
    buffer: BytesMut,
    max_size: usize,
    greeting: Greeting,
    /// Start of the first line of the head unit not yet known to be a
    /// data line
    line_start: usize,
    /// Where the search for that line's terminator resumes
    searched: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self::with_max_size(MAX_BUFFER_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_size,
            greeting: Greeting::AwaitHeader,
            line_start: 0,
            searched: 0,
        }
    }

    /// Add data to the parser buffer
    pub fn feed(&mut self, data: &[u8]) -> ProtocolResult<()> {
        if self.buffer.len() + data.len() > self.max_size {
            return Err(ProtocolError::MessageTooLarge {
                size: self.buffer.len() + data.len(),
                max: self.max_size,
            });
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Try to match one unit at the head of the buffer.
    ///
    /// Returns `Ok(None)` while the buffer is empty or holds only part of a
    /// unit; the partial bytes are kept for the next call, and scanning
    /// resumes where it stopped.
    pub fn next_unit(&mut self) -> ProtocolResult<Option<Unit>> {
        loop {
            let line_end = match self.find_terminator() {
                Some(pos) => pos,
                None => return Ok(None),
            };
            let line = &self.buffer[self.line_start..line_end];

            if self.line_start == 0 {
                if self.greeting == Greeting::AwaitHeader && line == GREETING_HEADER {
                    self.consume(line_end);
                    self.greeting = Greeting::AwaitBanner;
                    trace!("greeting header");
                    return Ok(Some(Unit::GreetingHeader));
                }

                if self.greeting == Greeting::AwaitBanner && line.starts_with(GREETING_BANNER) {
                    self.consume(line_end);
                    self.greeting = Greeting::Done;
                    trace!("greeting banner");
                    return Ok(Some(Unit::GreetingBanner));
                }

                if line.starts_with(NOTIFY_PREFIX) {
                    let line = self.consume(line_end);
                    trace!(line = %line, "notification");
                    return Ok(Some(Unit::Notification(Notification::parse(&line))));
                }
            }

            // Data lines accumulate until the closing error line.
            if line.starts_with(ERROR_PREFIX) {
                let text = self.consume(line_end);
                trace!(text = %text, "message");
                let message = Message::parse(&text);
                return Ok(Some(if message.is_banned() {
                    Unit::Banned(message)
                } else {
                    Unit::Message(message)
                }));
            }

            self.line_start = line_end + TERMINATOR.len();
            self.searched = self.line_start;
        }
    }

    /// Handle end of stream.
    ///
    /// The server may close the socket right after an unterminated ban
    /// notice; that notice is still reported. Anything else left over is
    /// discarded.
    pub fn finish(&mut self) -> Option<Unit> {
        if self.buffer.is_empty() {
            return None;
        }

        let rest = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        self.line_start = 0;
        self.searched = 0;

        let last_line = rest
            .rsplit(|c: char| c == '\n' || c == '\r')
            .find(|l| !l.is_empty())?;
        if !last_line.as_bytes().starts_with(ERROR_PREFIX) {
            return None;
        }

        let message = Message::parse(&rest);
        message.is_banned().then_some(Unit::Banned(message))
    }

    /// Number of buffered bytes not yet matched
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether both greeting lines have been seen
    pub fn greeted(&self) -> bool {
        self.greeting == Greeting::Done
    }

    /// Index of the terminator ending the line at `line_start`.
    ///
    /// Bytes already searched are skipped; a trailing byte that may be the
    /// first half of a split terminator is searched again next time.
    fn find_terminator(&mut self) -> Option<usize> {
        let found = self.buffer[self.searched..]
            .windows(TERMINATOR.len())
            .position(|w| w == TERMINATOR);
        match found {
            Some(pos) => Some(self.searched + pos),
            None => {
                let resume = self.buffer.len().saturating_sub(TERMINATOR.len() - 1);
                self.searched = resume.max(self.line_start);
                None
            }
        }
    }

    /// Remove `len` bytes plus the terminator, returning them as text.
    fn consume(&mut self, len: usize) -> String {
        self.line_start = 0;
        self.searched = 0;
        let bytes = self.buffer.split_to(len + TERMINATOR.len());
        String::from_utf8_lossy(&bytes[..len]).into_owned()
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREETING: &[u8] = b"TS3\n\rWelcome to the TeamSpeak 3 ServerQuery interface, type \"help\" for a list of commands and \"help <command>\" for information on a specific command.\n\r";

    fn greeted() -> Parser {
        let mut parser = Parser::new();
        parser.feed(GREETING).unwrap();
        assert_eq!(parser.next_unit().unwrap(), Some(Unit::GreetingHeader));
        assert_eq!(parser.next_unit().unwrap(), Some(Unit::GreetingBanner));
        assert!(parser.greeted());
        parser
    }

    #[test]
    fn test_greeting() {
        let mut parser = greeted();
        assert_eq!(parser.next_unit().unwrap(), None);
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_greeting_split_across_reads() {
        let mut parser = Parser::new();
        parser.feed(b"TS3\n").unwrap();
        assert_eq!(parser.next_unit().unwrap(), None);
        parser.feed(b"\rWelcome to the TeamSpeak 3 ServerQuery").unwrap();
        assert_eq!(parser.next_unit().unwrap(), Some(Unit::GreetingHeader));
        assert_eq!(parser.next_unit().unwrap(), None);
        parser.feed(b" interface, type \"help\".\n\r").unwrap();
        assert_eq!(parser.next_unit().unwrap(), Some(Unit::GreetingBanner));
    }

    #[test]
    fn test_message() {
        let mut parser = greeted();
        parser
            .feed(b"version=3.0.6.1 build=1340956745 platform=Windows\n\rerror id=0 msg=ok\n\r")
            .unwrap();

        let message = match parser.next_unit().unwrap() {
            Some(Unit::Message(m)) => m,
            other => panic!("unexpected {:?}", other),
        };
        assert!(message.is_ok());
        assert_eq!(message.group().and_then(|g| g.get("platform")), Some("Windows"));
        assert_eq!(parser.next_unit().unwrap(), None);
    }

    #[test]
    fn test_incomplete_message_stays_buffered() {
        let mut parser = greeted();
        parser.feed(b"clid=1 client_nickname=Alice\n\rerror id=0 ms").unwrap();
        assert_eq!(parser.next_unit().unwrap(), None);

        parser.feed(b"g=ok\n").unwrap();
        assert_eq!(parser.next_unit().unwrap(), None);

        parser.feed(b"\r").unwrap();
        assert!(matches!(parser.next_unit().unwrap(), Some(Unit::Message(_))));
    }

    #[test]
    fn test_byte_at_a_time() {
        let input = b"notifytextmessage targetmode=3 msg=hi\n\rcid=1|cid=2\n\rerror id=0 msg=ok\n\r";
        let mut parser = greeted();
        let mut units = Vec::new();
        for byte in input.iter() {
            parser.feed(std::slice::from_ref(byte)).unwrap();
            while let Some(unit) = parser.next_unit().unwrap() {
                units.push(unit);
            }
        }

        assert_eq!(units.len(), 2);
        assert!(matches!(&units[0], Unit::Notification(n) if n.event() == "textmessage"));
        assert!(matches!(&units[1], Unit::Message(m) if m.groups().count() == 2));
    }

    #[test]
    fn test_notification_between_messages() {
        let mut parser = greeted();
        parser
            .feed(b"error id=0 msg=ok\n\rnotifycliententerview clid=7\n\rerror id=512 msg=invalid\\sclientID\n\r")
            .unwrap();

        assert!(matches!(parser.next_unit().unwrap(), Some(Unit::Message(m)) if m.is_ok()));
        assert!(matches!(
            parser.next_unit().unwrap(),
            Some(Unit::Notification(n)) if n.get("clid") == Some("7")
        ));
        assert!(matches!(
            parser.next_unit().unwrap(),
            Some(Unit::Message(m)) if m.id() == Some(512) && m.message() == Some("invalid clientID")
        ));
    }

    #[test]
    fn test_ban_takes_precedence() {
        let mut parser = greeted();
        parser.feed(b"error id=3331 msg=flood\\sban\n\r").unwrap();
        assert!(matches!(
            parser.next_unit().unwrap(),
            Some(Unit::Banned(m)) if m.id() == Some(3331)
        ));
    }

    #[test]
    fn test_unterminated_ban_at_end_of_stream() {
        let mut parser = greeted();
        parser
            .feed(b"error id=3329 msg=connection\\sfailed,\\syou\\sare\\sbanned extra_msg=you\\smay\\sretry\\sin\\s600\\sseconds")
            .unwrap();
        assert_eq!(parser.next_unit().unwrap(), None);

        let unit = parser.finish();
        assert!(matches!(unit, Some(Unit::Banned(ref m)) if m.id() == Some(3329)));
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_finish_drops_other_leftovers() {
        let mut parser = greeted();
        parser.feed(b"clid=1\n\rerror id=0").unwrap();
        assert_eq!(parser.finish(), None);
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_greeting_only_matched_once() {
        let mut parser = greeted();
        parser.feed(b"TS3\n\rerror id=0 msg=ok\n\r").unwrap();
        match parser.next_unit().unwrap() {
            Some(Unit::Message(m)) => assert_eq!(m.sections().len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_long_response_resumes_scan() {
        let mut parser = greeted();
        let line = b"cid=1 channel_name=Lobby|cid=2 channel_name=AFK\n\r";
        for _ in 0..100 {
            parser.feed(line).unwrap();
            assert_eq!(parser.next_unit().unwrap(), None);
            assert_eq!(parser.line_start, parser.buffered());
        }

        parser.feed(b"error id=0 msg=").unwrap();
        assert_eq!(parser.next_unit().unwrap(), None);
        assert!(parser.searched > parser.line_start);

        parser.feed(b"ok\n").unwrap();
        assert_eq!(parser.next_unit().unwrap(), None);
        parser.feed(b"\r").unwrap();
        match parser.next_unit().unwrap() {
            Some(Unit::Message(m)) => assert_eq!(m.sections().len(), 100),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(parser.buffered(), 0);
        assert_eq!((parser.line_start, parser.searched), (0, 0));
    }

    #[test]
    fn test_ban_before_greeting() {
        let mut parser = Parser::new();
        parser
            .feed(b"error id=3329 msg=connection\\sfailed,\\syou\\sare\\sbanned\n\r")
            .unwrap();
        assert!(matches!(
            parser.next_unit().unwrap(),
            Some(Unit::Banned(m)) if m.id() == Some(3329) && m.message() == Some("connection failed, you are banned")
        ));
        assert!(!parser.greeted());
    }

    #[test]
    fn test_buffer_cap() {
        let mut parser = Parser::with_max_size(16);
        parser.feed(b"0123456789").unwrap();
        assert!(matches!(
            parser.feed(b"0123456789"),
            Err(ProtocolError::MessageTooLarge { size: 20, max: 16 })
        ));
    }

    #[test]
    fn test_multibyte_split_across_reads() {
        let mut parser = greeted();
        let line = "client_nickname=Jürgen\n\rerror id=0 msg=ok\n\r".as_bytes();
        let split = line.iter().position(|&b| b >= 0x80).unwrap() + 1;
        parser.feed(&line[..split]).unwrap();
        assert_eq!(parser.next_unit().unwrap(), None);
        parser.feed(&line[split..]).unwrap();

        match parser.next_unit().unwrap() {
            Some(Unit::Message(m)) => {
                assert_eq!(m.group().and_then(|g| g.get("client_nickname")), Some("Jürgen"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
