//! Turning a typed line into a request
//!
//! ```text
//! clientlist -uid -away
//! clientpoke clid=5 msg="wake up"
//! ```
//!
//! The first word is the command, `-name` adds an option and `key=value`
//! adds a parameter. Double quotes keep spaces inside a word; the quotes
//! themselves are dropped and escaping happens when the request is encoded.

use anyhow::{bail, Result};
use tsquery_protocol::Request;

pub fn parse_line(line: &str) -> Result<Request> {
    let mut words = split_words(line)?.into_iter();
    let command = match words.next() {
        Some(command) => command,
        None => bail!("Empty command"),
    };
    let mut request = Request::new(command)?;

    for word in words {
        if let Some((key, value)) = word.split_once('=') {
            request.add_parameter(key, value)?;
        } else if let Some(option) = word.strip_prefix('-') {
            request.add_option(option)?;
        } else {
            bail!("Expected key=value or -option, got '{}'", word);
        }
    }

    Ok(request)
}

fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            ' ' | '\t' if !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            _ => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        bail!("Unterminated quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_only() {
        assert_eq!(parse_line("  version ").unwrap().to_string(), "version");
    }

    #[test]
    fn test_parameters_and_options() {
        let request = parse_line("clientlist -uid -away").unwrap();
        assert!(request.has_option("uid"));
        assert!(request.has_option("away"));

        let request = parse_line("use sid=1").unwrap();
        assert_eq!(request.parameter("sid"), Some("1"));
    }

    #[test]
    fn test_quoted_value() {
        let request = parse_line("clientpoke clid=5 msg=\"wake up, now\"").unwrap();
        assert_eq!(request.parameter("msg"), Some("wake up, now"));
        assert_eq!(request.to_string(), "clientpoke clid=5 msg=wake\\sup,\\snow");
    }

    #[test]
    fn test_value_containing_equals() {
        let request = parse_line("gm msg=a=b").unwrap();
        assert_eq!(request.parameter("msg"), Some("a=b"));
    }

    #[test]
    fn test_errors() {
        assert!(parse_line("   ").is_err());
        assert!(parse_line("help clientlist").is_err());
        assert!(parse_line("gm msg=").is_err());
        assert!(parse_line("gm msg=\"open").is_err());
    }
}
