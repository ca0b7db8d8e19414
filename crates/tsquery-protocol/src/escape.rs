//! Escaping of keys, values and options
//!
//! | raw            | escaped |
//! |----------------|---------|
//! | `\`            | `\\`    |
//! | `/`            | `\/`    |
//! | space          | `\s`    |
//! | `\|`           | `\p`    |
//! | bell           | `\a`    |
//! | backspace      | `\b`    |
//! | form feed      | `\f`    |
//! | newline        | `\n`    |
//! | carriage ret.  | `\r`    |
//! | tab            | `\t`    |
//! | vertical tab   | `\v`    |

/// Escape a key, value or option for the wire.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match escaped(c) {
            Some(letter) => {
                out.push('\\');
                out.push(letter);
            }
            None => out.push(c),
        }
    }
    out
}

/// Reverse [`escape`]. Unknown escape sequences are kept as they are.
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some(letter) => match unescaped(letter) {
                Some(raw) => out.push(raw),
                None => {
                    out.push('\\');
                    out.push(letter);
                }
            },
            None => out.push('\\'),
        }
    }

    out
}

fn escaped(c: char) -> Option<char> {
    let letter = match c {
        '\\' => '\\',
        '/' => '/',
        ' ' => 's',
        '|' => 'p',
        '\x07' => 'a',
        '\x08' => 'b',
        '\x0c' => 'f',
        '\n' => 'n',
        '\r' => 'r',
        '\t' => 't',
        '\x0b' => 'v',
        _ => return None,
    };
    Some(letter)
}

fn unescaped(letter: char) -> Option<char> {
    let c = match letter {
        '\\' => '\\',
        '/' => '/',
        's' => ' ',
        'p' => '|',
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0b',
        _ => return None,
    };
    Some(c)
}
