//! Decoding of escape sequences in text sent to a terminal

use std::iter::Peekable;
use std::str::Chars;

/// Turn literal escapes (`\n`, `\x03`, `\u001b`, ...) into the bytes they name.
/// Unknown or malformed escapes are kept as written.
pub fn decode(input: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            push_char(&mut out, c);
            continue;
        }
        let Some(&next) = chars.peek() else {
            out.push(b'\\');
            break;
        };
        let simple = match next {
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'e' => Some(0x1b),
            '0' => Some(0),
            '\\' => Some(b'\\'),
            _ => None,
        };
        if let Some(byte) = simple {
            chars.next();
            out.push(byte);
            continue;
        }

        match next {
            'x' | 'u' => {
                chars.next();
                let width = if next == 'x' { 2 } else { 4 };
                let digits = take_hex(&mut chars, width);
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten();
                match (next, decoded) {
                    ('x', Some(byte)) => out.push(byte as u8),
                    ('u', Some(code)) => match char::from_u32(code) {
                        Some(ch) => push_char(&mut out, ch),
                        None => push_literal(&mut out, next, &digits),
                    },
                    _ => push_literal(&mut out, next, &digits),
                }
            }
            _ => out.push(b'\\'),
        }
    }

    out
}

/// Up to `n` hex digits
fn take_hex(chars: &mut Peekable<Chars<'_>>, n: usize) -> String {
    let mut digits = String::with_capacity(n);
    while digits.len() < n {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    digits
}

fn push_literal(out: &mut Vec<u8>, letter: char, digits: &str) {
    out.push(b'\\');
    push_char(out, letter);
    out.extend_from_slice(digits.as_bytes());
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
