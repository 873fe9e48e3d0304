//! Base64url (RFC 4648 Section 5) without padding.
//!
//! Only what the `HTTP2-Settings` upgrade header needs: the url-safe
//! alphabet, no `=` padding on either side.

const BASE64URL_TABLE: [u8; 64] = [
    b'A', b'B', b'C', b'D', b'E', b'F', b'G', b'H', //
    b'I', b'J', b'K', b'L', b'M', b'N', b'O', b'P', //
    b'Q', b'R', b'S', b'T', b'U', b'V', b'W', b'X', //
    b'Y', b'Z', b'a', b'b', b'c', b'd', b'e', b'f', //
    b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', //
    b'o', b'p', b'q', b'r', b's', b't', b'u', b'v', //
    b'w', b'x', b'y', b'z', b'0', b'1', b'2', b'3', //
    b'4', b'5', b'6', b'7', b'8', b'9', b'-', b'_',
];

fn decode_symbol(c: u8) -> Option<u32> {
    match c {
        b'A'..=b'Z' => Some((c - b'A') as u32),
        b'a'..=b'z' => Some((c - b'a' + 26) as u32),
        b'0'..=b'9' => Some((c - b'0' + 52) as u32),
        b'-' => Some(62),
        b'_' => Some(63),
        _ => None,
    }
}

/// Decode an unpadded base64url string. Returns None on any character
/// outside the alphabet or an impossible length (4n+1).
pub fn decode(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    if bytes.len() % 4 == 1 {
        return None;
    }

    let mut output = Vec::with_capacity(bytes.len() * 3 / 4);
    for chunk in bytes.chunks(4) {
        let mut acc: u32 = 0;
        for &c in chunk {
            acc = (acc << 6) | decode_symbol(c)?;
        }
        match chunk.len() {
            4 => {
                output.push((acc >> 16) as u8);
                output.push((acc >> 8) as u8);
                output.push(acc as u8);
            }
            3 => {
                acc <<= 6;
                output.push((acc >> 16) as u8);
                output.push((acc >> 8) as u8);
            }
            2 => {
                acc <<= 12;
                output.push((acc >> 16) as u8);
            }
            _ => unreachable!(),
        }
    }
    Some(output)
}

/// Encode bytes as unpadded base64url.
pub fn encode(input: &[u8]) -> String {
    let mut output = Vec::with_capacity(input.len().div_ceil(3) * 4);

    for chunk in input.chunks(3) {
        output.push(BASE64URL_TABLE[((chunk[0] >> 2) & 0x3f) as usize]);
        match chunk.len() {
            3 => {
                output.push(
                    BASE64URL_TABLE[(((chunk[0] & 0x3) << 4) | (chunk[1] >> 4)) as usize],
                );
                output.push(
                    BASE64URL_TABLE[(((chunk[1] & 0xf) << 2) | (chunk[2] >> 6)) as usize],
                );
                output.push(BASE64URL_TABLE[(chunk[2] & 0x3f) as usize]);
            }
            2 => {
                output.push(
                    BASE64URL_TABLE[(((chunk[0] & 0x3) << 4) | (chunk[1] >> 4)) as usize],
                );
                output.push(BASE64URL_TABLE[((chunk[1] & 0xf) << 2) as usize]);
            }
            _ => {
                output.push(BASE64URL_TABLE[((chunk[0] & 0x3) << 4) as usize]);
            }
        }
    }

    // Alphabet output is always ASCII
    String::from_utf8(output).unwrap_or_default()
}
