//! C-style escape expansion (§4.2, §6): applied to every token right before
//! dispatch, after the byte-stream parser has already resolved its own
//! quote-level escaping. Grounded on `execute_command()`'s `g_strcompress()`
//! call in `mkapp_parser.c`, extended with `\xHH` per the spec's explicit
//! mention of hex escapes.

/// Expand backslash escapes in a finalized token. An unrecognized `\X`
/// collapses to the bare `X` (the backslash is dropped), matching
/// `g_strcompress`'s behavior rather than treating it as an error. A
/// trailing, unpaired backslash at the end of the token is kept as-is.
pub fn expand(token: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(token.len());
    let mut i = 0;
    while i < token.len() {
        let c = token[i];
        if c != b'\\' {
            out.push(c);
            i += 1;
            continue;
        }
        match token.get(i + 1) {
            None => {
                out.push(b'\\');
                i += 1;
            }
            Some(b'n') => {
                out.push(b'\n');
                i += 2;
            }
            Some(b't') => {
                out.push(b'\t');
                i += 2;
            }
            Some(b'r') => {
                out.push(b'\r');
                i += 2;
            }
            Some(b'b') => {
                out.push(0x08);
                i += 2;
            }
            Some(b'f') => {
                out.push(0x0c);
                i += 2;
            }
            Some(b'v') => {
                out.push(0x0b);
                i += 2;
            }
            Some(b'a') => {
                out.push(0x07);
                i += 2;
            }
            Some(b'\\') => {
                out.push(b'\\');
                i += 2;
            }
            Some(b'\'') => {
                out.push(b'\'');
                i += 2;
            }
            Some(b'"') => {
                out.push(b'"');
                i += 2;
            }
            Some(b'x') => {
                let hex: String = token[i + 2..]
                    .iter()
                    .take(2)
                    .take_while(|b| b.is_ascii_hexdigit())
                    .map(|&b| b as char)
                    .collect();
                if hex.is_empty() {
                    out.push(b'x');
                    i += 2;
                } else {
                    let byte = u8::from_str_radix(&hex, 16).unwrap_or(0);
                    out.push(byte);
                    i += 2 + hex.len();
                }
            }
            Some(&other) => {
                out.push(other);
                i += 2;
            }
        }
    }
    out
}
