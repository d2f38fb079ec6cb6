use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// RFC 3986 unreserved characters stay literal, everything else is escaped.
// Notably spaces become %20, never '+'.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// canonical_query_string normalizes a raw query string: pairs are decoded,
// re-encoded per RFC 3986, and sorted by encoded key with ties broken by
// encoded value. An absent query canonicalizes to the empty string.
pub fn canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut pairs: Vec<(String, String)> = Vec::new();
    for segment in query.split('&') {
        if segment.is_empty() {
            continue;
        }
        let (key, value) = match segment.split_once('=') {
            Some((key, value)) => (key, value),
            None => (segment, ""),
        };
        pairs.push((
            encode_component(&decode_component(key)),
            encode_component(&decode_component(value)),
        ));
    }
    pairs.sort();

    let encoded: Vec<String> = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    encoded.join("&")
}

// body_hash_hex returns lower-hex SHA-256 of the raw body bytes, or the empty
// string for an empty body.
pub fn body_hash_hex(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }
    hex::encode(message::sha256(body))
}

// build_canonical_string joins the signing components with newlines:
//
//   METHOD \n uriPath \n canonicalQuery \n bodyHashHex \n timestamp \n nonce
pub fn build_canonical_string(
    method: &str,
    uri_path: &str,
    query: &str,
    body: &[u8],
    timestamp: &str,
    nonce: &str,
) -> String {
    [
        method.to_ascii_uppercase(),
        uri_path.to_string(),
        canonical_query_string(query),
        body_hash_hex(body),
        timestamp.to_string(),
        nonce.to_string(),
    ]
    .join("\n")
}

fn decode_component(component: &str) -> String {
    // '+' is accepted as a space on input, per form encoding.
    let component = component.replace('+', " ");
    percent_decode_str(&component).decode_utf8_lossy().into_owned()
}

fn encode_component(component: &str) -> String {
    utf8_percent_encode(component, QUERY_ENCODE).to_string()
}
