//! Minimal HTTP request parsing and the status page.
//!
//! Just enough of HTTP for one form: `GET /?power_level=<n>`. Percent
//! decoding covers only the escapes the form can produce (`+`, `%3F`,
//! `%21`); anything else passes through verbatim.

use std::collections::HashMap;

/// Decode the small fixed escape set used by the form.
fn decode_escapes(s: &str) -> String {
    s.replace('+', " ").replace("%3F", "?").replace("%21", "!")
}

/// Extract the query parameters from a raw request.
///
/// Returns `Some(map)` only when the request line carries a `?` query
/// string with content. A bare `GET /`, a static-asset path, or an
/// unparseable request all yield `None`; the caller answers those with
/// the status page and no side effect.
pub fn parse_query(raw: &[u8]) -> Option<HashMap<String, String>> {
    let text = std::str::from_utf8(raw).ok()?;
    let line = text.lines().next()?;
    let mut words = line.split_whitespace();
    if words.next()? != "GET" {
        return None;
    }
    let target = words.next()?;
    let qs = target.strip_prefix('/')?.strip_prefix('?')?;
    if qs.is_empty() {
        return None;
    }

    let mut params = HashMap::new();
    for pair in qs.split('&') {
        let mut halves = pair.splitn(2, '=');
        let key = decode_escapes(halves.next().unwrap_or(""));
        let value = decode_escapes(halves.next().unwrap_or(""));
        params.insert(key, value);
    }
    Some(params)
}

/// Build the complete response: status line, headers, and the power
/// level form showing the current value at one decimal place.
pub fn build_page(device_id: &str, power_level: f32) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html\r\n\
         Connection: close\r\n\
         \r\n\
         <html>\n\
         <head>\n\
         <title>{device_id} Web Server</title>\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <style>\n\
         html {{font-family: Helvetica; display:inline-block; margin: 0px auto; text-align: center;}}\n\
         h1 {{color: #0F3376; padding: 2vh;}}\n\
         p {{font-size: 1.5rem;}}\n\
         </style>\n\
         </head>\n\
         <body>\n\
         <h1>{device_id} Web Server</h1>\n\
         <form>\n\
         <p>\n\
         Power Level<input name=\"power_level\" type=\"text\" value=\"{power_level:.1}\"/>\n\
         </p>\n\
         <p>\n\
         <input type=\"submit\" value=\"Update\" />\n\
         </p>\n\
         </form>\n\
         </body></html>"
    )
}
