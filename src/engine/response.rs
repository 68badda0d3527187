use std::sync::OnceLock;

use regex::Regex;

// `root:<anything but colon>:<uid>:<gid>:`
const PASSWD_SIGNATURE: &str = r"root:[^:]*:[0-9]+:[0-9]+:";

fn passwd_signature() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PASSWD_SIGNATURE).expect("static passwd signature is valid"))
}

/// Heuristic check for a Unix password file entry for `root`.
///
/// Only the passwd shape is recognized, so bodies of other target files
/// (`win.ini`, `/proc/self/environ`) never pass.
pub fn is_valid_password_content(content: &str) -> bool {
    passwd_signature().is_match(content)
}

#[derive(Clone, Debug)]
pub(in crate::engine) struct ProbeResponse {
    pub(in crate::engine) status: u16,
    pub(in crate::engine) size: usize,
    pub(in crate::engine) content: String,
}

fn response_charset(resp: &reqwest::Response) -> Option<String> {
    let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_ascii_lowercase())
        } else {
            None
        }
    })
}

/// Strict body decoding. Malformed bytes reject the whole body instead of
/// being replaced. Charsets other than ASCII and Latin-1 are read as UTF-8.
fn decode_body(bytes: &[u8], charset: Option<&str>) -> Option<String> {
    match charset {
        Some("iso-8859-1") | Some("latin1") | Some("latin-1") => {
            Some(bytes.iter().map(|&b| b as char).collect())
        }
        Some("us-ascii") | Some("ascii") if !bytes.is_ascii() => None,
        _ => String::from_utf8(bytes.to_vec()).ok(),
    }
}

/// Issues a single GET. Any transport or body error yields `None`.
pub(in crate::engine) async fn fetch(client: &reqwest::Client, url: &str) -> Option<ProbeResponse> {
    let resp = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(_) => return None,
    };
    let status = resp.status().as_u16();
    let charset = response_charset(&resp);
    let bytes = match resp.bytes().await {
        Ok(bytes) => bytes,
        Err(_) => return None,
    };
    let content = decode_body(&bytes, charset.as_deref())?;
    let size = content.len();
    Some(ProbeResponse {
        status,
        size,
        content,
    })
}
