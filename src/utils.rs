use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ValueError;

static _VALID_IP_ADDRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+\.){3}\d+$").unwrap());

static _VALID_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").unwrap());

pub static _VALID_ENDPOINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-.]+(:\d+)?$").unwrap());

/// Check whether bucket name is valid
pub fn check_bucket_name(name: &str) -> Result<bool, ValueError> {
    if name.len() < 3 || name.len() > 63 {
        Err(ValueError::from(
            "Bucket name must be between 3 (min) and 63 (max) characters long.",
        ))?;
    };
    if !_VALID_NAME.is_match(name) {
        Err(ValueError::from(
            "Bucket name can consist only of lowercase letters, numbers, dots (.), and hyphens (-). must begin and end with a letter or number.",
        ))?;
    }
    if name.contains("..") || name.contains(".-") || name.contains("-.") {
        Err(ValueError::from(
            "Bucket name cannot contain two adjacent periods, or a period adjacent to a hyphen.",
        ))?;
    };
    if name.starts_with("xn--") {
        Err(ValueError::from(
            "Bucket name cannot start with the prefix xn--.",
        ))?;
    }
    if name.ends_with("-s3alias") {
        Err(ValueError::from(
            "Bucket name cannot end with the suffix -s3alias.",
        ))?;
    }
    if _VALID_IP_ADDRESS.is_match(name) {
        Err(ValueError::from("Bucket name cannot be an ip address"))?;
    };
    Ok(true)
}

/// uri encode every byte except the unreserved characters: 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
#[inline]
pub fn urlencode(data: &str, safe_slash: bool) -> String {
    let s = urlencoding::encode(data).into_owned();
    if safe_slash {
        s.replace("%2F", "/")
    } else {
        s
    }
}

/// strip the surrounding quotes S3 puts around etags.
#[inline]
pub fn trim_etag(etag: &str) -> String {
    etag.replace('"', "")
}

/// Normalize a `/` separated path: repeated separators collapse, `.` and
/// `..` segments are resolved, and no leading or trailing `/` is kept.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// Normalize a resource scheme prefix: `"minio"`, `"minio:"` and `" minio: "` all become `minio:`.
pub fn normalize_prefix(prefix: &str) -> String {
    let mut head = prefix.trim().replace(':', "").trim().to_owned();
    head.push(':');
    head
}

/// full match of a regex against the whole text
pub fn full_match(regex: &Regex, text: &str) -> bool {
    regex
        .find(text)
        .map_or(false, |m| m.start() == 0 && m.end() == text.len())
}
