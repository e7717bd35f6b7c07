//! Shareable links carrying the whole guest list.
//!
//! The payload is the stored JSON document, base64 encoded with the URL-safe
//! alphabet and no padding, passed as the `data` query parameter.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use thiserror::Error;
use tracing::info;

use crate::contact::{assign_missing_ids, Contact};
use crate::store::{ContactStore, StoreError};

pub const SHARE_PATH: &str = "/options";
pub const DATA_PARAM: &str = "data";

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("link has no `{DATA_PARAM}` parameter")]
    MissingData,
    #[error("shared data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("shared data is not UTF-8 text")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("shared data is not a contact list: {0}")]
    Json(#[from] serde_json::Error),
    #[error("shared data contains no contacts")]
    NoContacts,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn encode_payload(blob: &str) -> String {
    URL_SAFE_NO_PAD.encode(blob.as_bytes())
}

pub fn encode_link(base_url: &str, blob: &str) -> String {
    format!(
        "{}{}?{}={}",
        base_url.trim_end_matches('/'),
        SHARE_PATH,
        DATA_PARAM,
        encode_payload(blob)
    )
}

/// Pull the `data` value out of a link. Input without a query string is taken
/// to be the bare payload.
pub fn extract_payload(input: &str) -> Result<&str, ShareError> {
    let input = input.trim();
    let Some((_, query)) = input.split_once('?') else {
        return if input.is_empty() {
            Err(ShareError::MissingData)
        } else {
            Ok(input)
        };
    };
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == DATA_PARAM)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .ok_or(ShareError::MissingData)
}

/// Decode a link or bare payload into contacts. Records without ids get new ones.
pub fn decode_payload(input: &str) -> Result<Vec<Contact>, ShareError> {
    let payload = extract_payload(input)?;
    // Some channels turn the URL-safe characters back into the standard ones.
    let normalized: String = payload
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_LENIENT.decode(normalized.as_bytes())?;
    let text = String::from_utf8(bytes)?;
    let mut contacts: Vec<Contact> = serde_json::from_str(&text)?;
    if contacts.is_empty() {
        return Err(ShareError::NoContacts);
    }
    assign_missing_ids(&mut contacts);
    Ok(contacts)
}

/// Replace the stored list with the one carried by a share link. Nothing is
/// written unless the whole payload decodes.
pub fn import_link(store: &mut dyn ContactStore, input: &str) -> Result<usize, ShareError> {
    let contacts = decode_payload(input)?;
    store.replace_all(&contacts)?;
    info!(count = contacts.len(), "imported shared contact list");
    Ok(contacts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_contacts;
    use crate::store::{MemoryKv, SlotStore};

    #[test]
    fn link_roundtrip_reproduces_collection() {
        let mut contacts = parse_contacts("김철수,010-1234-5678,5,가족\nBob,555,,work").unwrap();
        contacts[1].invited = Some(true);
        let blob = serde_json::to_string(&contacts).unwrap();

        let link = encode_link("https://guests.example/", &blob);
        assert!(link.starts_with("https://guests.example/options?data="));
        let payload = extract_payload(&link).unwrap();
        assert!(!payload.contains('+') && !payload.contains('/') && !payload.ends_with('='));

        assert_eq!(decode_payload(&link).unwrap(), contacts);
        assert_eq!(decode_payload(payload).unwrap(), contacts);
    }

    #[test]
    fn padded_payload_is_accepted() {
        let blob = r#"[{"name":"A","phone":"1","contact":"","intimacy":"","group":""}]"#;
        let padded = base64::engine::general_purpose::URL_SAFE.encode(blob);
        let contacts = decode_payload(&padded).unwrap();
        assert_eq!(contacts[0].name, "A");
        assert!(!contacts[0].id.is_nil());
    }

    #[test]
    fn extract_finds_data_among_params() {
        assert_eq!(
            extract_payload("http://x/options?lang=ko&data=abc#top").unwrap(),
            "abc"
        );
        assert!(matches!(
            extract_payload("http://x/options?lang=ko"),
            Err(ShareError::MissingData)
        ));
        assert!(matches!(extract_payload("  "), Err(ShareError::MissingData)));
    }

    #[test]
    fn import_replaces_store_only_on_success() {
        let mut store = SlotStore::new(MemoryKv::new());
        store.replace_all(&parse_contacts("Old,1").unwrap()).unwrap();
        let before = store.raw().unwrap();

        assert!(import_link(&mut store, "http://x/options?data=!!!").is_err());
        assert_eq!(store.raw().unwrap(), before);

        let shared = parse_contacts("New,2,3,work\nOther,3").unwrap();
        let link = encode_link("http://x", &serde_json::to_string(&shared).unwrap());
        assert_eq!(import_link(&mut store, &link).unwrap(), 2);
        assert_eq!(store.load().unwrap(), shared);
    }

    #[test]
    fn bad_payloads_are_rejected() {
        assert!(matches!(decode_payload("!!!"), Err(ShareError::Base64(_))));
        assert!(matches!(
            decode_payload(&encode_payload("{}")),
            Err(ShareError::Json(_))
        ));
        assert!(matches!(
            decode_payload(&encode_payload("[]")),
            Err(ShareError::NoContacts)
        ));
    }
}
