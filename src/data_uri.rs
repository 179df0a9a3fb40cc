//! `<prefix>,<base64>` 形式の data URI をデコードする

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataUriError {
    #[error("data URI に ',' がありません")]
    MissingSeparator,

    #[error("base64 のデコードに失敗しました: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("ペイロードが UTF-8 ではありません: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// 最初の ',' で分割し、後半を base64 デコードする
pub fn decode(uri: &str) -> Result<Vec<u8>, DataUriError> {
    let (_, payload) = uri.split_once(',').ok_or(DataUriError::MissingSeparator)?;
    Ok(STANDARD.decode(payload.trim())?)
}

pub fn decode_text(uri: &str) -> Result<String, DataUriError> {
    let bytes = decode(uri)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_json_payload_byte_for_byte() {
        let raw = r#"{"name":"X","attributes":[]}"#;
        let uri = format!("data:application/json;base64,{}", STANDARD.encode(raw));
        assert_eq!(decode_text(&uri).unwrap(), raw);
    }

    #[test]
    fn splits_on_first_comma_only() {
        let uri = format!("data:image/svg+xml;base64,{}", STANDARD.encode("a"));
        assert_eq!(decode(&uri).unwrap(), b"a");
        // ペイロード側の ',' は base64 として不正
        assert!(matches!(
            decode("data:text/plain;base64,YQ==,YQ=="),
            Err(DataUriError::Base64(_))
        ));
    }

    #[test]
    fn missing_separator() {
        assert!(matches!(
            decode("data:application/json;base64"),
            Err(DataUriError::MissingSeparator)
        ));
    }

    #[test]
    fn invalid_base64() {
        assert!(matches!(
            decode("data:application/json;base64,@@@"),
            Err(DataUriError::Base64(_))
        ));
    }

    #[test]
    fn non_utf8_text() {
        let uri = format!("data:;base64,{}", STANDARD.encode([0xff, 0xfe]));
        assert!(decode(&uri).is_ok());
        assert!(matches!(decode_text(&uri), Err(DataUriError::Utf8(_))));
    }
}
