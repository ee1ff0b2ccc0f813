//! Tests for message content codecs.

use super::*;

#[test]
fn test_text_codec_round_trip() {
    let codec = TextCodec;
    let content = Bytes::from("hello queue");

    let encoded = codec.encode(&content).unwrap();
    assert_eq!(encoded, "hello queue");

    let decoded = codec.decode(&encoded).unwrap();
    assert_eq!(decoded, content);
}

#[test]
fn test_text_codec_rejects_non_utf8() {
    let codec = TextCodec;
    let content = Bytes::from_static(&[0xff, 0xfe, 0x00]);

    let error = codec.encode(&content).unwrap_err();
    assert_eq!(error, EncodingError::NotText);
}

#[test]
fn test_text_codec_accepts_unicode() {
    let codec = TextCodec;
    let content = Bytes::from("メッセージ 😀");

    let encoded = codec.encode(&content).unwrap();
    assert_eq!(codec.decode(&encoded).unwrap(), content);
}

#[test]
fn test_base64_codec_round_trip() {
    let codec = Base64Codec;
    let content = Bytes::from_static(&[0x00, 0xff, 0x10, 0x80]);

    let encoded = codec.encode(&content).unwrap();
    // Wire form must be plain ASCII regardless of payload bytes
    assert!(encoded.is_ascii());

    let decoded = codec.decode(&encoded).unwrap();
    assert_eq!(decoded, content);
}

#[test]
fn test_base64_codec_rejects_malformed_text() {
    let codec = Base64Codec;

    let error = codec.decode("not valid base64!!!").unwrap_err();
    assert!(matches!(error, EncodingError::InvalidBase64 { .. }));
}

#[test]
fn test_base64_codec_empty_payload() {
    let codec = Base64Codec;
    let content = Bytes::new();

    let encoded = codec.encode(&content).unwrap();
    assert_eq!(encoded, "");
    assert_eq!(codec.decode(&encoded).unwrap(), content);
}
