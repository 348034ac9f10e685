/// Decode raw source bytes, honoring a UTF-8 or UTF-16 BOM when present.
/// Invalid sequences are replaced, never rejected.
pub(crate) fn decode_bytes(bytes: &[u8]) -> String {
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = encoding.name(), "replaced invalid byte sequences");
    }
    text.into_owned()
}
