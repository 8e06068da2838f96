//! Context block shared by the generator and the validator.

/// Marker appended when the context block is cut.
pub const TRUNCATION_MARKER: &str = "... [TRUNCATED]";

/// Render passages as `[Chunk i]: text`, separated by blank lines, and
/// limit the result to `max_chars` characters plus the truncation marker.
pub fn build_context(chunks: &[String], max_chars: usize) -> String {
    let context = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Chunk {}]: {}", i + 1, chunk))
        .collect::<Vec<_>>()
        .join("\n\n");

    match context.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            tracing::warn!(
                chars = context.chars().count(),
                max_chars,
                "Context too long, truncating"
            );
            format!("{}{}", &context[..cut], TRUNCATION_MARKER)
        }
        None => context,
    }
}
