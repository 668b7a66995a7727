/// Clean admin-supplied HTML (anime descriptions) using a whitelist.
///
/// Safe tags like <b> and <p> survive; <script>, <iframe> and event
/// attributes are stripped along with script bodies.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Escape user text for inclusion in an HTML fragment.
///
/// Comment bodies are stored as plain text; every HTML-significant
/// character is entity-encoded so nothing the user typed becomes markup.
pub fn escape_text(input: &str) -> String {
    ammonia::clean_text(input)
}
