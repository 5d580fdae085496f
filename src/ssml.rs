//! SSML rendering for pitch-shifted words.

use quick_xml::escape::escape;

/// Format a pitch shift the way SSML prosody expects it: `+20`, `0`, `-5`.
pub fn signed_percent(pitch: i32) -> String {
    if pitch > 0 {
        format!("+{}", pitch)
    } else {
        pitch.to_string()
    }
}

/// Wrap one word in a `<prosody>` element shifted by `pitch` percent.
///
/// # Example
/// ```
/// use singsong::ssml::prosody;
///
/// let doc = prosody("star", 20);
/// assert!(doc.contains("<prosody pitch='+20%'>star</prosody>"));
/// ```
pub fn prosody(word: &str, pitch: i32) -> String {
    format!(
        "<speak version='1.0' xml:lang=\"en-US\" xmlns='http://www.w3.org/2001/10/synthesis'>\
         <prosody pitch='{}%'>{}</prosody></speak>",
        signed_percent(pitch),
        escape(word)
    )
}
