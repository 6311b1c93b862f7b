use std::borrow::Cow;

const ELLIPSIS: &str = "…";

/// Cuts `content` to its first `max_length` characters, marking the cut with an ellipsis.
pub(crate) fn truncate(content: &str, max_length: usize) -> Cow<'_, str> {
    match content.char_indices().nth(max_length) {
        None => Cow::Borrowed(content),
        Some((end, _)) => Cow::Owned(format!("{}{}", &content[..end], ELLIPSIS)),
    }
}
