//! Style token merging

/// Placeholder meaning "no style"
pub const NO_STYLE: &str = "_";

/// Merge a style fragment into an accumulated style.
///
/// An empty or `_` side yields the other side. Otherwise the first `*` in
/// `acc` is replaced by `fragment`; with no `*`, `fragment` replaces `acc`.
pub fn merge_styles(acc: &str, fragment: &str) -> String {
    if acc.is_empty() || acc == NO_STYLE {
        return fragment.to_string();
    }
    if fragment.is_empty() || fragment == NO_STYLE {
        return acc.to_string();
    }
    match acc.find('*') {
        Some(pos) => format!("{}{}{}", &acc[..pos], fragment, &acc[pos + 1..]),
        None => fragment.to_string(),
    }
}
