use std::sync::LazyLock;

use regex::{Captures, Regex};

static HIDDEN_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"style="([^"]*?)display:\s*none;?([^"]*?)""#).unwrap());
static EMPTY_STYLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\s*style="""#).unwrap());

/// Drops the first `display: none` declaration from every inline style,
/// then removes style attributes left empty.
pub fn strip_hidden_styles(html: &str) -> String {
    let revealed = HIDDEN_STYLE.replace_all(html, |caps: &Captures| {
        let style = format!(r#"style="{}{}""#, &caps[1], &caps[2]);
        if style == r#"style="""# {
            String::new()
        } else {
            style
        }
    });
    EMPTY_STYLE.replace_all(&revealed, "").into_owned()
}
