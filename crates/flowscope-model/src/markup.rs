//! Inline emphasis markup embedded in rule/label strings.
//!
//! Document text may carry `<b>...</b>` spans. The contract is defined once
//! here: bold delimiters map to the target format's emphasis syntax and are
//! never passed through raw. A dangling open tag or stray close tag is
//! stripped, keeping the text between.

/// Replace `<b>...</b>` spans with the given delimiters.
pub fn render_bold(text: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        match rest.find("<b>") {
            None => {
                out.push_str(&rest.replace("</b>", ""));
                break;
            }
            Some(i) => {
                out.push_str(&rest[..i]);
                let after = &rest[i + 3..];
                match after.find("</b>") {
                    Some(j) => {
                        out.push_str(open);
                        out.push_str(&after[..j].replace("<b>", ""));
                        out.push_str(close);
                        rest = &after[j + 4..];
                    }
                    None => {
                        out.push_str(&after.replace("<b>", ""));
                        break;
                    }
                }
            }
        }
    }
    out
}

/// Bold spans become markdown `**` emphasis.
pub fn bold_to_markdown(text: &str) -> String {
    render_bold(text, "**", "**")
}

/// Bold spans are removed, keeping their text.
pub fn strip_bold(text: &str) -> String {
    render_bold(text, "", "")
}
