/// Turn raw model markdown into copy-paste-ready plain text: emphasis,
/// heading, and inline-code markers are stripped, markdown bullets become a
/// plain bullet glyph, and leftover bracketed placeholders are dropped.
pub fn strip_markdown(input: &str) -> String {
    let mut out = Vec::with_capacity(input.lines().count());

    for line in input.lines() {
        let mut line = line.to_string();

        // Heading markers: "## Title" -> "Title"
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            let stripped = trimmed.trim_start_matches('#').trim_start();
            line = stripped.to_string();
        }

        // Markdown bullets: "- item" / "* item" -> "• item"
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            let indent_len = line.len() - trimmed.len();
            line = format!("{}• {}", &line[..indent_len], rest);
        }

        // Emphasis and inline-code markers
        line = line.replace("**", "").replace("__", "").replace(['*', '`'], "");

        // Residual "[label]" placeholders
        line = remove_bracketed(&line);

        out.push(line);
    }

    out.join("\n").trim().to_string()
}

/// Drop single-line `[...]` spans, keeping surrounding text.
fn remove_bracketed(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '[' {
            // Scan ahead for a closing bracket; if none, keep the literal '['.
            let mut consumed = String::new();
            let mut closed = false;
            for inner in chars.by_ref() {
                if inner == ']' {
                    closed = true;
                    break;
                }
                consumed.push(inner);
            }
            if !closed {
                result.push('[');
                result.push_str(&consumed);
            }
        } else {
            result.push(c);
        }
    }

    result
}
