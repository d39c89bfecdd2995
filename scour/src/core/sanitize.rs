//! Defensive cleanup of collaborator-produced code.
//!
//! Generators are instructed to return bare code, but models routinely wrap
//! output in markdown fences, prefix a language tag, or sneak in an import.
//! The sandbox rejects anything outside its vocabulary anyway; stripping the
//! common artifacts here avoids burning retry attempts on formatting noise.

/// Strip formatting artifacts and prohibited lines from generated code.
pub fn sanitize_code(raw: &str) -> String {
    let mut code = raw.trim().to_string();

    // Take the first fenced block when the reply starts with one.
    if code.starts_with("```") {
        let parts: Vec<&str> = code.split("```").collect();
        if parts.len() >= 2 {
            code = parts[1].trim().to_string();
        }
    }

    // Drop a leading language tag left over from the fence.
    for tag in ["python", "rust", "text"] {
        let Some(head) = code.get(..tag.len()) else {
            continue;
        };
        if head.eq_ignore_ascii_case(tag) {
            let rest = &code[tag.len()..];
            if rest.is_empty() || rest.starts_with(['\n', '\r']) {
                code = rest.trim().to_string();
                break;
            }
        }
    }

    // Import-like statements are prohibited by the generator contract;
    // filter them rather than failing the whole attempt.
    let lines: Vec<&str> = code
        .lines()
        .filter(|line| {
            let t = line.trim_start();
            !(t.starts_with("import ") || t.starts_with("from ") || t.starts_with("use "))
        })
        .collect();

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_clean_code_through() {
        let code = "df = df.drop_nulls(\"a\")";
        assert_eq!(sanitize_code(code), code);
    }

    #[test]
    fn strips_markdown_fence_and_language_tag() {
        let raw = "```python\ndf = df.copy()\ndf = df.trim(\"name\")\n```";
        assert_eq!(sanitize_code(raw), "df = df.copy()\ndf = df.trim(\"name\")");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\ndf = df.drop_duplicates()\n```";
        assert_eq!(sanitize_code(raw), "df = df.drop_duplicates()");
    }

    #[test]
    fn filters_import_lines() {
        let raw = "import pandas as pd\nfrom os import path\ndf = df.copy()";
        assert_eq!(sanitize_code(raw), "df = df.copy()");
    }

    #[test]
    fn keeps_identifiers_that_merely_start_with_tag_words() {
        // "python_col" is a legitimate identifier, not a language tag.
        let raw = "df = df.rename_column(\"python_col\", \"snake\")";
        assert_eq!(sanitize_code(raw), raw);
    }

    #[test]
    fn empty_reply_sanitizes_to_empty() {
        assert_eq!(sanitize_code("```\n```"), "");
        assert_eq!(sanitize_code("   "), "");
    }
}
