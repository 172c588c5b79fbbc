//! Plain-text conversions and the HTML/CSV writers shared by the document converters.

/// Wrap `body` in the minimal HTML document every document conversion emits.
pub fn html_document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"UTF-8\">\n    <title>Converted Document</title>\n</head>\n<body>\n    {}\n</body>\n</html>",
        body
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Always-quoted CSV field.
pub fn quote_csv(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// CSV field, quoted only when it contains a delimiter, quote or line break.
pub fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        quote_csv(field)
    } else {
        field.to_string()
    }
}

pub fn txt_to_html(text: &str) -> String {
    html_document(&format!("<pre>{}</pre>", escape_html(text)))
}

/// One quoted single-column row per line.
pub fn txt_to_csv(text: &str) -> String {
    text.split('\n')
        .map(|line| quote_csv(line.strip_suffix('\r').unwrap_or(line)))
        .collect::<Vec<_>>()
        .join("\n")
}
