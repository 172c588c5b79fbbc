//! PDF to text placeholder.
//!
//! Text extraction is not implemented. A PDF converts to a single sentence stating its
//! page count, and callers should treat the output as a degraded conversion.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::ZlibDecoder;
use recast_core::ConversionError;
use regex::bytes::Regex;

const HEADER: &[u8] = b"%PDF-";
/// Some producers put junk before the header; readers look this far for it.
const HEADER_SEARCH_WINDOW: usize = 1024;
const MAX_INFLATED_STREAM: u64 = 64 * 1024 * 1024;

/// Placeholder text for a PDF of `pages` pages.
pub fn placeholder_text(pages: usize) -> String {
    format!(
        "PDF content extraction not fully implemented. File has {} pages.",
        pages
    )
}

/// Counts pages from the page tree, including objects packed into compressed object streams.
pub struct PageCounter {
    object: Regex,
    pages_node: Regex,
    page_object: Regex,
    count_entry: Regex,
    first_entry: Regex,
    stream_start: Regex,
}

struct ObjectStream {
    /// Offset of the first packed object.
    first: usize,
    data: Vec<u8>,
}

/// What the page counter needs to know about one indirect object.
#[derive(Debug, Clone, Copy)]
struct ObjectSummary {
    is_page: bool,
    /// `/Count` of a `/Type /Pages` node.
    tree_count: Option<usize>,
}

impl PageCounter {
    pub fn new() -> Result<Self, ConversionError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                ConversionError::Internal(format!("Failed to compile PDF pattern: {}", e))
            })
        };

        Ok(Self {
            object: compile(r"(?s-u)(\d+)\s+\d+\s+obj\b(.*?)endobj")?,
            pages_node: compile(r"(?-u)/Type\s*/Pages\b")?,
            // `\b` keeps `/Pages` tree nodes out.
            page_object: compile(r"(?-u)/Type\s*/Page\b")?,
            count_entry: compile(r"(?-u)/Count\s+(\d+)")?,
            first_entry: compile(r"(?-u)/First\s+(\d+)")?,
            stream_start: compile(r"(?-u)stream\r?\n")?,
        })
    }

    /// Page count of `data`.
    ///
    /// Objects are keyed by object number, so a later revision appended by an
    /// incremental update replaces the earlier definition. The page tree root carries
    /// the largest `/Count` of any `/Pages` node; without one, distinct `/Type /Page`
    /// objects are counted instead.
    pub fn count(&self, data: &[u8]) -> Result<usize, ConversionError> {
        let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
        if !window.windows(HEADER.len()).any(|w| w == HEADER) {
            return Err(ConversionError::Decode(
                "Not a PDF file: missing %PDF- header".to_string(),
            ));
        }

        let mut objects: HashMap<u64, ObjectSummary> = HashMap::new();
        let mut packed = Vec::new();

        for caps in self.object.captures_iter(data) {
            let (Some(number), Some(body)) = (parse_number(&caps[1]), caps.get(2)) else {
                continue;
            };
            let body = body.as_bytes();
            if let Some(stream) = self.object_stream(body) {
                packed.extend(self.packed_objects(&stream));
            }
            objects.insert(number, self.summarize(body));
        }

        // Objects written directly in the body supersede compressed copies.
        for (number, summary) in packed {
            objects.entry(number).or_insert(summary);
        }

        let tree_count = objects.values().filter_map(|o| o.tree_count).max().unwrap_or(0);
        let pages = objects.values().filter(|o| o.is_page).count();

        match (tree_count, pages) {
            (0, 0) => Err(ConversionError::Decode(
                "Could not determine PDF page count".to_string(),
            )),
            (0, pages) => Ok(pages),
            (count, _) => Ok(count),
        }
    }

    fn summarize(&self, body: &[u8]) -> ObjectSummary {
        // Stream data never holds the object's own dictionary.
        let dict = match self.stream_start.find(body) {
            Some(m) => &body[..m.start()],
            None => body,
        };

        let tree_count = if self.pages_node.is_match(dict) {
            self.count_entry
                .captures(dict)
                .and_then(|caps| parse_number(&caps[1]))
                .map(|n| n as usize)
        } else {
            None
        };

        ObjectSummary {
            is_page: self.page_object.is_match(dict),
            tree_count,
        }
    }

    /// Inflated data of an object whose dictionary marks it as a Flate-compressed
    /// `/Type /ObjStm`.
    fn object_stream(&self, body: &[u8]) -> Option<ObjectStream> {
        let m = self.stream_start.find(body)?;
        let dict = &body[..m.start()];
        if find_first(dict, b"/ObjStm").is_none() || find_first(dict, b"/FlateDecode").is_none() {
            return None;
        }

        let stream = &body[m.end()..];
        let stream = match find_last(stream, b"endstream") {
            Some(end) => &stream[..end],
            None => stream,
        };

        let mut inflated = Vec::new();
        if let Err(e) = ZlibDecoder::new(stream)
            .take(MAX_INFLATED_STREAM)
            .read_to_end(&mut inflated)
        {
            tracing::debug!(error = %e, "Skipping unreadable object stream");
            return None;
        }

        let first = self
            .first_entry
            .captures(dict)
            .and_then(|caps| parse_number(&caps[1]))
            .map_or(0, |n| n as usize);
        Some(ObjectStream { first, data: inflated })
    }

    /// Objects held in an inflated object stream, as `(object number, summary)` pairs.
    /// The stream header before `/First` lists `number offset` pairs.
    fn packed_objects(&self, stream: &ObjectStream) -> Vec<(u64, ObjectSummary)> {
        let data = &stream.data;
        let first = stream.first.min(data.len());

        let header: Vec<u64> = data[..first]
            .split(|b| b.is_ascii_whitespace())
            .filter_map(parse_number)
            .collect();
        let entries: Vec<(u64, usize)> = header
            .chunks_exact(2)
            .map(|pair| (pair[0], first.saturating_add(pair[1] as usize).min(data.len())))
            .collect();

        entries
            .iter()
            .enumerate()
            .map(|(i, &(number, start))| {
                let end = entries
                    .get(i + 1)
                    .map_or(data.len(), |&(_, next)| next)
                    .max(start);
                (number, self.summarize(&data[start..end]))
            })
            .collect()
    }
}

fn parse_number(bytes: &[u8]) -> Option<u64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

fn find_first(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn counter() -> PageCounter {
        PageCounter::new().unwrap()
    }

    #[test]
    fn test_placeholder_text() {
        assert_eq!(
            placeholder_text(3),
            "PDF content extraction not fully implemented. File has 3 pages."
        );
    }

    #[test]
    fn test_counts_page_objects() {
        let pdf = b"%PDF-1.4\n1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
2 0 obj << /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >> endobj\n\
3 0 obj << /Type /Page /Parent 2 0 R >> endobj\n\
4 0 obj << /Type/Page /Parent 2 0 R >> endobj\n%%EOF";
        assert_eq!(counter().count(pdf).unwrap(), 2);
    }

    #[test]
    fn test_uses_page_tree_count() {
        let pdf = b"%PDF-1.7\n2 0 obj << /Type /Pages /Count 7 >> endobj\n%%EOF";
        assert_eq!(counter().count(pdf).unwrap(), 7);
    }

    /// Flate-compressed object stream holding `objects` as `(number, dictionary)` pairs.
    fn object_stream(number: u64, objects: &[(u64, &str)]) -> Vec<u8> {
        let mut header = String::new();
        let mut body = String::new();
        for (packed, dict) in objects {
            header.push_str(&format!("{} {} ", packed, body.len()));
            body.push_str(dict);
            body.push(' ');
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(header.as_bytes()).unwrap();
        encoder.write_all(body.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut out = format!(
            "{} 0 obj << /Type /ObjStm /N {} /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
            number,
            objects.len(),
            header.len(),
            compressed.len()
        )
        .into_bytes();
        out.extend_from_slice(&compressed);
        out.extend_from_slice(b"\nendstream\nendobj\n");
        out
    }

    #[test]
    fn test_counts_pages_in_object_streams() {
        let mut pdf = b"%PDF-1.5\n".to_vec();
        pdf.extend(object_stream(
            5,
            &[
                (2, "<< /Type /Pages /Kids [3 0 R 4 0 R] >>"),
                (3, "<< /Type /Page /Parent 2 0 R >>"),
                (4, "<< /Type /Page /Parent 2 0 R >>"),
            ],
        ));
        pdf.extend_from_slice(b"%%EOF");

        assert_eq!(counter().count(&pdf).unwrap(), 2);
    }

    #[test]
    fn test_page_tree_count_in_object_stream() {
        let mut pdf = b"%PDF-1.5\n".to_vec();
        pdf.extend(object_stream(
            9,
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R >>"),
                (2, "<< /Type /Pages /Kids [3 0 R 4 0 R 5 0 R] /Count 3 >>"),
                (3, "<< /Type /Page /Parent 2 0 R >>"),
            ],
        ));
        pdf.extend_from_slice(b"%%EOF");

        assert_eq!(counter().count(&pdf).unwrap(), 3);
    }

    #[test]
    fn test_incremental_update_does_not_double_count() {
        let pdf = b"%PDF-1.4\n1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n\
3 0 obj << /Type /Page /Parent 2 0 R >> endobj\n\
trailer << /Root 1 0 R >>\n%%EOF\n\
3 0 obj << /Type /Page /Parent 2 0 R /Rotate 90 >> endobj\n\
trailer << /Root 1 0 R /Prev 9 >>\n%%EOF\n";
        assert_eq!(counter().count(pdf).unwrap(), 1);
    }

    #[test]
    fn test_revised_pages_replace_earlier_definitions() {
        // Second revision deletes a page: the tree node is rewritten with a smaller count.
        let pdf = b"%PDF-1.4\n2 0 obj << /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >> endobj\n\
3 0 obj << /Type /Page /Parent 2 0 R >> endobj\n\
4 0 obj << /Type /Page /Parent 2 0 R >> endobj\n%%EOF\n\
2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n%%EOF\n";
        assert_eq!(counter().count(pdf).unwrap(), 1);

        // Without a tree count, a page object rewritten in place is still one page.
        let pdf = b"%PDF-1.4\n3 0 obj << /Type /Page >> endobj\n%%EOF\n\
3 0 obj << /Type /Page /Rotate 90 >> endobj\n%%EOF\n";
        assert_eq!(counter().count(pdf).unwrap(), 1);
    }

    #[test]
    fn test_outline_count_is_ignored() {
        let pdf = b"%PDF-1.4\n2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n\
3 0 obj << /Type /Page /Parent 2 0 R >> endobj\n\
6 0 obj << /Type /Outlines /Count 12 >> endobj\n%%EOF";
        assert_eq!(counter().count(pdf).unwrap(), 1);
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = counter().count(b"hello world").unwrap_err();
        assert_eq!(err.kind(), recast_core::ConversionErrorKind::DecodeFailure);
    }

    #[test]
    fn test_no_page_information() {
        let err = counter().count(b"%PDF-1.4\n%%EOF").unwrap_err();
        assert_eq!(err.kind(), recast_core::ConversionErrorKind::DecodeFailure);
    }
}
