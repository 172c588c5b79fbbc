//! Minimal pull tokenizer for the OOXML parts inside docx and xlsx packages.
//!
//! Handles elements, attributes, text, CDATA and the predefined and numeric entities.
//! Namespace prefixes are dropped from element and attribute names. Comments,
//! processing instructions and doctype declarations are skipped. A self-closing element
//! yields a `Start` immediately followed by its `End`.

#[derive(Debug, thiserror::Error)]
#[error("Malformed XML at byte {offset}: {reason}")]
pub struct XmlError {
    pub offset: usize,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    pub name: &'a str,
    attrs: Vec<(&'a str, String)>,
}

impl<'a> Element<'a> {
    /// Attribute value by local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent<'a> {
    Start(Element<'a>),
    End(&'a str),
    Text(String),
}

pub struct XmlReader<'a> {
    input: &'a str,
    pos: usize,
    pending_end: Option<&'a str>,
}

impl<'a> XmlReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            pending_end: None,
        }
    }

    fn error(&self, reason: &'static str) -> XmlError {
        XmlError {
            offset: self.pos,
            reason,
        }
    }

    /// Skip past `terminator`, starting at the current position.
    fn skip_past(&mut self, terminator: &str, reason: &'static str) -> Result<(), XmlError> {
        match self.input[self.pos..].find(terminator) {
            Some(idx) => {
                self.pos += idx + terminator.len();
                Ok(())
            }
            None => Err(self.error(reason)),
        }
    }

    fn read_event(&mut self) -> Result<Option<XmlEvent<'a>>, XmlError> {
        if let Some(name) = self.pending_end.take() {
            return Ok(Some(XmlEvent::End(name)));
        }

        loop {
            let input = self.input;
            let rest = &input[self.pos..];
            if rest.is_empty() {
                return Ok(None);
            }

            if !rest.starts_with('<') {
                let end = rest.find('<').unwrap_or(rest.len());
                self.pos += end;
                return Ok(Some(XmlEvent::Text(decode_entities(&rest[..end]))));
            }

            if rest.starts_with("<!--") {
                self.skip_past("-->", "unterminated comment")?;
                continue;
            }

            if let Some(body) = rest.strip_prefix("<![CDATA[") {
                let end = body.find("]]>").ok_or_else(|| self.error("unterminated CDATA"))?;
                self.pos += "<![CDATA[".len() + end + "]]>".len();
                return Ok(Some(XmlEvent::Text(body[..end].to_string())));
            }

            if rest.starts_with("<?") {
                self.skip_past("?>", "unterminated processing instruction")?;
                continue;
            }

            if rest.starts_with("<!") {
                self.skip_past(">", "unterminated declaration")?;
                continue;
            }

            let end = tag_end(rest).ok_or_else(|| self.error("unterminated tag"))?;
            let tag = &rest[1..end];

            if let Some(name) = tag.strip_prefix('/') {
                self.pos += end + 1;
                return Ok(Some(XmlEvent::End(local_name(name.trim()))));
            }

            let (body, self_closing) = match tag.strip_suffix('/') {
                Some(body) => (body, true),
                None => (tag, false),
            };
            let name_end = body
                .find(|c: char| c.is_ascii_whitespace())
                .unwrap_or(body.len());
            let name = local_name(&body[..name_end]);
            if name.is_empty() {
                return Err(self.error("missing element name"));
            }
            let attrs = parse_attributes(&body[name_end..]).map_err(|reason| self.error(reason))?;

            self.pos += end + 1;
            if self_closing {
                self.pending_end = Some(name);
            }
            return Ok(Some(XmlEvent::Start(Element { name, attrs })));
        }
    }
}

impl<'a> Iterator for XmlReader<'a> {
    type Item = Result<XmlEvent<'a>, XmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_event() {
            Ok(event) => event.map(Ok),
            Err(e) => {
                // Stop after the first error.
                self.pos = self.input.len();
                Some(Err(e))
            }
        }
    }
}

/// Index of the `>` closing the tag that starts `s`, ignoring `>` inside quoted values.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(idx),
            (None, _) => {}
        }
    }
    None
}

fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn parse_attributes(mut s: &str) -> Result<Vec<(&str, String)>, &'static str> {
    let mut attrs = Vec::new();

    loop {
        s = s.trim_start();
        if s.is_empty() {
            return Ok(attrs);
        }

        let eq = s.find('=').ok_or("attribute without value")?;
        let name = local_name(s[..eq].trim());
        if name.is_empty() {
            return Err("attribute without name");
        }

        let value_part = s[eq + 1..].trim_start();
        let quote = value_part
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or("unquoted attribute value")?;
        let value_end = value_part[1..]
            .find(quote)
            .ok_or("unterminated attribute value")?;

        attrs.push((name, decode_entities(&value_part[1..1 + value_end])));
        s = &value_part[value_end + 2..];
    }
}

/// Resolve predefined and numeric character references. Unknown references are kept as
/// written.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16).ok())
                    .unwrap_or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
