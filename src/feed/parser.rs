//! XML parsing for Atom-style MRSS feeds
//!
//! Looks for the structure:
//! ```xml
//! <feed>
//!   <entry>
//!     <id>...</id>
//!     <title>...</title>
//!     <link>https://.../master.m3u8</link>   (or <link href="..."/>)
//!   </entry>
//!   ...
//! </feed>
//! ```
//!
//! Only direct children of `entry` are considered. Any entry lacking `id`
//! or `link` fails the whole feed rather than being skipped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use super::PlaylistEntry;
use crate::error::{Result, V2vError};

/// Fields collected for the entry currently being read
#[derive(Debug, Default)]
struct EntryFields {
    id: Option<String>,
    link: Option<String>,
    title: Option<String>,
}

impl EntryFields {
    fn into_entry(self, index: usize) -> Result<PlaylistEntry> {
        let id = non_empty(self.id)
            .ok_or_else(|| V2vError::FeedParse(format!("entry {} is missing <id>", index)))?;
        let link = non_empty(self.link)
            .ok_or_else(|| V2vError::FeedParse(format!("entry {} is missing <link>", index)))?;
        let uri = Url::parse(&link).map_err(|e| {
            V2vError::FeedParse(format!("entry {} has invalid link {:?}: {}", index, link, e))
        })?;

        Ok(PlaylistEntry {
            id,
            uri,
            title: non_empty(self.title),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn href_attribute(e: &BytesStart<'_>) -> Result<Option<String>> {
    let attr = e
        .try_get_attribute("href")
        .map_err(|e| V2vError::FeedParse(e.to_string()))?;
    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|e| V2vError::FeedParse(e.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

/// Parse an MRSS document into playlist entries, in document order.
///
/// A feed without any `entry` is valid and yields an empty list.
pub fn parse_feed(xml: &str) -> Result<Vec<PlaylistEntry>> {
    let mut reader = Reader::from_str(xml);

    // Local names of the currently open elements.
    let mut stack: Vec<String> = Vec::new();
    let mut seen_root = false;

    let mut entries = Vec::new();
    let mut current: Option<EntryFields> = None;
    let mut text_target: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if stack.is_empty() {
                    if seen_root || name != "feed" {
                        return Err(V2vError::FeedParse(format!(
                            "expected a top-level <feed> element, found <{}>",
                            name
                        )));
                    }
                    seen_root = true;
                }

                if stack.len() == 1 && name == "entry" {
                    current = Some(EntryFields::default());
                } else if let (2, Some(fields)) = (stack.len(), current.as_mut()) {
                    match name.as_str() {
                        "id" if fields.id.is_none() => text_target = Some(name.clone()),
                        "title" if fields.title.is_none() => text_target = Some(name.clone()),
                        "link" if fields.link.is_none() => {
                            // An href attribute wins over link text.
                            match href_attribute(&e)? {
                                Some(href) => fields.link = Some(href),
                                None => text_target = Some(name.clone()),
                            }
                        }
                        _ => {}
                    }
                }
                stack.push(name);
            }

            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if stack.is_empty() {
                    if name == "feed" && !seen_root {
                        seen_root = true;
                        continue;
                    }
                    return Err(V2vError::FeedParse(format!(
                        "expected a top-level <feed> element, found <{}/>",
                        name
                    )));
                }
                if let (2, "link", Some(fields)) = (stack.len(), name.as_str(), current.as_mut()) {
                    if fields.link.is_none() {
                        fields.link = href_attribute(&e)?;
                    }
                }
            }

            Ok(Event::End(_)) => {
                let name = stack.pop().unwrap_or_default();
                match (stack.len(), name.as_str()) {
                    (1, "entry") => {
                        if let Some(fields) = current.take() {
                            entries.push(fields.into_entry(entries.len())?);
                        }
                    }
                    (2, _) => text_target = None,
                    _ => {}
                }
            }

            Ok(Event::Text(e)) => {
                if let (Some(target), Some(fields)) = (text_target.as_deref(), current.as_mut()) {
                    let text = e
                        .unescape()
                        .map_err(|e| V2vError::FeedParse(e.to_string()))?;
                    append_field(fields, target, &text);
                }
            }

            Ok(Event::CData(e)) => {
                if let (Some(target), Some(fields)) = (text_target.as_deref(), current.as_mut()) {
                    let text = String::from_utf8_lossy(&e);
                    append_field(fields, target, &text);
                }
            }

            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(V2vError::FeedParse(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(V2vError::FeedParse(format!(
            "unexpected end of document inside <{}>",
            stack.join("/")
        )));
    }
    if !seen_root {
        return Err(V2vError::FeedParse(
            "document has no <feed> element".to_string(),
        ));
    }

    Ok(entries)
}

fn append_field(fields: &mut EntryFields, target: &str, text: &str) {
    let slot = match target {
        "id" => &mut fields.id,
        "title" => &mut fields.title,
        "link" => &mut fields.link,
        _ => return,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}
