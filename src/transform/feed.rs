// src/transform/feed.rs

//! Syndication feed flattening (RSS 2.0, RSS 1.0/RDF and Atom).
//!
//! The output is a stable labeled text block so that only meaningful feed
//! changes show up in diffs:
//!
//! ```text
//! Title: <feed title>
//! Link: <feed link>
//! Description: <feed description>
//! Published: <feed publish date>
//!
//! Item:
//! Title: ...
//! Link: ...
//! Description: ...
//! ```

use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::errors::{Result, SitewatchError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
}

impl Feed {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Title: {}", self.title);
        let _ = writeln!(out, "Link: {}", self.link);
        let _ = writeln!(out, "Description: {}", self.description);
        let _ = writeln!(out, "Published: {}", self.published);
        for item in self.items.iter() {
            out.push_str("\nItem:\n");
            let _ = writeln!(out, "Title: {}", item.title);
            let _ = writeln!(out, "Link: {}", item.link);
            let _ = writeln!(out, "Description: {}", item.description);
        }
        out
    }
}

/// Parse and flatten in one go.
pub fn flatten_feed(body: &[u8]) -> Result<String> {
    Ok(parse_feed(body)?.to_text())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    Content,
    Published,
}

/// Parse `body` into a [`Feed`]. Anything that is not a well formed RSS,
/// RDF or Atom document is an error.
pub fn parse_feed(body: &[u8]) -> Result<Feed> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut item: Option<FeedItem> = None;
    let mut item_content = String::new();
    let mut stack: Vec<String> = Vec::new();
    let mut root_seen = false;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| feed_error(&reader, e))?;
        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                if !root_seen {
                    check_root(&name)?;
                    root_seen = true;
                }
                if name == "item" || name == "entry" {
                    item = Some(FeedItem::default());
                    item_content.clear();
                }
                if name == "link" {
                    take_atom_link(&e, &stack, &mut feed, item.as_mut())?;
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if !root_seen {
                    check_root(&name)?;
                    root_seen = true;
                }
                if name == "link" {
                    take_atom_link(&e, &stack, &mut feed, item.as_mut())?;
                }
            }
            Event::End(_) => {
                if let Some(name) = stack.pop() {
                    if name == "item" || name == "entry" {
                        if let Some(mut done) = item.take() {
                            if done.description.is_empty() {
                                done.description = std::mem::take(&mut item_content);
                            }
                            feed.items.push(done);
                        }
                    }
                }
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                append_text(&stack, &text, &mut feed, item.as_mut(), &mut item_content);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).trim().to_string();
                append_text(&stack, &text, &mut feed, item.as_mut(), &mut item_content);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !root_seen {
        return Err(SitewatchError::Feed("document is empty".to_string()));
    }
    Ok(feed)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn check_root(name: &str) -> Result<()> {
    match name {
        "rss" | "feed" | "RDF" => Ok(()),
        other => Err(SitewatchError::Feed(format!(
            "unsupported root element <{other}>"
        ))),
    }
}

fn feed_error<R>(reader: &Reader<R>, err: quick_xml::Error) -> SitewatchError {
    SitewatchError::Feed(format!(
        "error at position {}: {err}",
        reader.buffer_position()
    ))
}

/// Which field a text node belongs to, judged by its element and the
/// element's parent. Nested elements (`<image><title>`, authors, ...) are
/// ignored.
fn field_for(stack: &[String], in_item: bool) -> Option<Field> {
    let [.., parent, current] = stack else {
        return None;
    };
    let parent_ok = if in_item {
        parent == "item" || parent == "entry"
    } else {
        parent == "channel" || parent == "feed"
    };
    if !parent_ok {
        return None;
    }
    match current.as_str() {
        "title" => Some(Field::Title),
        "link" => Some(Field::Link),
        "description" | "summary" | "subtitle" => Some(Field::Description),
        "content" => Some(Field::Content),
        "pubDate" | "published" | "date" => Some(Field::Published),
        _ => None,
    }
}

fn append_text(
    stack: &[String],
    text: &str,
    feed: &mut Feed,
    item: Option<&mut FeedItem>,
    item_content: &mut String,
) {
    if text.is_empty() {
        return;
    }
    match item {
        Some(item) => match field_for(stack, true) {
            Some(Field::Title) => item.title.push_str(text),
            Some(Field::Link) => item.link.push_str(text),
            Some(Field::Description) => item.description.push_str(text),
            Some(Field::Content) => item_content.push_str(text),
            Some(Field::Published) | None => {}
        },
        None => match field_for(stack, false) {
            Some(Field::Title) => feed.title.push_str(text),
            Some(Field::Link) => feed.link.push_str(text),
            Some(Field::Description) => feed.description.push_str(text),
            Some(Field::Published) => feed.published.push_str(text),
            Some(Field::Content) | None => {}
        },
    }
}

/// Atom links carry the URL in `href`; only `rel="alternate"` (or no rel)
/// counts, and the first one wins.
fn take_atom_link(
    e: &BytesStart<'_>,
    stack: &[String],
    feed: &mut Feed,
    item: Option<&mut FeedItem>,
) -> Result<()> {
    let attr = |key: &str| -> Result<Option<String>> {
        match e
            .try_get_attribute(key)
            .map_err(|err| SitewatchError::Feed(err.to_string()))?
        {
            Some(a) => Ok(Some(
                a.unescape_value()
                    .map_err(|err| SitewatchError::Feed(err.to_string()))?
                    .into_owned(),
            )),
            None => Ok(None),
        }
    };

    let Some(href) = attr("href")? else {
        return Ok(());
    };
    if let Some(rel) = attr("rel")? {
        if rel != "alternate" {
            return Ok(());
        }
    }

    let parent = stack.last().map(String::as_str);
    match item {
        Some(item) if matches!(parent, Some("entry") | Some("item")) => {
            if item.link.is_empty() {
                item.link = href;
            }
        }
        None if matches!(parent, Some("feed") | Some("channel")) => {
            if feed.link.is_empty() {
                feed.link = href;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example News</title>
    <link>https://example.com/</link>
    <description>All the news &amp; more</description>
    <pubDate>Mon, 06 Sep 2021 16:45:00 +0000</pubDate>
    <image><title>ignored</title></image>
    <item>
      <title>First</title>
      <link>https://example.com/1</link>
      <description><![CDATA[<p>one</p>]]></description>
    </item>
    <item>
      <title>Second</title>
      <link>https://example.com/2</link>
      <description>two</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <subtitle>sub</subtitle>
  <link href="https://example.org/feed" rel="self"/>
  <link href="https://example.org/"/>
  <published>2003-12-13T18:30:02Z</published>
  <entry>
    <title>Entry</title>
    <link href="https://example.org/entry"/>
    <author><name>someone</name></author>
    <content>full text</content>
  </entry>
</feed>"#;

    #[test]
    fn rss_is_flattened() {
        let text = flatten_feed(RSS.as_bytes()).unwrap();
        assert_eq!(
            text,
            "Title: Example News\n\
             Link: https://example.com/\n\
             Description: All the news & more\n\
             Published: Mon, 06 Sep 2021 16:45:00 +0000\n\
             \nItem:\nTitle: First\nLink: https://example.com/1\nDescription: <p>one</p>\n\
             \nItem:\nTitle: Second\nLink: https://example.com/2\nDescription: two\n"
        );
    }

    #[test]
    fn atom_links_and_content_fallback() {
        let feed = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(feed.title, "Atom Example");
        assert_eq!(feed.description, "sub");
        assert_eq!(feed.link, "https://example.org/");
        assert_eq!(feed.published, "2003-12-13T18:30:02Z");
        assert_eq!(
            feed.items,
            vec![FeedItem {
                title: "Entry".into(),
                link: "https://example.org/entry".into(),
                description: "full text".into(),
            }]
        );
    }

    #[test]
    fn rdf_items_sit_next_to_channel() {
        let rdf = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
  <channel><title>RDF</title><link>https://rdf.example/</link><description>d</description></channel>
  <item><title>I</title><link>https://rdf.example/i</link><description>x</description></item>
</rdf:RDF>"#;
        let feed = parse_feed(rdf.as_bytes()).unwrap();
        assert_eq!(feed.title, "RDF");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].link, "https://rdf.example/i");
    }

    #[test]
    fn non_feed_documents_are_rejected() {
        assert!(matches!(
            parse_feed(b"<html><body>nope</body></html>"),
            Err(SitewatchError::Feed(_))
        ));
        assert!(matches!(parse_feed(b""), Err(SitewatchError::Feed(_))));
        assert!(matches!(
            parse_feed(b"<rss><channel></rss>"),
            Err(SitewatchError::Feed(_))
        ));
    }
}
