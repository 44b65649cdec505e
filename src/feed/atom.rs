//! Atom 1.0 rendering of the course feed.
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use crate::config;
use crate::model::FeedRow;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn text_element<W: std::io::Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn link<W: std::io::Write>(writer: &mut Writer<W>, href: &str, rel: Option<&str>) -> Result<()> {
    let mut elem = BytesStart::new("link");
    elem.push_attribute(("href", href));
    if let Some(rel) = rel {
        elem.push_attribute(("rel", rel));
    }
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

/// HTML summary: the thumbnail (when known) followed by the description.
pub fn summary_html(row: &FeedRow) -> String {
    let description = format!("<p>{}</p>", escape(row.description.as_str()));
    match &row.thumbnail {
        Some(src) => format!(
            "<img src=\"{}\" alt=\"{}\"/>{}",
            escape(src.as_str()),
            escape(row.title.as_str()),
            description
        ),
        None => description,
    }
}

fn write_entry<W: std::io::Write>(writer: &mut Writer<W>, row: &FeedRow) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("entry")))?;
    text_element(writer, "id", &row.id)?;
    text_element(writer, "title", &row.title)?;
    for name in &row.authors {
        writer.write_event(Event::Start(BytesStart::new("author")))?;
        text_element(writer, "name", name)?;
        writer.write_event(Event::End(BytesEnd::new("author")))?;
    }
    link(writer, &row.url, None)?;

    let mut summary = BytesStart::new("summary");
    summary.push_attribute(("type", "html"));
    writer.write_event(Event::Start(summary))?;
    writer.write_event(Event::Text(BytesText::new(&summary_html(row))))?;
    writer.write_event(Event::End(BytesEnd::new("summary")))?;

    let published = rfc3339(row.published_at);
    text_element(writer, "published", &published)?;
    text_element(writer, "updated", &published)?;
    writer.write_event(Event::End(BytesEnd::new("entry")))?;
    Ok(())
}

/// Render rows in the order given. `updated` is the feed-level timestamp and
/// matches the response `Last-Modified`.
pub fn render(feed: &config::Feed, rows: &[FeedRow], updated: DateTime<Utc>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("feed");
    root.push_attribute(("xmlns", ATOM_NS));
    writer.write_event(Event::Start(root))?;
    text_element(&mut writer, "id", &feed.id)?;
    text_element(&mut writer, "title", &feed.title)?;
    text_element(&mut writer, "updated", &rfc3339(updated))?;
    link(&mut writer, &feed.alternate_link, Some("alternate"))?;
    link(&mut writer, &feed.self_link, Some("self"))?;
    for row in rows {
        write_entry(&mut writer, row).with_context(|| format!("failed to write entry {}", row.id))?;
    }
    writer.write_event(Event::End(BytesEnd::new("feed")))?;

    String::from_utf8(writer.into_inner().into_inner()).context("feed is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> FeedRow {
        FeedRow {
            id: "urn:li:lyndaCourse:42".into(),
            title: "Rust & You".into(),
            description: "Learn <fast>".into(),
            url: "https://www.linkedin.com/learning/rust".into(),
            thumbnail: Some("https://media/t.png?a=1&b=2".into()),
            published_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            authors: vec!["Ada Lovelace".into(), "Grace Hopper".into()],
        }
    }

    #[test]
    fn summary_escapes_markup() {
        let html = summary_html(&row());
        assert_eq!(
            html,
            "<img src=\"https://media/t.png?a=1&amp;b=2\" alt=\"Rust &amp; You\"/><p>Learn &lt;fast&gt;</p>"
        );

        let mut no_thumb = row();
        no_thumb.thumbnail = None;
        assert_eq!(summary_html(&no_thumb), "<p>Learn &lt;fast&gt;</p>");
    }

    #[test]
    fn renders_feed_and_entries() {
        let feed = config::Feed::default();
        let updated = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let xml = render(&feed, &[row()], updated).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<feed xmlns=\"http://www.w3.org/2005/Atom\">"));
        assert!(xml.contains("<title>LinkedIn Learning - New Courses</title>"));
        assert!(xml.contains("<updated>2023-11-14T22:13:20Z</updated>"));
        assert!(xml.contains("<link href=\"https://linkedin.com/learning\" rel=\"alternate\"/>"));
        assert!(xml.contains("rel=\"self\"/>"));
        assert!(xml.contains("<id>urn:li:lyndaCourse:42</id>"));
        assert!(xml.contains("<title>Rust &amp; You</title>"));
        assert!(xml.contains("<name>Ada Lovelace</name>"));
        assert!(xml.contains("<name>Grace Hopper</name>"));
        assert!(xml.contains("<link href=\"https://www.linkedin.com/learning/rust\"/>"));
        assert!(xml.contains("<summary type=\"html\">"));
        // summary HTML is escaped once more as XML text
        assert!(xml.contains("&lt;p&gt;Learn &amp;lt;fast&amp;gt;&lt;/p&gt;"));
        assert!(xml.contains("<published>2023-11-14T22:13:20Z</published>"));
    }

    #[test]
    fn empty_feed_has_no_entries() {
        let xml = render(&config::Feed::default(), &[], Utc::now()).unwrap();
        assert!(!xml.contains("<entry>"));
        assert!(xml.trim_end().ends_with("</feed>"));
    }
}
