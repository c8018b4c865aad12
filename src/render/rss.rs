//! RSS 2.0 redistribution feeds: `feed.xml` with every collected article and
//! `feed-<slug>.xml` per source feed.
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use super::{format_rfc822, sort_newest_first, RenderError};
use crate::report::{Article, CollectionReport, Published};
use crate::util::{atomic_write, slugify, strip_control_chars};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const RSS_MIME: &str = "application/rss+xml";

/// Channel-level fields of one feed document.
struct Channel<'a> {
    title: String,
    link: String,
    description: String,
    built_at: DateTime<Utc>,
    generator: &'a str,
}

/// An item plus the feed it came from (master feed only).
struct Item<'a> {
    article: &'a Article,
    source: Option<(&'a str, &'a str)>,
}

/// Site identity stamped on every channel.
#[derive(Debug, Clone, Copy)]
pub struct Site<'a> {
    pub title: &'a str,
    /// Master channel description.
    pub description: &'a str,
    /// Public URL the feed files are served under.
    pub base_url: &'a str,
}

/// File name of a source feed's RSS document.
pub fn feed_file_name(feed_name: &str) -> String {
    format!("feed-{}.xml", slugify(feed_name))
}

fn trim_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Every article of every feed, once each, tagged with its source.
///
/// `now` stands in for article dates that are present but unparseable.
pub fn render_master_feed(
    report: &CollectionReport,
    site: &Site<'_>,
    now: DateTime<Utc>,
) -> Result<String, RenderError> {
    let mut items: Vec<Item<'_>> = report
        .feeds
        .iter()
        .flat_map(|(name, feed)| {
            feed.articles().iter().map(move |article| Item {
                article,
                source: Some((name, feed.url.as_str())),
            })
        })
        .collect();
    sort_newest_first(&mut items, |item| item.article);

    let generator = format!("{} RSS Generator", site.title);
    let channel = Channel {
        title: format!("{} - All Articles", site.title),
        link: format!("{}/feed.xml", trim_base(site.base_url)),
        description: site.description.to_string(),
        built_at: report.metadata.collected_at,
        generator: &generator,
    };
    write_document(&channel, &items, now)
}

/// The articles of a single feed, without `source` elements.
pub fn render_feed(
    report: &CollectionReport,
    feed_name: &str,
    site: &Site<'_>,
    now: DateTime<Utc>,
) -> Result<String, RenderError> {
    let mut items: Vec<Item<'_>> = report
        .feeds
        .get(feed_name)
        .map(|feed| feed.articles())
        .unwrap_or_default()
        .iter()
        .map(|article| Item {
            article,
            source: None,
        })
        .collect();
    sort_newest_first(&mut items, |item| item.article);

    let generator = format!("{} RSS Generator", site.title);
    let channel = Channel {
        title: format!("{} - {}", site.title, feed_name),
        link: format!("{}/{}", trim_base(site.base_url), feed_file_name(feed_name)),
        description: format!("Articles from {}", feed_name),
        built_at: report.metadata.collected_at,
        generator: &generator,
    };
    write_document(&channel, &items, now)
}

/// Writes `feed.xml` and one `feed-<slug>.xml` per feed (alphabetical) into
/// `out_dir`. Returns the written paths.
pub fn write_feeds(
    report: &CollectionReport,
    out_dir: &Path,
    site: &Site<'_>,
) -> Result<Vec<PathBuf>, RenderError> {
    let now = Utc::now();
    let mut written = Vec::new();

    let mut write = |file_name: String, xml: String| -> Result<(), RenderError> {
        let path = out_dir.join(file_name);
        atomic_write(&path, xml.as_bytes()).map_err(|e| RenderError::Write {
            path: path.clone(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "Wrote RSS feed");
        written.push(path);
        Ok(())
    };

    write(
        "feed.xml".to_string(),
        render_master_feed(report, site, now)?,
    )?;
    for (name, _) in report.feeds.iter_sorted() {
        write(
            feed_file_name(name),
            render_feed(report, name, site, now)?,
        )?;
    }

    Ok(written)
}

/// RFC 822 publication date, or `None` when the article has no date at all.
fn pub_date(published: &Published, now: DateTime<Utc>) -> Option<String> {
    match published {
        Published::At { time, .. } => Some(format_rfc822(time.with_timezone(&Utc))),
        Published::Unknown => None,
        Published::Raw(raw) if raw.trim().is_empty() => None,
        Published::Raw(raw) => {
            tracing::debug!(published = %raw, "Unparseable article date, using current time");
            Some(format_rfc822(now))
        }
    }
}

/// Stable item identifier: the link when there is one, otherwise a digest of
/// the title and date. The flag says whether it is a permalink.
fn guid(article: &Article) -> (String, bool) {
    if !article.link.is_empty() {
        return (article.link.clone(), true);
    }
    let mut hasher = Sha256::new();
    hasher.update(article.title.as_bytes());
    hasher.update(article.published.to_string().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    (hex, false)
}

fn xml_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Xml(e.to_string())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'_>,
    text: &str,
) -> Result<(), RenderError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(&strip_control_chars(text))))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

fn write_document(
    channel: &Channel<'_>,
    items: &[Item<'_>],
    now: DateTime<Utc>,
) -> Result<String, RenderError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", ATOM_NS));
    writer.write_event(Event::Start(rss)).map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .map_err(xml_err)?;

    write_text_element(&mut writer, BytesStart::new("title"), &channel.title)?;
    write_text_element(&mut writer, BytesStart::new("link"), &channel.link)?;
    write_text_element(&mut writer, BytesStart::new("description"), &channel.description)?;

    let mut self_link = BytesStart::new("atom:link");
    self_link.push_attribute(("href", channel.link.as_str()));
    self_link.push_attribute(("rel", "self"));
    self_link.push_attribute(("type", RSS_MIME));
    writer.write_event(Event::Empty(self_link)).map_err(xml_err)?;

    write_text_element(
        &mut writer,
        BytesStart::new("lastBuildDate"),
        &format_rfc822(channel.built_at),
    )?;
    write_text_element(&mut writer, BytesStart::new("generator"), channel.generator)?;

    for item in items {
        let article = item.article;
        writer
            .write_event(Event::Start(BytesStart::new("item")))
            .map_err(xml_err)?;

        write_text_element(&mut writer, BytesStart::new("title"), &article.title)?;
        write_text_element(&mut writer, BytesStart::new("link"), &article.link)?;

        let (id, is_permalink) = guid(article);
        let mut guid_start = BytesStart::new("guid");
        guid_start.push_attribute(("isPermaLink", if is_permalink { "true" } else { "false" }));
        write_text_element(&mut writer, guid_start, &id)?;

        if let Some(date) = pub_date(&article.published, now) {
            write_text_element(&mut writer, BytesStart::new("pubDate"), &date)?;
        }

        if let Some((name, url)) = item.source {
            let mut source = BytesStart::new("source");
            let url = strip_control_chars(url);
            source.push_attribute(("url", &*url));
            write_text_element(&mut writer, source, name)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("item")))
            .map_err(xml_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .map_err(xml_err)?;

    let mut xml = String::from_utf8(writer.into_inner()).map_err(xml_err)?;
    xml.push('\n');
    Ok(xml)
}
