//! Markup extraction for existentialcomics.com pages.
//!
//! Selectors here are a fixed contract with the site's markup:
//! the comic title is the first `h3`, panels are `img.comicImg`,
//! alt text lives in `div.altText`, the explanation in `div#explainHidden`
//! and philosopher links in `div#philosophers-comic`.

use crate::error::{Error, Result};
use crate::util::last_segment;
use chrono::NaiveDateTime;
use select::document::Document;
use select::node::Node;
use select::predicate::{And, Attr, Class, Name};

/// A comic as scraped from its page.
#[derive(Debug, Clone, PartialEq)]
pub struct Comic {
    pub id: i32,
    pub title: String,
    /// Panel image URLs, in page order.
    pub image_urls: Vec<String>,
    pub alt_text: String,
    pub explanation: String,
    pub philosophers: Vec<Philosopher>,
    /// Stored image paths, parallel to `image_urls` once images are materialized.
    pub file_paths: Vec<String>,
    pub collected_at: NaiveDateTime,
}

impl Comic {
    pub fn image_count(&self) -> usize {
        self.image_urls.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Philosopher {
    /// Last path segment of the philosopher's page link; used as dedup key.
    pub safe_name: String,
    pub display_name: String,
}

/// Parses a comic page. Only the title is mandatory.
pub fn parse(doc: &Document, id: i32) -> Result<Comic> {
    let title = doc
        .find(Name("h3"))
        .next()
        .map(|node| node.text().trim().to_owned())
        .ok_or(Error::Parse { id, missing: "title" })?;

    let image_urls = doc
        .find(And(Name("img"), Class("comicImg")))
        .filter_map(|img| match img.attr("src").map(str::trim) {
            Some("") => {
                log::warn!("Comic {} has a panel with empty src attribute", id);
                None
            }
            Some(src) => Some(src.to_owned()),
            None => {
                log::warn!("Comic {} has a panel without src attribute", id);
                None
            }
        })
        .collect();

    let alt_text = trimmed_text(doc.find(And(Name("div"), Class("altText"))).next());
    let explanation = trimmed_text(doc.find(And(Name("div"), Attr("id", "explainHidden"))).next());

    let philosophers = doc
        .find(And(Name("div"), Attr("id", "philosophers-comic")))
        .next()
        .map(|container| {
            container
                .find(Name("a"))
                .filter_map(|anchor| philosopher(id, anchor))
                .collect()
        })
        .unwrap_or_default();

    Ok(Comic {
        id,
        title,
        image_urls,
        alt_text,
        explanation,
        philosophers,
        file_paths: Vec::new(),
        collected_at: chrono::Local::now().naive_local(),
    })
}

fn trimmed_text(node: Option<Node>) -> String {
    node.map(|n| n.text().trim().to_owned()).unwrap_or_default()
}

fn philosopher(id: i32, anchor: Node) -> Option<Philosopher> {
    let safe_name = anchor.attr("href").and_then(last_segment);
    match safe_name {
        Some(safe_name) => Some(Philosopher {
            safe_name: safe_name.to_owned(),
            display_name: anchor.text().trim().to_owned(),
        }),
        None => {
            log::warn!(
                "Ignoring philosopher link without usable href in comic {}: {}",
                id,
                anchor.text().trim()
            );
            None
        }
    }
}

/// Finds the newest comic id from the front page.
///
/// The front page shows the newest comic, and its navigation points one behind it:
/// the second cell of `table.nav-table` links to the previous comic.
/// Older layouts expose the same link as `area[alt=previous]`.
pub fn latest_id(doc: &Document) -> Result<i32> {
    let nav_link = doc
        .find(And(Name("table"), Class("nav-table")))
        .next()
        .and_then(|table| table.find(Name("td")).nth(1))
        .and_then(|cell| cell.find(Name("a")).next())
        .and_then(|anchor| anchor.attr("href"));

    let href = match nav_link {
        Some(href) => href,
        None => doc
            .find(And(Name("area"), Attr("alt", "previous")))
            .next()
            .and_then(|area| area.attr("href"))
            .ok_or_else(|| Error::Discovery("no link to the previous comic on front page".into()))?,
    };

    let previous = last_segment(href)
        .and_then(|segment| segment.parse::<i32>().ok())
        .ok_or_else(|| Error::Discovery(format!("unexpected previous comic link {:?}", href)))?;

    Ok(previous + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMIC_PAGE: &str = include_str!("../tests/fixtures/comic.html");
    const FRONT_PAGE: &str = include_str!("../tests/fixtures/front.html");

    #[test]
    fn parses_every_field() {
        let comic = parse(&Document::from(COMIC_PAGE), 41).unwrap();

        assert_eq!(comic.id, 41);
        assert_eq!(comic.title, "The Philosopher's Football Match");
        assert_eq!(
            comic.image_urls,
            vec![
                "https://static.existentialcomics.com/comics/football1.png",
                "https://static.existentialcomics.com/comics/football2.jpg",
            ]
        );
        assert_eq!(comic.image_count(), 2);
        assert_eq!(comic.alt_text, "Nobody expected the Socratic method.");
        assert_eq!(
            comic.explanation,
            "Aristotle and Plato argue about the nature of the ball."
        );
        assert_eq!(
            comic.philosophers,
            vec![
                Philosopher {
                    safe_name: "Plato".into(),
                    display_name: "Plato".into()
                },
                Philosopher {
                    safe_name: "Aristotle".into(),
                    display_name: "Aristotle".into()
                },
                Philosopher {
                    safe_name: "Soren_Kierkegaard".into(),
                    display_name: "Søren Kierkegaard".into()
                },
            ]
        );
        assert!(comic.file_paths.is_empty());
    }

    #[test]
    fn optional_fields_degrade_to_empty() {
        let doc = Document::from("<html><body><h3> Bare </h3></body></html>");
        let comic = parse(&doc, 7).unwrap();

        assert_eq!(comic.title, "Bare");
        assert!(comic.image_urls.is_empty());
        assert_eq!(comic.alt_text, "");
        assert_eq!(comic.explanation, "");
        assert!(comic.philosophers.is_empty());
    }

    #[test]
    fn panels_without_usable_src_are_skipped() {
        let doc = Document::from(
            r#"<html><body><h3>Panels</h3>
<img class="comicImg" src="">
<img class="comicImg" src="   ">
<img class="comicImg">
<img class="comicImg" src="/comics/kept.png">
</body></html>"#,
        );
        let comic = parse(&doc, 8).unwrap();
        assert_eq!(comic.image_urls, vec!["/comics/kept.png"]);
        assert_eq!(comic.image_count(), 1);
    }

    #[test]
    fn missing_title_is_parse_error() {
        let doc = Document::from(r#"<html><body><img class="comicImg" src="a.png"></body></html>"#);
        match parse(&doc, 3) {
            Err(Error::Parse { id: 3, missing }) => assert_eq!(missing, "title"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn latest_from_nav_table() {
        assert_eq!(latest_id(&Document::from(FRONT_PAGE)).unwrap(), 512);
    }

    #[test]
    fn latest_from_previous_area() {
        let doc = Document::from(
            r#"<map><area shape="rect" alt="first" href="/comic/1"><area shape="rect" alt="previous" href="http://existentialcomics.com/comic/99"></map>"#,
        );
        assert_eq!(latest_id(&doc).unwrap(), 100);
    }

    #[test]
    fn latest_without_navigation_fails() {
        let doc = Document::from("<html><body><h3>Maintenance</h3></body></html>");
        assert!(matches!(latest_id(&doc), Err(Error::Discovery(_))));

        let doc = Document::from(
            r#"<table class="nav-table"><tr><td><a href="/comic/1">first</a></td><td><a href="/archive">previous</a></td></tr></table>"#,
        );
        assert!(matches!(latest_id(&doc), Err(Error::Discovery(_))));
    }
}
