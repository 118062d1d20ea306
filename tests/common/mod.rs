//! Shared fixtures: small MediaWiki dumps on disk.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A page written into a generated dump
pub struct Page {
    pub id: u32,
    pub title: String,
    pub body: String,
}

impl Page {
    pub fn new(id: u32, title: &str, body: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

/// `count` pages with ids 1..=count and a shared word in every body
pub fn numbered_pages(count: u32) -> Vec<Page> {
    (1..=count)
        .map(|i| Page::new(i, &format!("Article {}", i), &format!("common text number{}", i)))
        .collect()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Render pages as a MediaWiki export document
pub fn dump_xml(pages: &[Page]) -> String {
    let mut xml = String::from(
        "<mediawiki xmlns=\"http://www.mediawiki.org/xml/export-0.10/\" xml:lang=\"en\">\n  <siteinfo><sitename>Wikipedia</sitename></siteinfo>\n",
    );
    for page in pages {
        xml.push_str(&format!(
            "  <page>\n    <title>{}</title>\n    <ns>0</ns>\n    <id>{}</id>\n    <revision>\n      <id>{}</id>\n      <timestamp>2024-05-0{}T12:00:00Z</timestamp>\n      <text xml:space=\"preserve\">{}</text>\n    </revision>\n  </page>\n",
            escape(&page.title),
            page.id,
            900_000 + page.id,
            page.id % 9 + 1,
            escape(&page.body)
        ));
    }
    xml.push_str("</mediawiki>\n");
    xml
}

pub fn write_xml(dir: &Path, name: &str, pages: &[Page]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, dump_xml(pages)).unwrap();
    path
}

pub fn write_gz(dir: &Path, name: &str, pages: &[Page]) -> PathBuf {
    let path = dir.join(name);
    let mut encoder =
        flate2::write::GzEncoder::new(fs::File::create(&path).unwrap(), flate2::Compression::fast());
    encoder.write_all(dump_xml(pages).as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}

pub fn write_bz2(dir: &Path, name: &str, pages: &[Page]) -> PathBuf {
    let path = dir.join(name);
    let mut encoder =
        bzip2::write::BzEncoder::new(fs::File::create(&path).unwrap(), bzip2::Compression::fast());
    encoder.write_all(dump_xml(pages).as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}
