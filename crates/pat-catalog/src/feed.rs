// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Update feed (RSS) reader
//!
//! Each `<item>` describes one release and lists the models it ships for:
//!
//! ```xml
//! <item>
//!   <MajorVer>7</MajorVer><MinorVer>2</MinorVer>
//!   <BuildPhase>1</BuildPhase><BuildNum>69057</BuildNum>
//!   <model>
//!     <mUnique>synology_bromolow_3615xs</mUnique>
//!     <mLink>https://.../release/7.2.1/69057-1/DSM_DS3615xs_69057.pat</mLink>
//!     <mCheckSum>...</mCheckSum>
//!   </model>
//! </item>
//! ```

use crate::error::{CatalogError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub major: String,
    pub minor: String,
    pub build_number: String,
    pub build_phase: String,
    pub models: Vec<FeedModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedModel {
    /// Compound identifier, e.g. `synology_bromolow_3615xs`
    pub unique: String,
    /// Package download link
    pub link: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Major,
    Minor,
    BuildNumber,
    BuildPhase,
    Unique,
    Link,
    Checksum,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"MajorVer" => Some(Self::Major),
            b"MinorVer" => Some(Self::Minor),
            b"BuildNum" => Some(Self::BuildNumber),
            b"BuildPhase" => Some(Self::BuildPhase),
            b"mUnique" => Some(Self::Unique),
            b"mLink" => Some(Self::Link),
            b"mCheckSum" => Some(Self::Checksum),
            _ => None,
        }
    }

    fn is_model_field(self) -> bool {
        matches!(self, Self::Unique | Self::Link | Self::Checksum)
    }
}

/// Parse the feed document into its items.
///
/// Any XML syntax error is a [`CatalogError::Feed`], as is a document without
/// a single `<item>`.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut item: Option<FeedItem> = None;
    let mut model: Option<FeedModel> = None;
    let mut field: Option<Field> = None;
    // Depth of the element holding the current field, relative to its owner
    let mut field_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            CatalogError::Feed(format!(
                "XML error at position {}: {e}",
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(element) => {
                let name = element.local_name();
                match name.as_ref() {
                    b"item" => item = Some(FeedItem::default()),
                    b"model" if item.is_some() => model = Some(FeedModel::default()),
                    tag => {
                        if field.is_some() {
                            field_depth += 1;
                        } else if let Some(f) = Field::from_tag(tag) {
                            // Version fields only count directly under <item>
                            let owned = if f.is_model_field() {
                                model.is_some()
                            } else {
                                item.is_some() && model.is_none()
                            };
                            if owned {
                                field = Some(f);
                                field_depth = 0;
                            }
                        }
                    }
                }
            }
            Event::Text(text) => {
                if let Some(f) = field
                    && field_depth == 0
                {
                    let value = text
                        .unescape()
                        .map_err(|e| CatalogError::Feed(format!("bad text in feed: {e}")))?;
                    assign(f, value.trim(), item.as_mut(), model.as_mut());
                }
            }
            Event::CData(data) => {
                if let Some(f) = field
                    && field_depth == 0
                {
                    let bytes = data.into_inner();
                    let value = String::from_utf8_lossy(&bytes);
                    assign(f, value.trim(), item.as_mut(), model.as_mut());
                }
            }
            Event::End(element) => {
                let name = element.local_name();
                match name.as_ref() {
                    _ if field.is_some() && field_depth > 0 => field_depth -= 1,
                    _ if field.is_some() => field = None,
                    b"model" => {
                        if let (Some(m), Some(i)) = (model.take(), item.as_mut()) {
                            i.models.push(m);
                        }
                    }
                    b"item" => {
                        if let Some(i) = item.take() {
                            items.push(i);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if items.is_empty() {
        return Err(CatalogError::Feed(
            "feed contains no <item> elements".to_string(),
        ));
    }

    Ok(items)
}

fn assign(field: Field, value: &str, item: Option<&mut FeedItem>, model: Option<&mut FeedModel>) {
    if field.is_model_field() {
        let Some(model) = model else { return };
        let slot = match field {
            Field::Unique => &mut model.unique,
            Field::Link => &mut model.link,
            _ => &mut model.checksum,
        };
        slot.push_str(value);
    } else {
        let Some(item) = item else { return };
        let slot = match field {
            Field::Major => &mut item.major,
            Field::Minor => &mut item.minor,
            Field::BuildNumber => &mut item.build_number,
            _ => &mut item.build_phase,
        };
        slot.push_str(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Synology Inc.</title>
    <item>
      <title>DSM 7.2.1-69057 Update 1</title>
      <MajorVer>7</MajorVer>
      <MinorVer>2</MinorVer>
      <BuildPhase>1</BuildPhase>
      <BuildNum>69057</BuildNum>
      <ReqMajorVer>7</ReqMajorVer>
      <model>
        <mUnique>synology_bromolow_3615xs</mUnique>
        <mLink>https://global.synologydownload.com/download/DSM/release/7.2.1/69057-1/DSM_DS3615xs_69057.pat?model=DS3615xs</mLink>
        <mCheckSum>0123456789abcdef0123456789abcdef</mCheckSum>
      </model>
      <model>
        <mUnique>synology_geminilake_920+</mUnique>
        <mLink><![CDATA[https://global.synologydownload.com/download/DSM/release/7.2.1/69057-1/DSM_DS920%2B_69057.pat]]></mLink>
        <mCheckSum></mCheckSum>
      </model>
    </item>
    <item>
      <MajorVer>6</MajorVer>
      <MinorVer>2</MinorVer>
      <BuildPhase>3</BuildPhase>
      <BuildNum>25556</BuildNum>
      <model>
        <mUnique>synology_avoton_1515+</mUnique>
        <mLink>https://global.synologydownload.com/download/DSM/release/6.2.4/25556/DSM_DS1515%2B_25556.pat</mLink>
        <mCheckSum>ffffffffffffffffffffffffffffffff</mCheckSum>
      </model>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_items() {
        let items = parse_feed(FEED).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.major, "7");
        assert_eq!(first.minor, "2");
        assert_eq!(first.build_number, "69057");
        assert_eq!(first.build_phase, "1");
        assert_eq!(first.models.len(), 2);
        assert_eq!(first.models[0].unique, "synology_bromolow_3615xs");
        assert!(first.models[0].link.ends_with("DSM_DS3615xs_69057.pat?model=DS3615xs"));
        assert_eq!(first.models[0].checksum, "0123456789abcdef0123456789abcdef");

        assert_eq!(items[1].major, "6");
    }

    #[test]
    fn test_parse_feed_cdata_and_empty_fields() {
        let items = parse_feed(FEED).unwrap();
        let model = &items[0].models[1];
        assert_eq!(model.unique, "synology_geminilake_920+");
        assert!(model.link.ends_with("DSM_DS920%2B_69057.pat"));
        assert!(model.checksum.is_empty());
    }

    #[test]
    fn test_req_major_does_not_override_major() {
        let items = parse_feed(FEED).unwrap();
        assert_eq!(items[0].major, "7");
    }

    #[test]
    fn test_parse_feed_without_items() {
        let result = parse_feed("<rss><channel><title>empty</title></channel></rss>");
        assert!(matches!(result, Err(CatalogError::Feed(_))));
    }

    #[test]
    fn test_parse_feed_broken_xml() {
        let result = parse_feed("<rss><item><MajorVer>7</MinorVer></item></rss>");
        assert!(matches!(result, Err(CatalogError::Feed(_))));
    }

    #[test]
    fn test_escaped_entities_are_decoded() {
        let xml = "<rss><item><MajorVer>7</MajorVer><model>\
                   <mUnique>synology_r1000_923+</mUnique>\
                   <mLink>https://h/DSM_DS923%2B_1.pat?a=1&amp;b=2</mLink>\
                   </model></item></rss>";
        let items = parse_feed(xml).unwrap();
        assert_eq!(items[0].models[0].link, "https://h/DSM_DS923%2B_1.pat?a=1&b=2");
    }
}
