//! Parsing behavior under the various read settings.

#![allow(clippy::unwrap_used)]

use xylem::{entities, Document, ReadSettings, HTML_AUTO_CLOSE};

fn doc_with(s: &str, settings: ReadSettings) -> Document {
    let mut doc = Document::new();
    doc.read_settings = settings;
    doc.read_from_str(s)
        .unwrap_or_else(|e| panic!("parse failed: {e}"));
    doc
}

#[test]
fn test_charset_decoder_rewrites_stream() {
    let s = "<?xml version=\"1.0\" encoding=\"lowercase\"?>
<Store>
\t<Book Lang=\"en\">
\t\t<Title>Great Expectations</Title>
\t\t<Author>Charles Dickens</Author>
\t</Book>
</Store>";

    let settings = ReadSettings::default().charset_decoder(|label, bytes| {
        if label == "lowercase" {
            Ok(bytes.to_ascii_lowercase())
        } else {
            Err(xylem::encoding::EncodingError::new("unknown charset"))
        }
    });
    let doc = doc_with(s, settings);

    // The decoder lowercased the whole stream, tags included.
    let cases = [
        ("/store/book/title", "great expectations"),
        ("/store/book/author", "charles dickens"),
    ];
    for (path, text) in cases {
        let e = doc.find_element(path).unwrap_or_else(|| {
            panic!("failed to find element '{path}'");
        });
        assert_eq!(doc.text(e), text, "path '{path}'");
    }
}

#[test]
fn test_charset_decoder_error_propagates() {
    let mut doc = Document::new();
    doc.read_settings =
        ReadSettings::default().charset_decoder(|_, _| {
            Err(xylem::encoding::EncodingError::new("unknown charset"))
        });
    let err = doc
        .read_from_str("<?xml version=\"1.0\" encoding=\"ebcdic-oddity\"?><a/>")
        .unwrap_err();
    assert!(matches!(err, xylem::Error::Encoding(_)));
}

#[test]
fn test_default_charset_handling() {
    // Common single-byte encodings decode without a custom decoder.
    let cases = [
        "<?xml version=\"1.0\"?><foo></foo>",
        "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><foo></foo>",
        "<?xml version=\"1.0\" encoding=\"Windows-1252\"?><foo></foo>",
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><foo></foo>",
        "<?xml version=\"1.0\" encoding=\"US-ASCII\"?><foo></foo>",
    ];
    for case in cases {
        let mut doc = Document::new();
        doc.read_from_bytes(case.as_bytes())
            .unwrap_or_else(|e| panic!("failed on {case}: {e}"));
    }
}

#[test]
fn test_html_entities_require_entity_map() {
    let s = "<store>
\t<book lang=\"en\">
\t\t<title>&rarr;&nbsp;Great Expectations</title>
\t\t<author>Charles Dickens</author>
\t</book>
</store>";

    let mut doc = Document::new();
    assert!(doc.read_from_str(s).is_err());

    let doc = doc_with(s, ReadSettings::default().entity(entities::html_entities()));
    let title = doc.find_element("//title").unwrap();
    assert_eq!(doc.text(title), "\u{2192}\u{A0}Great Expectations");
}

#[test]
fn test_permissive_accepts_bare_attributes() {
    let s = "<select disabled></select>";

    let mut doc = Document::new();
    assert!(doc.read_from_str(s).is_err());

    doc.read_settings = ReadSettings::default().permissive(true);
    doc.read_from_str(s).unwrap();
    assert_eq!(
        doc.write_to_string().unwrap(),
        "<select disabled=\"disabled\"/>"
    );
}

#[test]
fn test_html_auto_close_cases() {
    let cases = [
        ("", ""),
        ("<br>", "<br/>"),
        ("<br>some text<br>", "<br/>some text<br/>"),
        (
            "<img src=\"cover.jpg\">\n<hr>\nAuthor: Charles Dickens<br>\nBook: Great Expectations<br>",
            "<img src=\"cover.jpg\"/>\n<hr/>\nAuthor: Charles Dickens<br/>\nBook: Great Expectations<br/>",
        ),
    ];

    for (input, want) in cases {
        let settings = ReadSettings::default()
            .permissive(true)
            .auto_close(HTML_AUTO_CLOSE);
        let doc = doc_with(input, settings);
        assert_eq!(doc.write_to_string().unwrap(), want, "input: {input}");
    }
}

#[test]
fn test_preserve_cdata_tables() {
    let cases = [
        (
            "<test><![CDATA[x]]></test>",
            "<test><![CDATA[x]]></test>",
            "<test>x</test>",
        ),
        (
            "<tag><![CDATA[x <b>foo</b>]]></tag>",
            "<tag><![CDATA[x <b>foo</b>]]></tag>",
            "<tag>x &lt;b&gt;foo&lt;/b&gt;</tag>",
        ),
        (
            "<name><![CDATA[My]]> <b>name</b> <![CDATA[is]]></name>",
            "<name><![CDATA[My]]> <b>name</b> <![CDATA[is]]></name>",
            "<name>My <b>name</b> is</name>",
        ),
    ];

    for (input, with_preserve, without_preserve) in cases {
        let doc = doc_with(input, ReadSettings::default().preserve_cdata(true));
        assert_eq!(doc.write_to_string().unwrap(), with_preserve);

        let doc = doc_with(input, ReadSettings::default());
        assert_eq!(doc.write_to_string().unwrap(), without_preserve);
    }
}

#[test]
fn test_duplicate_attribute_policies() {
    let s = r#"<element x="value1" y="value2" x="value3" x="value4" y="value5"/>"#;

    let doc = doc_with(s, ReadSettings::default().preserve_duplicate_attrs(true));
    let e = doc.find_element("element").unwrap();
    let pairs: Vec<(String, String)> = doc
        .attributes(e)
        .iter()
        .map(|a| (a.key.clone(), a.value.clone()))
        .collect();
    assert_eq!(pairs.len(), 5);
    assert_eq!(
        doc.write_to_string().unwrap(),
        r#"<element x="value1" y="value2" x="value3" x="value4" y="value5"/>"#
    );

    let doc = doc_with(s, ReadSettings::default());
    assert_eq!(
        doc.write_to_string().unwrap(),
        r#"<element x="value4" y="value5"/>"#
    );
}

#[test]
fn test_validate_input_table() {
    let cases = [
        ("<root>x</root>", true),
        ("<root/>", true),
        ("<root>x", false),
        ("</root><root>", false),
        ("<>", false),
        ("<root>x</root>trailing", false),
        ("<root>x</root><", false),
        ("<root><child>x</child></root1>", false),
    ];

    for (input, ok) in cases {
        let mut doc = Document::new();
        doc.read_settings = ReadSettings::default().validate_input(true);
        let result = doc.read_from_str(input);
        if ok {
            result.unwrap_or_else(|e| panic!("expected success for {input}: {e}"));
            assert_eq!(doc.tag(doc.root().unwrap()), Some("root"));
        } else {
            assert!(result.is_err(), "expected failure for: {input}");
        }

        // The same table holds for the byte-level entry point.
        let mut doc = Document::new();
        doc.read_settings = ReadSettings::default().validate_input(true);
        assert_eq!(doc.read_from_bytes(input.as_bytes()).is_ok(), ok);
    }
}

#[test]
fn test_permissive_records_diagnostics() {
    let settings = ReadSettings::default()
        .permissive(true)
        .auto_close(HTML_AUTO_CLOSE);
    let doc = doc_with("<div><br>&bogus;<p>text</div>", settings);
    assert!(doc.diagnostics.len() >= 2, "diagnostics: {:?}", doc.diagnostics);
}

#[test]
fn test_utf16_bytes_decode() {
    let mut bytes = vec![0xFF, 0xFE];
    for b in b"<root><a>hi</a></root>" {
        bytes.push(*b);
        bytes.push(0);
    }
    let mut doc = Document::new();
    doc.read_from_bytes(&bytes).unwrap();
    let a = doc.find_element("//a").unwrap();
    assert_eq!(doc.text(a), "hi");
}

#[test]
fn test_bom_round_trips_through_bytes() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"<root/>");
    let mut doc = Document::new();
    doc.read_from_bytes(&bytes).unwrap();
    assert_eq!(doc.write_to_bytes().unwrap(), bytes);
}

#[test]
fn test_read_from_reader() {
    let mut doc = Document::new();
    let input: &[u8] = b"<root><child>via reader</child></root>";
    doc.read_from_reader(input).unwrap();
    let child = doc.find_element("//child").unwrap();
    assert_eq!(doc.text(child), "via reader");
}
