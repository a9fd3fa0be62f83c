use crate::extract::ExtractError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Encoding, Object, ObjectId, Stream};
use std::collections::BTreeMap;

const LOG_TARGET: &str = "extract::pdf";

/// TJ displacement (thousandths of an em) at or beyond which a gap reads as a space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

const MAX_FORM_DEPTH: usize = 8;

pub(crate) async fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = Document::load_mem(bytes).map_err(|e| {
        tracing::warn!(target: LOG_TARGET, error = %e, "pdf load failed");
        ExtractError::DocumentRead(e.to_string())
    })?;

    if doc.is_encrypted() {
        tracing::warn!(target: LOG_TARGET, "pdf is encrypted");
        return Err(ExtractError::DocumentRead("document is encrypted".to_owned()));
    }

    // BTreeMap keyed by page number, so iteration is 1..=N.
    let pages = doc.get_pages();
    tracing::debug!(target: LOG_TARGET, pages = pages.len(), "pdf opened");

    let mut full_text = String::new();
    for (number, page_id) in pages {
        let fragments = page_fragments(&doc, page_id).map_err(|e| {
            tracing::warn!(target: LOG_TARGET, page = number, error = %e, "page text failed");
            ExtractError::DocumentRead(format!("page {number}: {e}"))
        })?;
        full_text.push_str(&fragments.join(" "));
        full_text.push('\n');
        tokio::task::yield_now().await;
    }

    Ok(full_text)
}

fn page_fragments(doc: &Document, page_id: ObjectId) -> Result<Vec<String>, lopdf::Error> {
    let content = Content::decode(&page_content(doc, page_id)?)?;

    let (inline, inherited) = doc.get_page_resources(page_id)?;
    let mut dicts: Vec<&Dictionary> = inline.into_iter().collect();
    dicts.extend(inherited.into_iter().filter_map(|id| doc.get_dictionary(id).ok()));

    let mut walker = TextWalker::new(doc, Resources::collect(doc, &dicts));
    walker.walk(&content.operations)?;
    Ok(walker.fragments)
}

/// Concatenated content streams of a page. A dangling reference or an undecodable
/// filter fails the page instead of silently dropping its text.
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, lopdf::Error> {
    let mut content = Vec::new();
    for id in doc.get_page_contents(page_id) {
        let stream = doc.get_object(id).and_then(Object::as_stream)?;
        content.extend_from_slice(&stream.get_plain_content()?);
        content.push(b'\n');
    }
    Ok(content)
}

/// How the strings drawn with one font turn into text.
enum FontDecoder<'a> {
    Mapped(Encoding<'a>),
    /// Simple font whose encoding is a base encoding plus differences. Decoded with
    /// the base encoding; `font` is a stand-in dictionary naming it.
    Base { font: Dictionary },
    Raw,
}

impl<'a> FontDecoder<'a> {
    fn new(doc: &'a Document, font: &'a Dictionary) -> Self {
        if !font.type_is(b"Font") {
            return FontDecoder::Raw;
        }

        let composite = font.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Type0"[..]);
        if composite {
            return match font.get_font_encoding(doc) {
                Ok(encoding) => FontDecoder::Mapped(encoding),
                Err(e) => {
                    tracing::debug!(target: LOG_TARGET, error = %e, "composite font without usable ToUnicode");
                    FontDecoder::Raw
                }
            };
        }

        // ToUnicode maps of simple fonts use one-byte codes, which lopdf would read
        // as two-byte ones, so simple fonts always go through their named encoding.
        match font.get_deref(b"Encoding", doc) {
            Ok(Object::Name(_)) => match font.get_font_encoding(doc) {
                Ok(encoding) => FontDecoder::Mapped(encoding),
                Err(_) => FontDecoder::Raw,
            },
            Ok(Object::Dictionary(encoding)) => {
                let base = encoding
                    .get(b"BaseEncoding")
                    .and_then(Object::as_name)
                    .unwrap_or(&b"StandardEncoding"[..]);
                FontDecoder::base(base)
            }
            _ => FontDecoder::base(b"StandardEncoding"),
        }
    }

    fn base(name: &[u8]) -> Self {
        FontDecoder::Base {
            font: dictionary! {
                "Type" => "Font",
                "Encoding" => Object::Name(name.to_vec()),
            },
        }
    }

    fn decode(&self, doc: &Document, bytes: &[u8]) -> Option<String> {
        match self {
            FontDecoder::Mapped(encoding) => Document::decode_text(encoding, bytes).ok(),
            FontDecoder::Base { font } => font
                .get_font_encoding(doc)
                .and_then(|encoding| Document::decode_text(&encoding, bytes))
                .ok(),
            FontDecoder::Raw => None,
        }
    }
}

/// Fonts and form XObjects visible from one content stream.
struct Resources<'a> {
    fonts: BTreeMap<Vec<u8>, FontDecoder<'a>>,
    forms: BTreeMap<Vec<u8>, (ObjectId, &'a Stream)>,
}

impl<'a> Resources<'a> {
    /// Earlier dictionaries win over later ones for the same name.
    fn collect(doc: &'a Document, dicts: &[&'a Dictionary]) -> Self {
        let mut fonts = BTreeMap::new();
        let mut forms = BTreeMap::new();

        for &resources in dicts {
            if let Some(entries) = sub_dict(doc, resources, b"Font") {
                for (name, value) in entries.iter() {
                    if fonts.contains_key(name) {
                        continue;
                    }
                    if let Ok((_, Object::Dictionary(font))) = doc.dereference(value) {
                        fonts.insert(name.clone(), FontDecoder::new(doc, font));
                    }
                }
            }
            if let Some(entries) = sub_dict(doc, resources, b"XObject") {
                for (name, value) in entries.iter() {
                    if let Ok((Some(id), Object::Stream(stream))) = doc.dereference(value) {
                        if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Form"[..]) {
                            forms.entry(name.clone()).or_insert((id, stream));
                        }
                    }
                }
            }
        }

        Self { fonts, forms }
    }
}

fn sub_dict<'a>(doc: &'a Document, resources: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    resources.get_deref(key, doc).and_then(Object::as_dict).ok()
}

struct TextWalker<'a> {
    doc: &'a Document,
    scopes: Vec<Resources<'a>>,
    active_forms: Vec<ObjectId>,
    font: Option<Vec<u8>>,
    saved_fonts: Vec<Option<Vec<u8>>>,
    fragments: Vec<String>,
}

impl<'a> TextWalker<'a> {
    fn new(doc: &'a Document, page: Resources<'a>) -> Self {
        Self {
            doc,
            scopes: vec![page],
            active_forms: Vec::new(),
            font: None,
            saved_fonts: Vec::new(),
            fragments: Vec::new(),
        }
    }

    fn walk(&mut self, operations: &[Operation]) -> Result<(), lopdf::Error> {
        for op in operations {
            match op.operator.as_str() {
                "q" => self.saved_fonts.push(self.font.clone()),
                "Q" => {
                    if let Some(font) = self.saved_fonts.pop() {
                        self.font = font;
                    }
                }
                "Tf" => {
                    self.font = op
                        .operands
                        .first()
                        .and_then(|name| name.as_name().ok())
                        .map(<[u8]>::to_vec);
                }
                "Tj" | "'" => self.push_string(op.operands.first()),
                // aw ac string
                "\"" => self.push_string(op.operands.last()),
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        let text = self.text_array(items);
                        self.push(text);
                    }
                }
                "Do" => {
                    if let Some(name) = op.operands.first().and_then(|name| name.as_name().ok()) {
                        self.enter_form(name)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn enter_form(&mut self, name: &[u8]) -> Result<(), lopdf::Error> {
        let Some((id, stream)) = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.forms.get(name))
            .copied()
        else {
            return Ok(());
        };
        if self.active_forms.contains(&id) || self.active_forms.len() >= MAX_FORM_DEPTH {
            return Ok(());
        }

        let content = Content::decode(&stream.get_plain_content()?)?;
        let own: Vec<&'a Dictionary> = sub_dict(self.doc, &stream.dict, b"Resources")
            .into_iter()
            .collect();

        self.scopes.push(Resources::collect(self.doc, &own));
        self.active_forms.push(id);
        let font = self.font.clone();
        let depth = self.saved_fonts.len();

        let walked = self.walk(&content.operations);

        // Do runs inside its own graphics state.
        self.saved_fonts.truncate(depth);
        self.font = font;
        self.active_forms.pop();
        self.scopes.pop();
        walked
    }

    fn push_string(&mut self, operand: Option<&Object>) {
        if let Some(Object::String(bytes, _)) = operand {
            let text = self.decode(bytes);
            self.push(text);
        }
    }

    fn push(&mut self, fragment: String) {
        if !fragment.is_empty() {
            self.fragments.push(fragment);
        }
    }

    fn text_array(&self, items: &[Object]) -> String {
        let mut out = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => out.push_str(&self.decode(bytes)),
                Object::Integer(n) => push_gap(&mut out, *n as f32),
                Object::Real(n) => push_gap(&mut out, *n),
                _ => {}
            }
        }
        out
    }

    fn decode(&self, bytes: &[u8]) -> String {
        self.font
            .as_deref()
            .and_then(|name| self.scopes.iter().rev().find_map(|scope| scope.fonts.get(name)))
            .and_then(|font| font.decode(self.doc, bytes))
            .unwrap_or_else(|| decode_pdf_string(bytes))
    }
}

fn push_gap(out: &mut String, displacement: f32) {
    if -displacement >= TJ_SPACE_THRESHOLD && !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

/// Used when the font in effect has no encoding lopdf can apply.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

    pub(crate) struct Fixture {
        pub(crate) resources: Dictionary,
        pub(crate) fonts: Dictionary,
        pub(crate) page_ids: Vec<ObjectId>,
    }

    pub(crate) fn page_ops(ops: Vec<Operation>) -> Vec<Operation> {
        let mut all = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        all.extend(ops);
        all.push(Operation::new("ET", vec![]));
        all
    }

    pub(crate) fn tj(text: &str) -> Operation {
        Operation::new("Tj", vec![Object::string_literal(text)])
    }

    pub(crate) fn tj_bytes(bytes: &[u8]) -> Operation {
        Operation::new("Tj", vec![Object::String(bytes.to_vec(), StringFormat::Hexadecimal)])
    }

    pub(crate) fn tf(font: &str) -> Operation {
        Operation::new("Tf", vec![font.into(), 12.into()])
    }

    pub(crate) fn encoded(ops: Vec<Operation>) -> Vec<u8> {
        Content { operations: ops }.encode().expect("content encodes")
    }

    pub(crate) fn build_pdf(pages: Vec<Vec<Operation>>) -> Vec<u8> {
        build_pdf_with(pages, |_, _| {})
    }

    /// One Helvetica font `F1` without an explicit encoding; `customize` may add
    /// resources, replace page objects or touch the trailer before saving.
    pub(crate) fn build_pdf_with(
        pages: Vec<Vec<Operation>>,
        customize: impl FnOnce(&mut Document, &mut Fixture),
    ) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut page_ids = Vec::new();
        for ops in pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded(page_ops(ops))));
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            }));
        }

        let mut fixture = Fixture {
            resources: Dictionary::new(),
            fonts: dictionary! { "F1" => font_id },
            page_ids,
        };
        customize(&mut doc, &mut fixture);

        let Fixture {
            mut resources,
            fonts,
            page_ids,
        } = fixture;
        resources.set("Font", fonts);
        let resources_id = doc.add_object(resources);

        let kids: Vec<Object> = page_ids.into_iter().map(Object::from).collect();
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("pdf saves");
        buf
    }

    pub(crate) fn win_ansi_font(doc: &mut Document) -> ObjectId {
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        })
    }
}
