//! One-pass scan of `word/document.xml` into body-level paragraph blocks.
//!
//! Only `w:p` elements that are direct children of `w:body` become blocks. Paragraphs
//! nested in tables or text boxes belong to their container and are not scanned
//! separately; text from nested paragraphs is not attributed to the outer block.

use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::docx::format::{has_real_text, ListNumbering, ParagraphFormat};
use crate::docx::DocxError;

/// A body-level paragraph.
#[derive(Debug, Clone)]
pub struct Block {
    /// Position among body paragraphs, 0-based.
    pub index: usize,
    /// Text of the paragraph's runs; `w:tab` becomes `\t`.
    pub text: String,
    /// Byte span of the whole `<w:p>` element inside the document XML.
    pub span: Range<usize>,
    pub format: ParagraphFormat,
}

impl Block {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_list_item(&self) -> bool {
        self.format.is_list_item(&self.text)
    }
}

/// New XML to splice in at a byte offset of the document XML.
#[derive(Debug, Clone)]
pub struct Insertion {
    pub offset: usize,
    pub xml: String,
}

/// The main document part together with its scanned paragraph blocks.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    xml: String,
    blocks: Vec<Block>,
}

impl ParsedDocument {
    pub fn parse(xml: impl Into<String>) -> Result<Self, DocxError> {
        let xml = xml.into();
        let blocks = Scanner::new(&xml).run()?;
        Ok(Self { xml, blocks })
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn into_xml(self) -> String {
        self.xml
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Splices insertions into the XML and rescans the result. Existing bytes are copied
    /// through unchanged; insertions at the same offset keep their given order.
    pub fn splice(&self, mut insertions: Vec<Insertion>) -> Result<Self, DocxError> {
        insertions.sort_by_key(|i| i.offset);

        let extra: usize = insertions.iter().map(|i| i.xml.len()).sum();
        let mut out = String::with_capacity(self.xml.len() + extra);
        let mut cursor = 0;

        for insertion in &insertions {
            if insertion.offset > self.xml.len() || !self.xml.is_char_boundary(insertion.offset) {
                return Err(DocxError::Malformed(format!(
                    "insertion offset {} is outside the document",
                    insertion.offset
                )));
            }
            out.push_str(&self.xml[cursor..insertion.offset]);
            out.push_str(&insertion.xml);
            cursor = insertion.offset;
        }
        out.push_str(&self.xml[cursor..]);

        Self::parse(out)
    }
}

struct RunScan {
    depth: usize,
    rpr_start: Option<usize>,
    properties: Option<Range<usize>>,
    text: String,
}

struct ParagraphScan {
    start: usize,
    depth: usize,
    nested: usize,
    text: String,
    in_text: bool,
    style_id: Option<String>,
    num_id: Option<String>,
    level: Option<String>,
    ppr_start: Option<usize>,
    paragraph_properties: Option<Range<usize>>,
    run: Option<RunScan>,
    first_run_properties: Option<Option<Range<usize>>>,
    text_run_properties: Option<Option<Range<usize>>>,
}

impl ParagraphScan {
    fn new(start: usize, depth: usize) -> Self {
        Self {
            start,
            depth,
            nested: 0,
            text: String::new(),
            in_text: false,
            style_id: None,
            num_id: None,
            level: None,
            ppr_start: None,
            paragraph_properties: None,
            run: None,
            first_run_properties: None,
            text_run_properties: None,
        }
    }

    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }

    fn finish(self, xml: &str, end: usize, index: usize) -> Block {
        // numId 0 explicitly removes numbering
        let numbering = self
            .num_id
            .filter(|id| id != "0")
            .map(|num_id| ListNumbering {
                num_id,
                level: self.level.unwrap_or_else(|| "0".to_string()),
            });
        let run_properties = self
            .text_run_properties
            .or(self.first_run_properties)
            .flatten();

        Block {
            index,
            text: self.text,
            span: self.start..end,
            format: ParagraphFormat {
                style_id: self.style_id,
                numbering,
                paragraph_properties: self.paragraph_properties.map(|r| xml[r].to_string()),
                run_properties: run_properties.map(|r| xml[r].to_string()),
            },
        }
    }
}

struct Scanner<'x> {
    xml: &'x str,
    stack: Vec<Vec<u8>>,
    saw_body: bool,
    current: Option<ParagraphScan>,
    blocks: Vec<Block>,
}

impl<'x> Scanner<'x> {
    fn new(xml: &'x str) -> Self {
        Self {
            xml,
            stack: Vec::new(),
            saw_body: false,
            current: None,
            blocks: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Block>, DocxError> {
        let mut reader = Reader::from_str(self.xml);

        loop {
            let before = reader.buffer_position();
            let event = reader.read_event()?;
            let after = reader.buffer_position();

            match event {
                Event::Start(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    self.open(&e, &name, before, after, false)?;
                    self.stack.push(name);
                }
                Event::Empty(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    self.open(&e, &name, before, after, true)?;
                }
                Event::End(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    self.stack.pop();
                    self.close(&name, after);
                }
                Event::Text(t) => {
                    if let Some(scan) = self.current.as_mut() {
                        if scan.in_text && scan.nested == 0 {
                            let text = t.unescape()?;
                            scan.push_text(&text);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(DocxError::Malformed(format!(
                "unclosed element <{}>",
                String::from_utf8_lossy(open)
            )));
        }
        if !self.saw_body {
            return Err(DocxError::MissingBody);
        }
        Ok(self.blocks)
    }

    fn open(
        &mut self,
        e: &BytesStart,
        name: &[u8],
        before: usize,
        after: usize,
        empty: bool,
    ) -> Result<(), DocxError> {
        // Position the element takes in the stack
        let depth = self.stack.len();
        let parent = self.stack.last().map(Vec::as_slice);

        if name == b"body" {
            self.saw_body = true;
        }

        let Some(scan) = self.current.as_mut() else {
            if name == b"p" && parent == Some(b"body".as_slice()) {
                if empty {
                    self.blocks.push(Block {
                        index: self.blocks.len(),
                        text: String::new(),
                        span: before..after,
                        format: ParagraphFormat::default(),
                    });
                } else {
                    self.current = Some(ParagraphScan::new(before, depth));
                }
            }
            return Ok(());
        };

        if name == b"p" {
            if !empty {
                scan.nested += 1;
            }
            return Ok(());
        }
        if scan.nested > 0 {
            return Ok(());
        }

        match name {
            b"pPr" if depth == scan.depth + 1 => {
                if empty {
                    scan.paragraph_properties = Some(before..after);
                } else {
                    scan.ppr_start = Some(before);
                }
            }
            b"pStyle" if depth == scan.depth + 2 && parent == Some(b"pPr".as_slice()) => {
                scan.style_id = attribute(e, b"val")?;
            }
            b"ilvl" if depth == scan.depth + 3 && parent == Some(b"numPr".as_slice()) => {
                scan.level = attribute(e, b"val")?;
            }
            b"numId" if depth == scan.depth + 3 && parent == Some(b"numPr".as_slice()) => {
                scan.num_id = attribute(e, b"val")?;
            }
            b"r" if scan.run.is_none() && !empty => {
                scan.run = Some(RunScan {
                    depth,
                    rpr_start: None,
                    properties: None,
                    text: String::new(),
                });
            }
            b"rPr" => {
                if let Some(run) = scan.run.as_mut().filter(|r| depth == r.depth + 1) {
                    if empty {
                        run.properties = Some(before..after);
                    } else {
                        run.rpr_start = Some(before);
                    }
                }
            }
            b"t" if !empty => {
                if scan.run.as_ref().map(|r| depth == r.depth + 1).unwrap_or(false) {
                    scan.in_text = true;
                }
            }
            b"tab" => {
                if scan.run.as_ref().map(|r| depth == r.depth + 1).unwrap_or(false) {
                    scan.push_text("\t");
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8], after: usize) {
        // Position the closed element held in the stack
        let depth = self.stack.len();
        let Some(scan) = self.current.as_mut() else {
            return;
        };

        if name == b"p" {
            if scan.nested > 0 {
                scan.nested -= 1;
            } else if depth == scan.depth {
                if let Some(scan) = self.current.take() {
                    let index = self.blocks.len();
                    self.blocks.push(scan.finish(self.xml, after, index));
                }
            }
            return;
        }
        if scan.nested > 0 {
            return;
        }

        match name {
            b"pPr" if depth == scan.depth + 1 => {
                if let Some(start) = scan.ppr_start.take() {
                    scan.paragraph_properties = Some(start..after);
                }
            }
            b"t" => scan.in_text = false,
            b"rPr" => {
                if let Some(run) = scan.run.as_mut().filter(|r| depth == r.depth + 1) {
                    if let Some(start) = run.rpr_start.take() {
                        run.properties = Some(start..after);
                    }
                }
            }
            b"r" if scan.run.as_ref().map(|r| r.depth == depth).unwrap_or(false) => {
                if let Some(run) = scan.run.take() {
                    if scan.first_run_properties.is_none() {
                        scan.first_run_properties = Some(run.properties.clone());
                    }
                    if scan.text_run_properties.is_none() && has_real_text(&run.text) {
                        scan.text_run_properties = Some(run.properties);
                    }
                }
            }
            _ => {}
        }
    }
}

fn attribute(e: &BytesStart, local: &[u8]) -> Result<Option<String>, DocxError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
