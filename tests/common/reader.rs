//! Minimal chunk reader for checking writer output.
#![allow(dead_code)]

use std::collections::HashMap;

use flr_writer::chunk::constants::*;
use flr_writer::writer::{STRING_CONSTANT_POOL, STRING_EMPTY, STRING_NULL, STRING_UTF8};

/// Header fields of a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 4],
    pub major: u16,
    pub minor: u16,
    pub size: i64,
    pub constant_pool_offset: i64,
    pub metadata_offset: i64,
    pub start_nanos: i64,
    pub duration: i64,
    pub start_ticks: i64,
    pub ticks_per_second: i64,
    pub features: i32,
}

fn be_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

fn be_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_be_bytes(raw)
}

fn be_i64(bytes: &[u8], offset: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    i64::from_be_bytes(raw)
}

pub fn read_header(bytes: &[u8]) -> Header {
    assert!(bytes.len() >= HEADER_SIZE, "chunk shorter than its header");
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[..4]);
    Header {
        magic,
        major: be_u16(bytes, VERSION_OFFSET),
        minor: be_u16(bytes, VERSION_OFFSET + 2),
        size: be_i64(bytes, SIZE_OFFSET),
        constant_pool_offset: be_i64(bytes, CONSTANT_POOL_OFFSET),
        metadata_offset: be_i64(bytes, METADATA_OFFSET),
        start_nanos: be_i64(bytes, START_NANOS_OFFSET),
        duration: be_i64(bytes, DURATION_OFFSET),
        start_ticks: be_i64(bytes, START_TICKS_OFFSET),
        ticks_per_second: be_i64(bytes, TICKS_PER_SECOND_OFFSET),
        features: be_i32(bytes, FEATURES_OFFSET),
    }
}

/// Sequential decoder over chunk bytes.
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pub pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    pub fn byte(&mut self) -> u8 {
        let b = self.bytes[self.pos];
        self.pos += 1;
        b
    }

    pub fn varint(&mut self) -> i64 {
        let mut value: u64 = 0;
        for i in 0..8 {
            let b = self.byte();
            value |= ((b & 0x7f) as u64) << (7 * i);
            if b & 0x80 == 0 {
                return value as i64;
            }
        }
        (value | ((self.byte() as u64) << 56)) as i64
    }

    pub fn count(&mut self) -> usize {
        self.varint() as usize
    }

    /// Inline strings decode to their text; pool references decode to
    /// `#<index>`.
    pub fn string(&mut self) -> Option<String> {
        match self.byte() {
            STRING_NULL => None,
            STRING_EMPTY => Some(String::new()),
            STRING_CONSTANT_POOL => Some(format!("#{}", self.varint())),
            STRING_UTF8 => {
                let len = self.count();
                let text = String::from_utf8(self.bytes[self.pos..self.pos + len].to_vec())
                    .expect("invalid UTF-8 in chunk");
                self.pos += len;
                Some(text)
            }
            tag => panic!("unknown string tag {tag} at {}", self.pos - 1),
        }
    }
}

/// One self-sized record in the chunk body.
#[derive(Debug, Clone, Copy)]
pub struct Record {
    pub offset: usize,
    pub size: usize,
    pub type_id: i64,
    /// First byte after the type id.
    pub body: usize,
}

/// Every record between the header and the end of the chunk, in order.
pub fn records(bytes: &[u8]) -> Vec<Record> {
    let header = read_header(bytes);
    let end = header.size as usize;
    let mut out = Vec::new();
    let mut offset = HEADER_SIZE;
    while offset < end {
        let mut cursor = Cursor::new(bytes, offset);
        let size = cursor.count();
        assert!(size > 0, "zero sized record at {offset}");
        let type_id = cursor.varint();
        out.push(Record {
            offset,
            size,
            type_id,
            body: cursor.pos,
        });
        offset += size;
    }
    assert_eq!(offset, end, "records overrun the chunk");
    out
}

/// Element of the metadata tree with attributes resolved to strings.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn child_named<'e>(&'e self, name: &'e str) -> impl Iterator<Item = &'e Element> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Decoded metadata event.
#[derive(Debug)]
pub struct MetadataEvent {
    pub start_ticks: i64,
    pub duration: i64,
    pub strings: Vec<String>,
    pub root: Element,
}

impl MetadataEvent {
    /// `class` elements keyed by type name.
    pub fn classes(&self) -> HashMap<String, Element> {
        self.root
            .child_named("metadata")
            .flat_map(|m| m.child_named("class"))
            .map(|c| (c.attr("name").unwrap_or_default().to_string(), c.clone()))
            .collect()
    }
}

fn read_element(cursor: &mut Cursor<'_>, strings: &[String]) -> Element {
    let name = strings[cursor.count()].clone();
    let attr_count = cursor.count();
    let mut attributes = HashMap::new();
    for _ in 0..attr_count {
        let key = strings[cursor.count()].clone();
        let value = strings[cursor.count()].clone();
        attributes.insert(key, value);
    }
    let child_count = cursor.count();
    let children = (0..child_count)
        .map(|_| read_element(cursor, strings))
        .collect();
    Element {
        name,
        attributes,
        children,
    }
}

pub fn read_metadata(bytes: &[u8], offset: usize) -> MetadataEvent {
    let mut cursor = Cursor::new(bytes, offset);
    let size = cursor.count();
    assert_eq!(cursor.varint(), METADATA_EVENT_ID);
    let start_ticks = cursor.varint();
    let duration = cursor.varint();
    assert_eq!(cursor.varint(), 0, "metadata id");
    let count = cursor.count();
    let strings: Vec<String> = (0..count)
        .map(|_| cursor.string().expect("null string in string table"))
        .collect();
    let root = read_element(&mut cursor, &strings);
    assert_eq!(cursor.pos, offset + size, "metadata size mismatch");
    MetadataEvent {
        start_ticks,
        duration,
        strings,
        root,
    }
}

/// Header of the checkpoint event, positioned at the first pool.
#[derive(Debug)]
pub struct Checkpoint {
    pub size: usize,
    pub start_ticks: i64,
    pub duration: i64,
    pub delta: i64,
    pub type_mask: u8,
    pub pool_count: usize,
    pub pools_start: usize,
}

pub fn read_checkpoint(bytes: &[u8], offset: usize) -> Checkpoint {
    let mut cursor = Cursor::new(bytes, offset);
    let size = cursor.count();
    assert_eq!(cursor.varint(), CHECKPOINT_EVENT_ID);
    Checkpoint {
        size,
        start_ticks: cursor.varint(),
        duration: cursor.varint(),
        delta: cursor.varint(),
        type_mask: cursor.byte(),
        pool_count: cursor.count(),
        pools_start: cursor.pos,
    }
}
