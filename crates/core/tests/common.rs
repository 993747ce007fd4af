#![allow(dead_code)]

//! SC3 images and media assembled in memory for integration tests.

use std::collections::BTreeMap;

use sc3_engine::{Domain, MediaStorage, VnError, VnResult};

/// Small non-negative literal as a complete active value.
pub fn av(value: u16) -> Vec<u8> {
    let mut out = literal(value);
    out.push(0x00);
    out
}

fn literal(value: u16) -> Vec<u8> {
    assert!(value < 0x1000, "fixture literals are 12-bit");
    if value < 0x10 {
        vec![0x80 | value as u8, 0x00]
    } else {
        vec![0xa0 | (value >> 8) as u8, value as u8, 0x00]
    }
}

/// `mem[address] = value`.
pub fn av_store(address: u16, value: u16) -> Vec<u8> {
    let mut out = vec![0x28, 0x00];
    out.extend(literal(address));
    out.extend([0x14, 0x00]);
    out.extend(literal(value));
    out.push(0x00);
    out
}

/// `mem[address]`.
pub fn av_load(address: u16) -> Vec<u8> {
    let mut out = vec![0x28, 0x0a];
    out.extend(literal(address));
    out.push(0x00);
    out
}

pub fn fnr(index: u16) -> Vec<u8> {
    let mut out = vec![0x00; 4];
    out.extend(index.to_le_bytes());
    out
}

pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

#[derive(Default)]
pub struct Sc3Builder {
    events: Vec<Vec<u8>>,
    convs: Vec<Vec<u8>>,
    filenames: Vec<Vec<u8>>,
}

impl Sc3Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(mut self, body: Vec<u8>) -> Self {
        self.events.push(body);
        self
    }

    pub fn conv(mut self, body: Vec<u8>) -> Self {
        self.convs.push(body);
        self
    }

    pub fn filename(mut self, name: &str) -> Self {
        let mut bytes = name.as_bytes().to_vec();
        bytes.push(0);
        self.filenames.push(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        assert!(!self.events.is_empty(), "SC3 images need an event chunk");
        let mut out = b"SC3\0".to_vec();
        out.extend([0u8; 8]);
        let es_table = out.len();
        out.resize(es_table + 4 * self.events.len(), 0);
        for (i, body) in self.events.iter().enumerate() {
            let at = es_table + 4 * i;
            let start = out.len() as u32;
            out[at..at + 4].copy_from_slice(&start.to_le_bytes());
            out.extend(body);
        }
        let off_cs_list = out.len();
        let off_fn_list = off_cs_list + 4 * self.convs.len();
        let tables = self.convs.len() + self.filenames.len();
        out.resize(off_cs_list + 4 * tables, 0);
        for (i, body) in self.convs.iter().chain(&self.filenames).enumerate() {
            let at = off_cs_list + 4 * i;
            let start = out.len() as u32;
            out[at..at + 4].copy_from_slice(&start.to_le_bytes());
            out.extend(body);
        }
        out[4..8].copy_from_slice(&(off_cs_list as u32).to_le_bytes());
        out[8..12].copy_from_slice(&(off_fn_list as u32).to_le_bytes());
        out
    }
}

/// Media keyed by kind and lower-cased name.
#[derive(Clone, Default)]
pub struct MemoryMedia {
    files: BTreeMap<(&'static str, String), Domain>,
}

impl MemoryMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: &'static str, name: &str, bytes: Vec<u8>) -> Self {
        self.files.insert((kind, name.to_lowercase()), Domain::new(bytes));
        self
    }

    pub fn with_script(self, name: &str, script: &Sc3Builder) -> Self {
        self.with("script", name, script.build())
    }

    fn get(&self, kind: &'static str, name: &str) -> VnResult<Domain> {
        self.files
            .get(&(kind, name.to_lowercase()))
            .cloned()
            .ok_or_else(|| VnError::Media {
                kind,
                name: name.to_string(),
            })
    }
}

impl MediaStorage for MemoryMedia {
    fn script(&mut self, name: &str) -> VnResult<Domain> {
        self.get("script", name)
    }

    fn background(&mut self, name: &str) -> VnResult<Domain> {
        self.get("background", name)
    }

    fn character_art(&mut self, name: &str) -> VnResult<Domain> {
        self.get("character art", name)
    }

    fn voice(&mut self, name: &str) -> VnResult<Domain> {
        self.get("voice", name)
    }

    fn movie(&mut self, name: &str) -> VnResult<Domain> {
        self.get("movie", name)
    }
}
