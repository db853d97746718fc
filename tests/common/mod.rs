//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use romkit::decrypt::{ToolOutput, ToolRunner};
use romkit::{Config, Engine};

/// A tool runner for a machine with no decryption tools installed.
#[derive(Clone, Default)]
pub struct NoTools {
    calls: Arc<AtomicUsize>,
}

impl NoTools {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ToolRunner for NoTools {
    fn run(&self, program: &str, _args: &[String], _timeout: Duration) -> io::Result<ToolOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::NotFound, program.to_owned()))
    }
}

pub fn engine(runner: NoTools) -> Engine {
    Engine::new(&Config::default()).with_tool_runner(runner)
}

pub fn write(dir: &Path, name: &str, data: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

/// PFS0 (`entry_size` 0x18) or HFS0 (0x40) with files laid out back to back.
pub fn flat_container(magic: &[u8; 4], files: &[(&str, &[u8])]) -> Vec<u8> {
    let hfs0 = magic == b"HFS0";
    let mut strings = Vec::new();
    let mut table = Vec::new();
    let mut data = Vec::new();
    for (name, body) in files {
        let name_offset = strings.len() as u32;
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);
        table.extend_from_slice(&(data.len() as u64).to_le_bytes());
        table.extend_from_slice(&(body.len() as u64).to_le_bytes());
        table.extend_from_slice(&name_offset.to_le_bytes());
        if hfs0 {
            table.extend_from_slice(&[0u8; 4 + 8 + 0x20]);
        } else {
            table.extend_from_slice(&[0u8; 4]);
        }
        data.extend_from_slice(body);
    }
    while strings.len() % 0x10 != 0 {
        strings.push(0);
    }
    let mut out = Vec::new();
    out.extend_from_slice(magic);
    out.extend_from_slice(&(files.len() as u32).to_le_bytes());
    out.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend(table);
    out.extend(strings);
    out.extend(data);
    out
}

/// Trimmed game card image: card header at 0, root HFS0 at 0x200.
pub fn xci(partitions: &[(&str, &[u8])]) -> Vec<u8> {
    let mut image = vec![0u8; 0x200];
    image[0x100..0x104].copy_from_slice(b"HEAD");
    image[0x10D] = 0xFA;
    image[0x130..0x138].copy_from_slice(&0x200u64.to_le_bytes());
    image.extend(flat_container(b"HFS0", partitions));
    image
}

pub const TITLE_ID: &str = "0100000000010000";

pub fn cnmt_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<ContentMeta>
  <Type>Application</Type>
  <Id>0x{TITLE_ID}</Id>
  <Version>65536</Version>
  <Content><Type>Control</Type><Id>c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0</Id><Size>64</Size></Content>
</ContentMeta>"#
    )
}

/// GameCube disc with every file in the root directory.
pub fn gamecube_disc(game_id: &str, title: &str, files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut image = vec![0u8; 0x2440];
    image[..6].copy_from_slice(game_id.as_bytes());
    image[0x1C..0x20].copy_from_slice(&0xC233_9F3Du32.to_be_bytes());
    image[0x20..0x20 + title.len()].copy_from_slice(title.as_bytes());

    let count = files.len() + 1;
    let fst_offset = image.len();
    let fst_size = count * 12 + files.iter().map(|(n, _)| n.len() + 1).sum::<usize>();
    let mut entries = vec![0u8; count * 12];
    entries[0] = 1;
    entries[8..12].copy_from_slice(&(count as u32).to_be_bytes());
    let mut strings = Vec::new();
    let mut payload = Vec::new();
    let mut data_at = (fst_offset + fst_size).next_multiple_of(0x20);
    for (i, (name, data)) in files.iter().enumerate() {
        let e = &mut entries[(i + 1) * 12..(i + 2) * 12];
        e[0..4].copy_from_slice(&(strings.len() as u32).to_be_bytes());
        e[4..8].copy_from_slice(&(data_at as u32).to_be_bytes());
        e[8..12].copy_from_slice(&(data.len() as u32).to_be_bytes());
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);
        payload.push((data_at, data));
        data_at = (data_at + data.len()).next_multiple_of(0x20);
    }
    image[0x424..0x428].copy_from_slice(&(fst_offset as u32).to_be_bytes());
    image[0x428..0x42C].copy_from_slice(&(fst_size as u32).to_be_bytes());
    image.extend(entries);
    image.extend(strings);
    for (at, data) in payload {
        image.resize(at, 0);
        image.extend_from_slice(data);
    }
    image
}

/// One-block `BNR1` banner.
pub fn banner(title: &str, maker: &str) -> Vec<u8> {
    let mut b = vec![0u8; 0x1820 + 0x140];
    b[..4].copy_from_slice(b"BNR1");
    let t = 0x1820;
    b[t..t + title.len()].copy_from_slice(title.as_bytes());
    b[t + 0x20..t + 0x20 + maker.len()].copy_from_slice(maker.as_bytes());
    b[t + 0x40..t + 0x40 + title.len()].copy_from_slice(title.as_bytes());
    b[t + 0x80..t + 0x80 + maker.len()].copy_from_slice(maker.as_bytes());
    b
}
