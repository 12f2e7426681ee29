//! Shared test utilities for integration tests.
//!
//! Archives are built by hand so tests control every offset, and external
//! tools are replaced by a scripted runner with deterministic output.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use apkdelta::zip::extract::read_entry;
use apkdelta::{ArchiveDirectory, EstimateError, Result, Tool, ToolInvocation, ToolRunner};
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder};

struct PendingEntry {
    name: Vec<u8>,
    data: Vec<u8>,
    deflate: bool,
    descriptor: Option<Descriptor>,
}

/// Trailing data descriptor layout (general purpose flag bit 3).
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    /// Preceded by the optional `PK\x07\x08` signature, 16 bytes.
    Signed,
    /// Bare CRC and sizes, 12 bytes.
    Unsigned,
}

/// Builds ZIP archives entry by entry, in order.
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<PendingEntry>,
    comment: Vec<u8>,
}

/// Archive bytes plus where the builder put each record.
pub struct BuiltArchive {
    pub bytes: Vec<u8>,
    /// Local header offset of each entry, in build order.
    pub offsets: Vec<u64>,
    /// Compressed size of each entry, in build order.
    pub compressed_sizes: Vec<u64>,
    pub cd_offset: usize,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &[u8], data: &[u8], deflate: bool, descriptor: Option<Descriptor>) -> Self {
        self.entries.push(PendingEntry {
            name: name.to_vec(),
            data: data.to_vec(),
            deflate,
            descriptor,
        });
        self
    }

    pub fn stored(self, name: impl AsRef<[u8]>, data: impl AsRef<[u8]>) -> Self {
        self.push(name.as_ref(), data.as_ref(), false, None)
    }

    pub fn deflated(self, name: impl AsRef<[u8]>, data: impl AsRef<[u8]>) -> Self {
        self.push(name.as_ref(), data.as_ref(), true, None)
    }

    /// Deflated entry whose CRC and sizes follow the data, as `jar` writes them.
    pub fn streamed(self, name: impl AsRef<[u8]>, data: impl AsRef<[u8]>, descriptor: Descriptor) -> Self {
        self.push(name.as_ref(), data.as_ref(), true, Some(descriptor))
    }

    pub fn comment(mut self, comment: impl AsRef<[u8]>) -> Self {
        self.comment = comment.as_ref().to_vec();
        self
    }

    pub fn build(&self) -> BuiltArchive {
        let mut out = Vec::new();
        let mut central = Vec::new();
        let mut offsets = Vec::new();
        let mut compressed_sizes = Vec::new();

        for entry in &self.entries {
            let crc = crc32fast::hash(&entry.data);
            let (method, payload) = if entry.deflate {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(&entry.data).unwrap();
                (8u16, enc.finish().unwrap())
            } else {
                (0u16, entry.data.clone())
            };
            let offset = out.len() as u32;
            offsets.push(offset as u64);
            compressed_sizes.push(payload.len() as u64);
            let flags: u16 = if entry.descriptor.is_some() { 1 << 3 } else { 0 };
            // With a descriptor the local header carries zeros.
            let (local_crc, local_csize, local_usize) = match entry.descriptor {
                Some(_) => (0, 0, 0),
                None => (crc, payload.len() as u32, entry.data.len() as u32),
            };

            put_u32(&mut out, 0x0403_4b50);
            put_u16(&mut out, 20); // version needed
            put_u16(&mut out, flags);
            put_u16(&mut out, method);
            put_u16(&mut out, 0); // time
            put_u16(&mut out, 0); // date
            put_u32(&mut out, local_crc);
            put_u32(&mut out, local_csize);
            put_u32(&mut out, local_usize);
            put_u16(&mut out, entry.name.len() as u16);
            put_u16(&mut out, 0); // extra
            out.extend_from_slice(&entry.name);
            out.extend_from_slice(&payload);
            if let Some(descriptor) = entry.descriptor {
                if descriptor == Descriptor::Signed {
                    put_u32(&mut out, 0x0807_4b50);
                }
                put_u32(&mut out, crc);
                put_u32(&mut out, payload.len() as u32);
                put_u32(&mut out, entry.data.len() as u32);
            }

            put_u32(&mut central, 0x0201_4b50);
            put_u16(&mut central, 20); // version made by
            put_u16(&mut central, 20); // version needed
            put_u16(&mut central, flags);
            put_u16(&mut central, method);
            put_u16(&mut central, 0);
            put_u16(&mut central, 0);
            put_u32(&mut central, crc);
            put_u32(&mut central, payload.len() as u32);
            put_u32(&mut central, entry.data.len() as u32);
            put_u16(&mut central, entry.name.len() as u16);
            put_u16(&mut central, 0); // extra
            put_u16(&mut central, 0); // comment
            put_u16(&mut central, 0); // disk
            put_u16(&mut central, 0); // internal attributes
            put_u32(&mut central, 0); // external attributes
            put_u32(&mut central, offset);
            central.extend_from_slice(&entry.name);
        }

        let cd_offset = out.len();
        out.extend_from_slice(&central);
        put_u32(&mut out, 0x0605_4b50);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u16(&mut out, self.entries.len() as u16);
        put_u16(&mut out, self.entries.len() as u16);
        put_u32(&mut out, central.len() as u32);
        put_u32(&mut out, cd_offset as u32);
        put_u16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);

        BuiltArchive {
            bytes: out,
            offsets,
            compressed_sizes,
            cd_offset,
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.build().bytes
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        std::fs::write(path, self.bytes()).unwrap();
        path.to_path_buf()
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Deterministic filler of `len` bytes that deflate cannot shrink much.
pub fn noise(seed: u32, len: usize) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Length of the fake file-by-file patch header.
pub const FAKE_FBF_HEADER_LEN: usize = 16;
/// Stand-in for an entry that did not change.
pub const FAKE_FBF_UNCHANGED: &[u8; 8] = b"SAME\0\0\0\0";

/// Tool runner that produces output in-process.
///
/// * file-by-file: a 16-byte header, then for every new entry its name and
///   either an 8-byte marker (same as the old entry) or its full data
/// * bsdiff: a 32-byte header and a bzip2 stream of the new file's bytes
///   after the prefix it shares with the old file
/// * gzip: real gzip through flate2
/// * brotli: raw deflate through flate2, written to `<input>.br`
#[derive(Default)]
pub struct FakeTools {
    failing: BTreeSet<Tool>,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `tool` fail.
    pub fn failing(mut self, tool: Tool) -> Self {
        self.failing.insert(tool);
        self
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, tool: Tool) -> Vec<ToolInvocation> {
        self.calls().into_iter().filter(|c| c.tool == tool).collect()
    }
}

fn io_err(tool: Tool, e: std::io::Error) -> EstimateError {
    EstimateError::tool(tool.id(), e.to_string())
}

fn fake_file_by_file(invocation: &ToolInvocation) -> Result<()> {
    let tool = Tool::FileByFile;
    let path = |flag: &str| {
        invocation
            .flag_value(flag)
            .map(Path::to_path_buf)
            .ok_or_else(|| EstimateError::tool(tool.id(), format!("missing {flag}")))
    };
    let old_path = path("--old")?;
    let new_path = path("--new")?;
    let patch_path = path("--patch")?;

    let old = ArchiveDirectory::parse(std::fs::read(&old_path).map_err(|e| io_err(tool, e))?)?;
    let new = ArchiveDirectory::parse(std::fs::read(&new_path).map_err(|e| io_err(tool, e))?)?;

    let mut patch = b"FAKEFBF1".to_vec();
    patch.resize(FAKE_FBF_HEADER_LEN, 0);
    for entry in new.entries() {
        let data = read_entry(&new, &entry.raw_name)?;
        patch.extend_from_slice(&entry.raw_name);
        let unchanged = old.entry(&entry.raw_name).is_some() && read_entry(&old, &entry.raw_name)? == data;
        if unchanged {
            patch.extend_from_slice(FAKE_FBF_UNCHANGED);
        } else {
            patch.extend_from_slice(&data);
        }
    }
    std::fs::write(&patch_path, patch).map_err(|e| io_err(tool, e))
}

fn fake_bsdiff(invocation: &ToolInvocation) -> Result<()> {
    let tool = Tool::Bsdiff;
    let [old, new, patch] = invocation.args.as_slice() else {
        return Err(EstimateError::tool(tool.id(), "expected OLD NEW PATCH"));
    };
    let old = std::fs::read(old).map_err(|e| io_err(tool, e))?;
    let new = std::fs::read(new).map_err(|e| io_err(tool, e))?;
    let shared = old.iter().zip(&new).take_while(|(a, b)| a == b).count();

    let mut out = b"BSDIFF40".to_vec();
    out.resize(32, 0);
    let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
    enc.write_all(&new[shared..]).map_err(|e| io_err(tool, e))?;
    out.extend(enc.finish().map_err(|e| io_err(tool, e))?);
    std::fs::write(patch, out).map_err(|e| io_err(tool, e))
}

fn fake_gzip(invocation: &ToolInvocation) -> Result<()> {
    let tool = Tool::Gzip;
    let (Some(input), Some(output)) = (&invocation.stdin, &invocation.stdout) else {
        return Err(EstimateError::tool(tool.id(), "expected stdin and stdout redirection"));
    };
    let data = std::fs::read(input).map_err(|e| io_err(tool, e))?;
    let mut enc = GzEncoder::new(Vec::new(), Compression::best());
    enc.write_all(&data).map_err(|e| io_err(tool, e))?;
    let compressed = enc.finish().map_err(|e| io_err(tool, e))?;
    std::fs::write(output, compressed).map_err(|e| io_err(tool, e))
}

fn fake_brotli(invocation: &ToolInvocation) -> Result<()> {
    let tool = Tool::Brotli;
    let input = invocation
        .args
        .last()
        .map(PathBuf::from)
        .ok_or_else(|| EstimateError::tool(tool.id(), "no input"))?;
    let mut output = input.clone().into_os_string();
    output.push(".br");
    let output = PathBuf::from(output);
    if output.exists() {
        return Err(EstimateError::tool(tool.id(), "output exists"));
    }
    let data = std::fs::read(&input).map_err(|e| io_err(tool, e))?;
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::best());
    enc.write_all(&data).map_err(|e| io_err(tool, e))?;
    let compressed = enc.finish().map_err(|e| io_err(tool, e))?;
    std::fs::write(output, compressed).map_err(|e| io_err(tool, e))
}

#[async_trait]
impl ToolRunner for FakeTools {
    async fn run(&self, invocation: &ToolInvocation) -> Result<()> {
        self.calls.lock().unwrap().push(invocation.clone());
        if self.failing.contains(&invocation.tool) {
            return Err(EstimateError::tool(invocation.tool.id(), "exit status: 1"));
        }
        match invocation.tool {
            Tool::FileByFile => fake_file_by_file(invocation),
            Tool::Bsdiff => fake_bsdiff(invocation),
            Tool::Gzip => fake_gzip(invocation),
            Tool::Brotli => fake_brotli(invocation),
        }
    }
}
