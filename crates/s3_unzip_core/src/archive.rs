//! Lazy ZIP decoding over a seekable source.
//!
//! Entry sizes and offsets come from the central directory, so entries whose
//! sizes trail their data (data descriptors) decode like any other. Entries are
//! decoded one at a time in archive order, each drained in fixed-size chunks and
//! handed out as one in-memory buffer.

use std::io::{self, Read, Seek};

use zip::ZipArchive;

use crate::contract::ArchiveEntry;
use crate::error::{Result, UnzipError};

pub const READ_CHUNK_SIZE: usize = 1024;

#[derive(Debug)]
pub struct ArchiveReader<R> {
    // `None` once every entry was read or an entry failed.
    archive: Option<ZipArchive<R>>,
    next_index: usize,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Fails with [`UnzipError::ArchiveFormat`] when `inner` is not a ZIP
    /// archive. An archive without entries is valid.
    pub fn open(inner: R) -> Result<Self> {
        let archive = ZipArchive::new(inner).map_err(UnzipError::ArchiveFormat)?;
        Ok(Self {
            archive: Some(archive),
            next_index: 0,
        })
    }

    /// After an error or the last entry the reader stays exhausted.
    pub fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        let Some(archive) = self.archive.as_mut() else {
            return Ok(None);
        };
        if self.next_index >= archive.len() {
            self.archive = None;
            return Ok(None);
        }

        let index = self.next_index;
        self.next_index += 1;
        let result = read_entry(archive, index);
        if result.is_err() {
            self.archive = None;
        }
        result.map(Some)
    }
}

impl<R: Read + Seek> Iterator for ArchiveReader<R> {
    type Item = Result<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize) -> Result<ArchiveEntry> {
    let mut file = archive.by_index(index).map_err(UnzipError::ArchiveFormat)?;
    let name = file.name().to_string();
    let content = drain_entry(&mut file).map_err(|source| UnzipError::ArchiveRead {
        entry: name.clone(),
        source,
    })?;
    Ok(ArchiveEntry { name, content })
}

fn drain_entry(reader: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut buffer = [0u8; READ_CHUNK_SIZE];
    let mut content = Vec::new();
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => return Ok(content),
            Ok(read) => content.extend_from_slice(&buffer[..read]),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    use super::*;

    // Written by a non-seekable writer: general purpose flag bit 3 is set and
    // sizes follow each entry's data. Entries: `hello.txt` = "world",
    // `logs/app.log` = "line one\nline two\n".
    const DATA_DESCRIPTOR_ARCHIVE: &[u8] = b"\
        \x50\x4b\x03\x04\x14\x00\x08\x00\x08\x00\x00\x00\x21\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\
        \x00\x00\x09\x00\x00\x00\x68\x65\x6c\x6c\x6f\x2e\x74\x78\x74\x2b\xcf\x2f\xca\x49\x01\x00\x50\x4b\
        \x07\x08\x43\x11\x77\x3a\x07\x00\x00\x00\x05\x00\x00\x00\x50\x4b\x03\x04\x14\x00\x08\x00\x08\x00\
        \x00\x00\x21\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x0c\x00\x00\x00\x6c\x6f\x67\x73\
        \x2f\x61\x70\x70\x2e\x6c\x6f\x67\xcb\xc9\xcc\x4b\x55\xc8\xcf\x4b\xe5\xca\x01\x31\x4a\xca\xf3\xb9\
        \x00\x50\x4b\x07\x08\x8b\xd7\xf4\x75\x11\x00\x00\x00\x12\x00\x00\x00\x50\x4b\x01\x02\x14\x03\x14\
        \x00\x08\x00\x08\x00\x00\x00\x21\x00\x43\x11\x77\x3a\x07\x00\x00\x00\x05\x00\x00\x00\x09\x00\x00\
        \x00\x00\x00\x00\x00\x00\x00\x00\x00\x80\x01\x00\x00\x00\x00\x68\x65\x6c\x6c\x6f\x2e\x74\x78\x74\
        \x50\x4b\x01\x02\x14\x03\x14\x00\x08\x00\x08\x00\x00\x00\x21\x00\x8b\xd7\xf4\x75\x11\x00\x00\x00\
        \x12\x00\x00\x00\x0c\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x80\x01\x3e\x00\x00\x00\x6c\x6f\
        \x67\x73\x2f\x61\x70\x70\x2e\x6c\x6f\x67\x50\x4b\x05\x06\x00\x00\x00\x00\x02\x00\x02\x00\x71\x00\
        \x00\x00\x89\x00\x00\x00\x00\x00";

    fn build_archive(entries: &[(&str, &[u8])], method: CompressionMethod) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(method);
        for (name, content) in entries {
            zip.start_file(*name, options).expect("entry should start");
            zip.write_all(content).expect("entry should be written");
        }
        zip.finish().expect("archive should finish").into_inner()
    }

    fn read_all(bytes: Vec<u8>) -> Result<Vec<ArchiveEntry>> {
        ArchiveReader::open(Cursor::new(bytes))?.collect()
    }

    #[test]
    fn yields_entries_in_archive_order() {
        let archive = build_archive(
            &[("log.txt", b"hello"), ("nested/second.log", b"world\n")],
            CompressionMethod::Deflated,
        );

        let entries = read_all(archive).expect("archive should decode");
        assert_eq!(
            entries,
            vec![
                ArchiveEntry {
                    name: "log.txt".to_string(),
                    content: b"hello".to_vec(),
                },
                ArchiveEntry {
                    name: "nested/second.log".to_string(),
                    content: b"world\n".to_vec(),
                },
            ]
        );
    }

    #[test]
    fn reads_entries_with_trailing_data_descriptors() {
        assert_eq!(DATA_DESCRIPTOR_ARCHIVE[6] & 0x08, 0x08);

        let entries = read_all(DATA_DESCRIPTOR_ARCHIVE.to_vec()).expect("archive should decode");
        assert_eq!(
            entries,
            vec![
                ArchiveEntry {
                    name: "hello.txt".to_string(),
                    content: b"world".to_vec(),
                },
                ArchiveEntry {
                    name: "logs/app.log".to_string(),
                    content: b"line one\nline two\n".to_vec(),
                },
            ]
        );
    }

    #[test]
    fn reassembles_entries_larger_than_read_chunk() {
        let line = "2024-01-01T00:00:00Z level=info msg=\"request served\" status=200\n";
        let content = line.repeat(200);
        assert!(content.len() > READ_CHUNK_SIZE * 10);

        for method in [CompressionMethod::Stored, CompressionMethod::Deflated] {
            let archive = build_archive(&[("big.log", content.as_bytes())], method);
            let entries = read_all(archive).expect("archive should decode");
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].content, content.as_bytes());
        }
    }

    #[test]
    fn keeps_multibyte_characters_across_chunk_boundaries() {
        // "é" is two bytes and starts at the last byte of the first chunk.
        let content = format!("{}é{}", "a".repeat(READ_CHUNK_SIZE - 1), "ü".repeat(600));
        assert_eq!(content.as_bytes()[READ_CHUNK_SIZE - 1], 0xc3);

        for method in [CompressionMethod::Stored, CompressionMethod::Deflated] {
            let archive = build_archive(&[("utf8.log", content.as_bytes())], method);
            let entries = read_all(archive).expect("archive should decode");
            let decoded =
                String::from_utf8(entries[0].content.clone()).expect("content should stay UTF-8");
            assert_eq!(decoded, content);
        }
    }

    #[test]
    fn empty_archive_yields_no_entries() {
        let archive = build_archive(&[], CompressionMethod::Deflated);

        let mut reader = ArchiveReader::open(Cursor::new(archive)).expect("empty archive is valid");
        assert!(reader.next_entry().expect("empty archive is valid").is_none());
    }

    #[test]
    fn keeps_empty_entries() {
        let archive = build_archive(&[("empty.txt", b"")], CompressionMethod::Deflated);

        let entries = read_all(archive).expect("archive should decode");
        assert_eq!(entries.len(), 1);
        assert!(entries[0].content.is_empty());
    }

    #[test]
    fn rejects_non_zip_stream() {
        let error = read_all(b"definitely not a zip archive".to_vec())
            .expect_err("plain text should be rejected");
        assert!(matches!(error, UnzipError::ArchiveFormat(_)));
    }

    #[test]
    fn rejects_empty_stream() {
        let error = read_all(Vec::new()).expect_err("empty stream should be rejected");
        assert!(matches!(error, UnzipError::ArchiveFormat(_)));
    }

    #[test]
    fn rejects_truncated_archive() {
        let archive = build_archive(
            &[("log.txt", "x".repeat(4096).as_bytes())],
            CompressionMethod::Stored,
        );
        let truncated = archive[..archive.len() / 2].to_vec();

        let error = read_all(truncated).expect_err("truncated archive should be rejected");
        assert!(matches!(error, UnzipError::ArchiveFormat(_)));
    }

    #[test]
    fn corrupted_entry_fails_and_fuses_reader() {
        let mut archive = build_archive(
            &[
                ("log.txt", "x".repeat(4096).as_bytes()),
                ("next.txt", b"after"),
            ],
            CompressionMethod::Stored,
        );
        let data_start = archive
            .windows(64)
            .position(|window| window.iter().all(|byte| *byte == b'x'))
            .expect("stored content should be present");
        archive[data_start + 100] = b'y';

        let mut reader = ArchiveReader::open(Cursor::new(archive)).expect("directory is intact");
        let error = reader
            .next_entry()
            .expect_err("checksum mismatch should be rejected");
        assert!(matches!(error, UnzipError::ArchiveRead { ref entry, .. } if entry == "log.txt"));
        assert!(reader.next().is_none());
    }
}
