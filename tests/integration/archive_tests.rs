//! Archive layout tests.
//!
//! These tests inspect raw archive bytes produced by the service and check
//! them field by field, independently of the crate's own decoder where it
//! matters (checksum, size, padding).

use tartiles::archive::{ArchiveReader, BLOCK_SIZE};
use tartiles::error::{ArchiveError, TarTilesError};
use tartiles::tile::TarTileService;

use super::test_utils::{test_raster, MockTileSource};

async fn archive(source: MockTileSource, path: &str) -> Vec<u8> {
    let service = TarTileService::new(source, test_raster());
    let mut out = Vec::new();
    service.write_archive(path, &mut out).await.unwrap();
    out
}

fn parse_octal(field: &[u8]) -> u64 {
    let text: String = field
        .iter()
        .take_while(|&&b| b != 0 && b != b' ')
        .map(|&b| b as char)
        .collect();
    u64::from_str_radix(&text, 8).unwrap()
}

/// Walk the archive and return the offset of every header.
fn header_offsets(data: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        offsets.push(offset);
        let size = parse_octal(&data[offset + 124..offset + 136]) as usize;
        offset += BLOCK_SIZE + size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    }
    offsets
}

fn sample_source() -> MockTileSource {
    MockTileSource::new()
        .with_tile(4, 0, 0, vec![0xffu8; 1])
        .with_tile(4, 0, 1, vec![0x11u8; 512])
        .with_tile(4, 1, 0, vec![0x22u8; 513])
        .with_tile(4, 1, 1, vec![0x33u8; 4096])
}

#[tokio::test]
async fn test_output_is_block_aligned() {
    let data = archive(sample_source(), "/4/0/0/2/2").await;

    assert_eq!(data.len() % BLOCK_SIZE, 0);
    // 1 -> 512, 512 -> 512, 513 -> 1024, 4096 -> 4096, plus four headers
    assert_eq!(data.len(), 4 * 512 + 512 + 512 + 1024 + 4096);
}

#[tokio::test]
async fn test_checksum_matches_byte_sum() {
    let data = archive(sample_source(), "/4/0/0/2/2").await;

    let offsets = header_offsets(&data);
    assert_eq!(offsets.len(), 4);

    for offset in offsets {
        let header = &data[offset..offset + BLOCK_SIZE];
        let sum: u32 = header
            .iter()
            .enumerate()
            .map(|(i, &b)| if (148..156).contains(&i) { 32 } else { b as u32 })
            .sum();

        // Seven octal digits followed by NUL.
        assert_eq!(header[155], 0);
        assert!(header[148..155].iter().all(|b| (b'0'..=b'7').contains(b)));
        assert_eq!(parse_octal(&header[148..156]) as u32, sum & 0o7777777);
    }
}

#[tokio::test]
async fn test_size_field_matches_payload() {
    let data = archive(sample_source(), "/4/0/0/2/2").await;

    let sizes: Vec<u64> = header_offsets(&data)
        .into_iter()
        .map(|offset| {
            let field = &data[offset + 124..offset + 136];
            // Eleven octal digits followed by NUL.
            assert_eq!(field[11], 0);
            parse_octal(field)
        })
        .collect();
    assert_eq!(sizes, vec![1, 512, 513, 4096]);
}

#[tokio::test]
async fn test_header_fixed_fields() {
    let data = archive(sample_source(), "/4/0/0/1/1").await;
    let header = &data[..BLOCK_SIZE];

    assert_eq!(&header[..29], b"L04/R00000000/C00000000.tile\0");
    assert_eq!(&header[100..108], b"0000644\0");
    assert_eq!(&header[108..116], b"0000000\0");
    assert_eq!(&header[116..124], b"0000000\0");
    assert_eq!(&header[136..148], b"00000000000\0");
    assert_eq!(header[156], b'0');
    assert_eq!(&header[257..263], b"ustar\0");
    assert_eq!(&header[263..265], b"00");
    assert_eq!(&header[265..270], b"root\0");
    assert_eq!(&header[297..302], b"root\0");
    assert!(header[345..].iter().all(|&b| b == 0));
}

#[tokio::test]
async fn test_padding_is_zeroed() {
    let data = archive(sample_source(), "/4/1/0/1/1").await;

    assert_eq!(data.len(), BLOCK_SIZE + 1024);
    assert!(data[BLOCK_SIZE..BLOCK_SIZE + 513].iter().all(|&b| b == 0x22));
    assert!(data[BLOCK_SIZE + 513..].iter().all(|&b| b == 0));
}

#[tokio::test]
async fn test_no_end_of_archive_trailer() {
    let data = archive(sample_source(), "/4/0/1/1/1").await;

    // Exactly one header and one payload block.
    assert_eq!(data.len(), 2 * BLOCK_SIZE);
}

#[tokio::test]
async fn test_reader_decodes_service_output() {
    let data = archive(sample_source(), "/4/0/0/2/2").await;

    let entries: Vec<_> = ArchiveReader::new(&data)
        .collect::<Result<_, ArchiveError>>()
        .unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].fields.mode, 0o644);
    assert_eq!(entries[0].fields.mtime, 0);
    assert_eq!(entries[0].fields.typeflag, b'0');
    assert_eq!(entries[3].payload.len(), 4096);
    assert_eq!(entries[3].fields.name, "L04/R00000001/C00000001.tile");
}

#[tokio::test]
async fn test_corrupted_header_detected() {
    let mut data = archive(sample_source(), "/4/0/0/1/1").await;
    data[0] = b'X';

    let result = ArchiveReader::new(&data).next().unwrap();
    assert!(matches!(result, Err(ArchiveError::BadChecksum { .. })));
}

#[tokio::test]
async fn test_empty_range_writes_nothing() {
    let service = TarTileService::new(MockTileSource::new(), test_raster());
    let mut out = Vec::new();

    let err = service.write_archive("/4/0/0/2/2", &mut out).await.unwrap_err();
    assert!(matches!(err, TarTilesError::NoContent));
    assert!(out.is_empty());
}
