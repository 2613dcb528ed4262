// NSF and NSFE file parsing
//
// NSF is a 128-byte little-endian header followed by raw 6502 code/data.
// NSFE wraps the same information in `{u32 length, fourcc, payload}`
// chunks: INFO/DATA/NEND are required, lowercase-first chunks are optional
// extensions, and an unknown chunk starting with an uppercase letter is an
// error because players must not ignore required data.

use crate::cartridge::RomError;

/// Length of the fixed NSF header
pub const NSF_HEADER_LEN: usize = 0x80;

/// Parsed NSF header fields
#[derive(Debug, Clone)]
pub struct NsfHeader {
    pub version: u8,
    pub num_songs: u8,
    /// 1-based index of the song to start on
    pub start_song: u8,
    pub load_addr: u16,
    pub init_addr: u16,
    pub play_addr: u16,
    pub song_name: String,
    pub artist_name: String,
    pub copyright_name: String,
    /// PLAY call period in microseconds
    pub play_speed_ntsc: u16,
    pub play_speed_pal: u16,
    pub bank_vals: [u8; 8],
    /// Bit 0: PAL; bit 1: dual-standard
    pub tv_std_flags: u8,
    pub sound_chip_flags: u8,
}

impl NsfHeader {
    pub fn is_ntsc(&self) -> bool {
        self.tv_std_flags & 0x01 == 0 || self.tv_std_flags & 0x02 != 0
    }

    /// A single non-zero bank value selects the banked (mapper 31) layout
    pub fn uses_banks(&self) -> bool {
        self.bank_vals.iter().any(|&b| b != 0)
    }

    /// PLAY period in microseconds for the active TV standard
    pub fn play_speed_us(&self) -> u16 {
        if self.is_ntsc() {
            self.play_speed_ntsc
        } else {
            self.play_speed_pal
        }
    }
}

/// Optional NSFE metadata
#[derive(Debug, Clone, Default)]
pub struct NsfeExtras {
    /// Playback time per song in milliseconds
    pub times_ms: Vec<i32>,
    /// Fade-out time per song in milliseconds
    pub fades_ms: Vec<i32>,
    /// Per-song titles
    pub track_labels: Vec<String>,
    /// Game / artist / copyright / ripper
    pub auth: Vec<String>,
    pub text: String,
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn nul_padded_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Parse a plain NSF image; returns the header and the code/data payload
pub fn parse_nsf(file: &[u8]) -> Result<(NsfHeader, Vec<u8>), RomError> {
    if file.len() < NSF_HEADER_LEN {
        return Err(RomError::BadMusicFile("nsf file too short".into()));
    }
    if &file[0..5] != b"NESM\x1A" {
        return Err(RomError::BadMusicFile("bad nsf magic".into()));
    }

    let header = NsfHeader {
        version: file[0x05],
        num_songs: file[0x06],
        start_song: file[0x07],
        load_addr: read_u16(file, 0x08),
        init_addr: read_u16(file, 0x0A),
        play_addr: read_u16(file, 0x0C),
        song_name: nul_padded_string(&file[0x0E..0x2E]),
        artist_name: nul_padded_string(&file[0x2E..0x4E]),
        copyright_name: nul_padded_string(&file[0x4E..0x6E]),
        play_speed_ntsc: read_u16(file, 0x6E),
        bank_vals: file[0x70..0x78].try_into().expect("slice is 8 bytes"),
        play_speed_pal: read_u16(file, 0x78),
        tv_std_flags: file[0x7A],
        sound_chip_flags: file[0x7B],
    };

    if header.version != 1 {
        return Err(RomError::BadMusicFile(format!(
            "unsupported nsf version {}",
            header.version
        )));
    }
    if header.sound_chip_flags != 0 {
        return Err(RomError::BadMusicFile(format!(
            "needs unimplemented expansion chip: {:#04x}",
            header.sound_chip_flags
        )));
    }

    Ok((header, file[NSF_HEADER_LEN..].to_vec()))
}

/// Default PLAY period for NSFE images, which carry no speed field
const NSFE_DEFAULT_SPEED_US: u16 = 16639;

/// Parse an NSFE image into the equivalent header plus extras
pub fn parse_nsfe(file: &[u8]) -> Result<(NsfHeader, NsfeExtras, Vec<u8>), RomError> {
    if file.len() < 4 || &file[0..4] != b"NSFE" {
        return Err(RomError::BadMusicFile("bad nsfe magic".into()));
    }

    let mut header: Option<NsfHeader> = None;
    let mut extras = NsfeExtras::default();
    let mut data: Option<Vec<u8>> = None;
    let mut bank_vals = [0u8; 8];
    let mut saw_nend = false;

    let mut offset = 4;
    while offset + 8 <= file.len() {
        let length = u32::from_le_bytes(file[offset..offset + 4].try_into().unwrap()) as usize;
        let fourcc: [u8; 4] = file[offset + 4..offset + 8].try_into().unwrap();
        offset += 8;
        if offset + length > file.len() {
            return Err(RomError::BadMusicFile(format!(
                "truncated {} chunk",
                String::from_utf8_lossy(&fourcc)
            )));
        }
        let payload = &file[offset..offset + length];
        offset += length;

        match &fourcc {
            b"INFO" => {
                if length < 8 {
                    return Err(RomError::BadMusicFile("short INFO chunk".into()));
                }
                header = Some(NsfHeader {
                    version: 1,
                    // Song count and 0-based start song are optional
                    num_songs: payload.get(8).copied().unwrap_or(1),
                    start_song: payload.get(9).copied().unwrap_or(0).saturating_add(1),
                    load_addr: read_u16(payload, 0),
                    init_addr: read_u16(payload, 2),
                    play_addr: read_u16(payload, 4),
                    song_name: String::new(),
                    artist_name: String::new(),
                    copyright_name: String::new(),
                    play_speed_ntsc: NSFE_DEFAULT_SPEED_US,
                    bank_vals: [0; 8],
                    play_speed_pal: NSFE_DEFAULT_SPEED_US,
                    tv_std_flags: payload[6],
                    sound_chip_flags: payload[7],
                });
            }
            b"DATA" => data = Some(payload.to_vec()),
            b"NEND" => {
                saw_nend = true;
                break;
            }
            b"BANK" => {
                for (slot, &val) in bank_vals.iter_mut().zip(payload.iter()).take(8) {
                    *slot = val;
                }
            }
            b"time" => {
                extras.times_ms = payload
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
                    .collect();
            }
            b"fade" => {
                extras.fades_ms = payload
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
                    .collect();
            }
            b"tlbl" => {
                extras.track_labels = payload
                    .split(|&b| b == 0)
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
            }
            b"auth" => {
                extras.auth = payload
                    .split(|&b| b == 0)
                    .filter(|s| !s.is_empty())
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
            }
            b"plst" | b"text" => {
                if fourcc == *b"text" {
                    extras.text = String::from_utf8_lossy(payload).into_owned();
                }
            }
            other => {
                // Uppercase-first chunks are required by the format; only
                // lowercase-first extensions may be skipped
                if other[0].is_ascii_uppercase() {
                    return Err(RomError::BadMusicFile(format!(
                        "unknown required nsfe chunk {}",
                        String::from_utf8_lossy(other)
                    )));
                }
            }
        }
    }

    if !saw_nend {
        return Err(RomError::BadMusicFile("missing NEND chunk".into()));
    }
    let mut header = header.ok_or_else(|| RomError::BadMusicFile("missing INFO chunk".into()))?;
    let data = data.ok_or_else(|| RomError::BadMusicFile("missing DATA chunk".into()))?;

    header.bank_vals = bank_vals;
    if header.sound_chip_flags != 0 {
        return Err(RomError::BadMusicFile(format!(
            "needs unimplemented expansion chip: {:#04x}",
            header.sound_chip_flags
        )));
    }

    // The auth chunk carries game/artist/copyright/ripper in order
    let mut auth = extras.auth.iter();
    if let Some(game) = auth.next() {
        header.song_name = game.clone();
    }
    if let Some(artist) = auth.next() {
        header.artist_name = artist.clone();
    }
    if let Some(copyright) = auth.next() {
        header.copyright_name = copyright.clone();
    }

    Ok((header, extras, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nsf_image() -> Vec<u8> {
        let mut file = vec![0u8; NSF_HEADER_LEN + 4];
        file[0..5].copy_from_slice(b"NESM\x1A");
        file[0x05] = 1; // version
        file[0x06] = 3; // songs
        file[0x07] = 1; // start song
        file[0x08..0x0A].copy_from_slice(&0x8000u16.to_le_bytes());
        file[0x0A..0x0C].copy_from_slice(&0x8003u16.to_le_bytes());
        file[0x0C..0x0E].copy_from_slice(&0x8006u16.to_le_bytes());
        file[0x0E..0x13].copy_from_slice(b"Title");
        file[0x6E..0x70].copy_from_slice(&16666u16.to_le_bytes());
        file
    }

    #[test]
    fn test_parse_nsf_header_fields() {
        let (header, data) = parse_nsf(&nsf_image()).unwrap();
        assert_eq!(header.num_songs, 3);
        assert_eq!(header.load_addr, 0x8000);
        assert_eq!(header.song_name, "Title");
        assert!(header.is_ntsc());
        assert!(!header.uses_banks());
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_parse_nsf_rejects_bad_version() {
        let mut file = nsf_image();
        file[0x05] = 2;
        assert!(parse_nsf(&file).is_err());
    }

    #[test]
    fn test_parse_nsf_rejects_expansion_chips() {
        let mut file = nsf_image();
        file[0x7B] = 0x01; // VRC6
        assert!(parse_nsf(&file).is_err());
    }

    fn chunk(fourcc: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(fourcc);
        out.extend_from_slice(payload);
        out
    }

    fn nsfe_image() -> Vec<u8> {
        let mut info = Vec::new();
        info.extend_from_slice(&0x8000u16.to_le_bytes());
        info.extend_from_slice(&0x8003u16.to_le_bytes());
        info.extend_from_slice(&0x8006u16.to_le_bytes());
        info.push(0); // NTSC
        info.push(0); // no chips
        info.push(2); // songs
        info.push(0); // start song (0-based)

        let mut file = b"NSFE".to_vec();
        file.extend(chunk(b"INFO", &info));
        file.extend(chunk(b"DATA", &[0xEA; 16]));
        file.extend(chunk(b"time", &[0x10, 0x27, 0, 0, 0x20, 0x4E, 0, 0]));
        file.extend(chunk(b"tlbl", b"First\0Second\0"));
        file.extend(chunk(b"NEND", &[]));
        file
    }

    #[test]
    fn test_parse_nsfe_round() {
        let (header, extras, data) = parse_nsfe(&nsfe_image()).unwrap();
        assert_eq!(header.num_songs, 2);
        assert_eq!(header.start_song, 1);
        assert_eq!(header.load_addr, 0x8000);
        assert_eq!(data.len(), 16);
        assert_eq!(extras.times_ms, vec![10_000, 20_000]);
        assert_eq!(extras.track_labels[0], "First");
    }

    #[test]
    fn test_parse_nsfe_requires_nend() {
        let mut file = b"NSFE".to_vec();
        file.extend(chunk(b"INFO", &[0; 10]));
        file.extend(chunk(b"DATA", &[0; 4]));
        assert!(parse_nsfe(&file).is_err());
    }

    #[test]
    fn test_parse_nsfe_unknown_uppercase_chunk_errors() {
        let mut file = b"NSFE".to_vec();
        file.extend(chunk(b"INFO", &[0; 10]));
        file.extend(chunk(b"DATA", &[0; 4]));
        file.extend(chunk(b"RATE", &[0; 6]));
        file.extend(chunk(b"NEND", &[]));
        assert!(parse_nsfe(&file).is_err());
    }

    #[test]
    fn test_parse_nsfe_unknown_lowercase_chunk_ignored() {
        let mut file = b"NSFE".to_vec();
        file.extend(chunk(b"INFO", &[0; 10]));
        file.extend(chunk(b"DATA", &[0; 4]));
        file.extend(chunk(b"vibe", &[1, 2, 3]));
        file.extend(chunk(b"NEND", &[]));
        assert!(parse_nsfe(&file).is_ok());
    }

    #[test]
    fn test_parse_nsfe_bank_chunk() {
        let mut file = b"NSFE".to_vec();
        file.extend(chunk(b"INFO", &[0x00, 0x90, 0, 0x90, 0, 0x90, 0, 0, 1, 0]));
        file.extend(chunk(b"BANK", &[0, 1, 2, 3, 4, 5, 6, 7]));
        file.extend(chunk(b"DATA", &[0; 4]));
        file.extend(chunk(b"NEND", &[]));
        let (header, _, _) = parse_nsfe(&file).unwrap();
        assert!(header.uses_banks());
        assert_eq!(header.bank_vals[7], 7);
    }
}
