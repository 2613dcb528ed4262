// Snapshot format - gzip-compressed JSON envelope
//
// ```text
// {
//   "Version": 2,
//   "Info":    "famigo snapshot",
//   "State":   { ...emulator state... },
//   "MMC":     { "Number": n, "Data": { ...mapper state... } },
//   "ChrRAM":  [ ... ]            // only when CHR is RAM
// }
// ```
//
// ROM buffers never travel in a snapshot; they are reattached from the
// running machine on load. Older snapshot versions are migrated forward by
// a chain of map transforms keyed by their source version.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Nes;
use crate::cartridge::mappers::{Mapper, MapperError, MapperSnapshot};

const CURRENT_SNAPSHOT_VERSION: i64 = 2;
const INFO_STRING: &str = "famigo snapshot";

/// Reasons a snapshot fails to load; the running session is unaffected
#[derive(Debug)]
pub enum SnapshotError {
    /// Not gzip, truncated, or not the expected JSON shape
    Malformed(String),
    /// Written by a newer build than this one
    TooNew(i64),
    /// No registered converter covers this version
    UnknownVersion(i64),
    /// A version converter rejected the state
    Conversion(i64, String),
    /// The snapshot's mapper does not match the loaded cartridge
    MapperMismatch { snapshot: u32, cartridge: u32 },
    /// Mapper payload failed to decode
    Mapper(MapperError),
    /// CHR-RAM payload missing or the wrong size
    BadChrRam,
    /// This emulator (e.g. the error screen) has no snapshot support
    Unsupported,
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Malformed(msg) => write!(f, "malformed snapshot: {}", msg),
            SnapshotError::TooNew(v) => {
                write!(f, "this build is too old to open a version {} snapshot", v)
            }
            SnapshotError::UnknownVersion(v) => write!(f, "unknown snapshot version: {}", v),
            SnapshotError::Conversion(v, msg) => {
                write!(f, "error converting snapshot version {}: {}", v, msg)
            }
            SnapshotError::MapperMismatch {
                snapshot,
                cartridge,
            } => write!(
                f,
                "snapshot is for mapper {} but the cartridge uses mapper {}",
                snapshot, cartridge
            ),
            SnapshotError::Mapper(e) => write!(f, "{}", e),
            SnapshotError::BadChrRam => write!(f, "snapshot CHR-RAM missing or wrong size"),
            SnapshotError::Unsupported => write!(f, "snapshots not supported here"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<MapperError> for SnapshotError {
    fn from(e: MapperError) -> Self {
        SnapshotError::Mapper(e)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Malformed(e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Snapshot {
    version: i64,
    info: String,
    state: Value,
    #[serde(rename = "MMC")]
    mmc: MapperSnapshot,
    #[serde(rename = "ChrRAM", default, skip_serializing_if = "Option::is_none")]
    chr_ram: Option<Vec<u8>>,
}

type Converter = fn(&mut Map<String, Value>) -> Result<(), String>;

/// Converters keyed by the version they read; each advances one version
fn converter_for(version: i64) -> Option<Converter> {
    match version {
        1 => Some(convert_snap_1_to_2),
        _ => None,
    }
}

/// Version 1 kept the CPU registers inline on the state object; version 2
/// nests them under "CPU" alongside the NES-variant decimal flag marker
fn convert_snap_1_to_2(state: &mut Map<String, Value>) -> Result<(), String> {
    let mut cpu = Map::new();
    cpu.insert("IgnoreDecimalMode".into(), Value::Bool(true));
    for key in [
        "PC",
        "P",
        "A",
        "X",
        "Y",
        "S",
        "IRQ",
        "BRK",
        "NMI",
        "RESET",
        "LastStepsP",
        "Steps",
    ] {
        let val = state
            .remove(key)
            .ok_or_else(|| format!("missing key {}", key))?;
        cpu.insert(key.into(), val);
    }
    state.insert("CPU".into(), Value::Object(cpu));
    Ok(())
}

impl Nes {
    /// Serialize the machine into the gzip+JSON envelope
    pub fn make_snapshot_bytes(&self) -> Vec<u8> {
        let state = serde_json::to_value(self).expect("machine state is always representable");
        let snap = Snapshot {
            version: CURRENT_SNAPSHOT_VERSION,
            info: INFO_STRING.into(),
            state,
            mmc: self.mapper.to_snapshot(),
            chr_ram: if self.cart_info.is_chr_ram() {
                Some(self.mem.chr.clone())
            } else {
                None
            },
        };
        let json = serde_json::to_vec(&snap).expect("snapshot envelope is always representable");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .and_then(|_| encoder.finish())
            .expect("gzip to memory cannot fail")
    }

    /// Build a replacement machine from snapshot bytes, reattaching the
    /// ROM buffers and host config from the running one
    pub fn load_snapshot_bytes(&self, data: &[u8]) -> Result<Nes, SnapshotError> {
        let mut json = Vec::new();
        GzDecoder::new(data)
            .read_to_end(&mut json)
            .map_err(|e| SnapshotError::Malformed(e.to_string()))?;
        let mut snap: Snapshot = serde_json::from_slice(&json)?;

        if snap.version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::TooNew(snap.version));
        }
        if snap.version < CURRENT_SNAPSHOT_VERSION {
            snap = self.convert_old_snapshot(snap)?;
        }

        if snap.mmc.number != self.mapper.number() {
            return Err(SnapshotError::MapperMismatch {
                snapshot: snap.mmc.number,
                cartridge: self.mapper.number(),
            });
        }

        let mut machine: Nes = serde_json::from_value(snap.state)?;
        machine.mapper = Mapper::from_snapshot(&snap.mmc)?;
        machine.config = self.config.clone();
        machine.mem.prg_rom = self.mem.prg_rom.clone();
        machine.mem.chr = if self.cart_info.is_chr_ram() {
            match snap.chr_ram {
                Some(chr) if chr.len() == self.mem.chr.len() => chr,
                _ => return Err(SnapshotError::BadChrRam),
            }
        } else {
            self.mem.chr.clone()
        };

        Ok(machine)
    }

    /// Run the converter chain from the snapshot's version up to current
    fn convert_old_snapshot(&self, mut snap: Snapshot) -> Result<Snapshot, SnapshotError> {
        let mut state = match snap.state {
            Value::Object(map) => map,
            _ => return Err(SnapshotError::Malformed("state is not an object".into())),
        };

        let mut version = snap.version;
        while version < CURRENT_SNAPSHOT_VERSION {
            let convert =
                converter_for(version).ok_or(SnapshotError::UnknownVersion(version))?;
            convert(&mut state).map_err(|msg| SnapshotError::Conversion(version, msg))?;
            version += 1;
        }

        snap.state = Value::Object(state);
        snap.version = version;
        Ok(snap)
    }
}
