//! Beam persistence
//!
//! Layout of a persisted beam:
//!
//! | bytes | content |
//! |-------|---------|
//! | 4     | magic `BMXB` |
//! | 4     | format version, little-endian `u32` |
//! | 4     | scalar width in bytes (4 or 8), little-endian `u32` |
//! | 8     | row count, little-endian `u64` |
//! | 3·w   | `s`, `p0c`, `mc2` |
//! | 6·n·w | coordinates, row-major |
//!
//! Scalars and coordinates are written in host byte order straight from the
//! tensor storage, so a blob is only portable between hosts of equal
//! endianness.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::beam::Beam;
use crate::error::{BeamError, Result};
use crate::precision::{Precision, PrecisionKind};
use crate::tensor::{CoordinateTensor, PHASE_SPACE_DIM};

const MAGIC: [u8; 4] = *b"BMXB";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Write `beam` to `path`, replacing any existing file.
///
/// The blob goes to a temporary sibling first and is renamed into place once
/// fully flushed; on failure the temporary file is removed.
pub fn save_beam<P: Precision>(beam: &Beam<P>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let staging = staging_path(path);

    let written = write_blob(beam, &staging).and_then(|()| fs::rename(&staging, path));
    if let Err(source) = written {
        if staging.exists() {
            if let Err(error) = fs::remove_file(&staging) {
                log::warn!("Failed to remove {}: {error}", staging.display());
            }
        }
        return Err(BeamError::Persistence {
            path: path.to_path_buf(),
            source,
        });
    }

    log::info!(
        "Saved beam ({} particles, {}) to {}",
        beam.particle_count(),
        P::KIND,
        path.display()
    );
    Ok(path.to_path_buf())
}

/// Read a beam written by [`save_beam`] with the same precision.
pub fn load_beam<P: Precision>(path: impl AsRef<Path>) -> Result<Beam<P>> {
    let path = path.as_ref();
    let persistence = |source: io::Error| BeamError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    let bytes = fs::read(path).map_err(persistence)?;
    let (coordinates, [s, p0c, mc2]) = decode::<P>(&bytes).map_err(persistence)?;
    Beam::new(coordinates, s, p0c, mc2)
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "beam".to_string());
    path.with_file_name(format!(".{name}.partial"))
}

fn write_blob<P: Precision>(beam: &Beam<P>, path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&(P::KIND.width() as u32).to_le_bytes())?;
    writer.write_all(&(beam.particle_count() as u64).to_le_bytes())?;
    writer.write_all(bytemuck::cast_slice(&[beam.s(), beam.p0c(), beam.mc2()]))?;
    writer.write_all(beam.coordinates().as_bytes())?;

    let file = writer.into_inner().map_err(|error| error.into_error())?;
    file.sync_all()
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn decode<P: Precision>(bytes: &[u8]) -> io::Result<(CoordinateTensor<P>, [P; 3])> {
    if bytes.len() < HEADER_LEN {
        return Err(invalid_data(format!("beam blob truncated: {} bytes", bytes.len())));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);

    if header[0..4] != MAGIC {
        return Err(invalid_data("not a beam blob (bad magic)".to_string()));
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != FORMAT_VERSION {
        return Err(invalid_data(format!("unsupported beam format version {version}")));
    }
    let width = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    if PrecisionKind::from_width(width) != Some(P::KIND) {
        return Err(invalid_data(format!(
            "beam stored with {width}-byte scalars, expected {}",
            P::KIND
        )));
    }
    let mut count = [0u8; 8];
    count.copy_from_slice(&header[12..20]);
    let rows = usize::try_from(u64::from_le_bytes(count))
        .map_err(|_| invalid_data("row count overflows usize".to_string()))?;

    let expected = rows
        .checked_mul(PHASE_SPACE_DIM)
        .and_then(|values| values.checked_add(3))
        .and_then(|values| values.checked_mul(width))
        .ok_or_else(|| invalid_data("row count overflows usize".to_string()))?;
    if payload.len() != expected {
        return Err(invalid_data(format!(
            "beam blob payload is {} bytes, expected {expected} for {rows} rows",
            payload.len()
        )));
    }

    let (scalars, coordinates) = payload.split_at(3 * width);
    let read = |chunk: &[u8]| bytemuck::pod_read_unaligned::<P>(chunk);
    let scalars: Vec<P> = scalars.chunks_exact(width).map(read).collect();
    let coordinates = CoordinateTensor::from_flat(coordinates.chunks_exact(width).map(read).collect())
        .map_err(|error| invalid_data(error.to_string()))?;
    Ok((coordinates, [scalars[0], scalars[1], scalars[2]]))
}
