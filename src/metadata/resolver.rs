use std::{
    fs::File,
    io::BufReader,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::anyhow;

use crate::foundation::error::{StampError, StampResult};
use crate::metadata::bag::{CREATION_TIME, FILE_SIZE, MODIFIED_TIME, MetadataBag, MetadataValue};

/// Build the merged metadata bag for the image at `path`.
///
/// Fails with [`StampError::UnreadableSource`] when the file is not an image
/// the decoder recognises. Missing or unparsable EXIF is not a failure.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.display()))]
pub fn resolve(path: &Path) -> StampResult<MetadataBag> {
    probe_image(path)?;

    let mut bag = read_filesystem(path)?;
    let embedded = read_embedded(path);
    tracing::debug!(embedded = embedded.len(), "metadata read");
    bag.merge_embedded(embedded);
    Ok(bag)
}

fn probe_image(path: &Path) -> StampResult<()> {
    let unreadable =
        |e: &dyn std::fmt::Display| StampError::unreadable_source(format!("'{}': {e}", path.display()));

    image::ImageReader::open(path)
        .map_err(|e| unreadable(&e))?
        .with_guessed_format()
        .map_err(|e| unreadable(&e))?
        .into_dimensions()
        .map_err(|e| unreadable(&e))?;
    Ok(())
}

/// Size plus creation and modification times, as epoch seconds.
///
/// Platforms without a birth time report the modification time as creation time.
pub fn read_filesystem(path: &Path) -> StampResult<MetadataBag> {
    let meta = std::fs::metadata(path).map_err(|e| {
        StampError::unreadable_source(format!("stat '{}': {e}", path.display()))
    })?;

    let modified = meta.modified().ok();
    let created = meta.created().ok().or(modified);
    let (Some(created), Some(modified)) = (created, modified) else {
        return Err(anyhow!("filesystem timestamps unavailable for '{}'", path.display()).into());
    };

    let mut bag = MetadataBag::new();
    bag.insert(FILE_SIZE, MetadataValue::Integer(meta.len() as i64));
    bag.insert(CREATION_TIME, MetadataValue::Float(epoch_secs(created)));
    bag.insert(MODIFIED_TIME, MetadataValue::Float(epoch_secs(modified)));
    Ok(bag)
}

fn epoch_secs(t: SystemTime) -> f64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    }
}

/// EXIF fields of the primary image, keyed by tag name.
pub fn read_embedded(path: &Path) -> MetadataBag {
    let mut bag = MetadataBag::new();
    let Ok(file) = File::open(path) else {
        return bag;
    };
    let mut reader = BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::debug!(error = %e, "no embedded metadata");
            return bag;
        }
    };

    for field in exif.fields() {
        // IFD1 describes the embedded thumbnail, not the photo.
        if field.ifd_num != exif::In::PRIMARY {
            continue;
        }
        let value = exif_value(&field.value)
            .unwrap_or_else(|| MetadataValue::Text(field.display_value().to_string()));
        bag.insert(field.tag.to_string(), value);
    }
    bag
}

fn exif_value(value: &exif::Value) -> Option<MetadataValue> {
    match value {
        exif::Value::Ascii(parts) => {
            let first = parts.first()?;
            let text = String::from_utf8_lossy(first);
            Some(MetadataValue::Text(text.trim_end_matches('\0').to_string()))
        }
        exif::Value::Short(v) if v.len() == 1 => Some(MetadataValue::Integer(i64::from(v[0]))),
        exif::Value::Long(v) if v.len() == 1 => Some(MetadataValue::Integer(i64::from(v[0]))),
        exif::Value::Rational(v) if v.len() == 1 => Some(MetadataValue::Float(v[0].to_f64())),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/metadata/resolver.rs"]
mod tests;
