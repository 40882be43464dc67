//! The click flow: a point on the map resolves to the verse pair whose
//! similarity the pixel under it encodes.

use corpus::{VerseOrdinal, VerseRecord};
use projection::{NATIVE_ZOOM, PixelCoordinate, ProjectedCoordinate, projected_to_pixel};
use store::{ResolveError, VerseResolver};

/// What a pixel popup shows. Each axis value is a verse ordinal; a `None`
/// verse means the store had no record for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelReport {
    pub pixel: PixelCoordinate,
    pub x_verse: Option<VerseRecord>,
    pub y_verse: Option<VerseRecord>,
}

impl std::fmt::Display for PixelReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Coordinates: {}", self.pixel)?;
        match &self.x_verse {
            Some(verse) => {
                writeln!(f, "X Citation: {}", verse.citation)?;
                writeln!(f, "X Text: {}", verse.text)?;
            }
            None => writeln!(f, "X Verse: (not found)")?,
        }
        match &self.y_verse {
            Some(verse) => {
                writeln!(f, "Y Citation: {}", verse.citation)?;
                write!(f, "Y Text: {}", verse.text)
            }
            None => write!(f, "Y Verse: (not found)"),
        }
    }
}

/// Resolve the verse pair for a (possibly out-of-range) pixel coordinate.
pub async fn inspect_pixel(
    resolver: &VerseResolver,
    pixel: PixelCoordinate,
) -> Result<PixelReport, ResolveError> {
    let x_verse = resolver.resolve(VerseOrdinal(pixel.x)).await?;
    let y_verse = resolver.resolve(VerseOrdinal(pixel.y)).await?;
    Ok(PixelReport {
        pixel,
        x_verse,
        y_verse,
    })
}

/// Resolve the verse pair under a clicked map-surface coordinate.
pub async fn inspect_projected(
    resolver: &VerseResolver,
    projected: ProjectedCoordinate,
) -> Result<PixelReport, ResolveError> {
    inspect_pixel(resolver, projected_to_pixel(projected, NATIVE_ZOOM)).await
}
