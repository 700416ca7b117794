// Adapters layer: concrete implementations for external formats and systems
// (FITS files, the SDSS archive, PNG plots).

pub mod fits;
pub mod font;
pub mod plot;
pub mod sdss;
