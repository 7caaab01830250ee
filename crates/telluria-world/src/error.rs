//! Error types for world operations.

use telluria_types::AxialCoord;

/// Errors that can occur during world map operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A coordinate is not part of the generated map.
    #[error("no hex at {coord}")]
    UnknownHex {
        /// The missing coordinate.
        coord: AxialCoord,
    },

    /// A requested position cannot be stood on or crossed.
    #[error("hex at {coord} is impassable")]
    Impassable {
        /// The impassable coordinate.
        coord: AxialCoord,
    },
}
