//! Shareable tower layout codes.
//!
//! A layout code is a single line of the form
//! `bulwark:v1:<width>x<height>:<base64 json>` describing every tower's
//! kind, cell, and targeting policy. Codes carry the grid dimensions so an
//! import onto a different grid fails before any placement is attempted.

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use bulwark_core::{GridCoord, TargetingPolicy, TowerKind};
use serde::{Deserialize, Serialize};

const CODE_DOMAIN: &str = "bulwark";
const CODE_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded payload.
pub(crate) const CODE_HEADER: &str = "bulwark:v1";
const FIELD_DELIMITER: char = ':';

/// Snapshot of a tower layout and the grid it was built on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TowerLayoutCode {
    /// Grid width the layout was captured on.
    pub(crate) width: u32,
    /// Grid height the layout was captured on.
    pub(crate) height: u32,
    /// Towers composing the layout.
    pub(crate) towers: Vec<LayoutTower>,
}

/// One tower entry within a layout code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct LayoutTower {
    /// Kind of tower to place.
    pub(crate) kind: TowerKind,
    /// Cell the tower occupies.
    pub(crate) at: GridCoord,
    /// Targeting policy assigned to the tower.
    pub(crate) policy: TargetingPolicy,
}

impl TowerLayoutCode {
    /// Encodes the layout into a single-line string suitable for sharing.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let json =
            serde_json::to_vec(&self.towers).expect("layout serialization never fails");
        let payload = STANDARD_NO_PAD.encode(json);
        format!("{CODE_HEADER}:{}x{}:{payload}", self.width, self.height)
    }

    /// Decodes a layout from its string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutCodeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutCodeError::Blank);
        }

        let mut segments = trimmed.split(FIELD_DELIMITER);
        let mut segment = |name: &'static str| {
            segments
                .next()
                .ok_or(LayoutCodeError::MissingSegment(name))
        };
        let domain = segment("game")?;
        let version = segment("version")?;
        let dimensions = segment("dimensions")?;
        let payload = segment("payload")?;

        if domain != CODE_DOMAIN {
            return Err(LayoutCodeError::ForeignCode(domain.to_owned()));
        }
        if version != CODE_VERSION {
            return Err(LayoutCodeError::VersionMismatch(version.to_owned()));
        }

        let (width, height) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutCodeError::Base64)?;
        let towers: Vec<LayoutTower> =
            serde_json::from_slice(&bytes).map_err(LayoutCodeError::Json)?;

        Ok(Self {
            width,
            height,
            towers,
        })
    }
}

/// Ways a layout code can fail to decode.
#[derive(Debug)]
pub(crate) enum LayoutCodeError {
    /// Nothing but whitespace was supplied.
    Blank,
    /// A required `:`-separated segment was absent.
    MissingSegment(&'static str),
    /// The code carries another game's identifier.
    ForeignCode(String),
    /// The code was written by an incompatible format revision.
    VersionMismatch(String),
    /// The `<width>x<height>` segment failed to parse or named an empty grid.
    BadDimensions(String),
    /// The payload segment was not valid base64.
    Base64(base64::DecodeError),
    /// The decoded payload did not describe a tower list.
    Json(serde_json::Error),
}

impl fmt::Display for LayoutCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => write!(f, "no layout code supplied"),
            Self::MissingSegment(name) => {
                write!(f, "layout code ends before its {name} segment")
            }
            Self::ForeignCode(domain) => {
                write!(f, "'{domain}' codes belong to a different game")
            }
            Self::VersionMismatch(version) => {
                write!(f, "format revision '{version}' is not one this build reads")
            }
            Self::BadDimensions(text) => {
                write!(f, "'{text}' is not a usable <width>x<height> grid size")
            }
            Self::Base64(error) => write!(f, "payload is not valid base64: {error}"),
            Self::Json(error) => write!(f, "payload is not a tower list: {error}"),
        }
    }
}

impl Error for LayoutCodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Base64(error) => Some(error),
            Self::Json(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(text: &str) -> Result<(u32, u32), LayoutCodeError> {
    let bad = || LayoutCodeError::BadDimensions(text.to_owned());
    let (width, height) = text.split_once(['x', 'X']).ok_or_else(bad)?;
    let width: u32 = width.trim().parse().map_err(|_| bad())?;
    let height: u32 = height.trim().parse().map_err(|_| bad())?;
    if width == 0 || height == 0 {
        return Err(bad());
    }
    Ok((width, height))
}
