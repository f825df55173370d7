use std::path::Path;

use log::debug;

use crate::{error::OutputError, hex};

/// Segment patterns for the digits 0-9 as wired on the display board.
pub(crate) const SEGMENTS: [u8; 10] = [0x77, 0x41, 0x3b, 0x6b, 0x4d, 0x6e, 0x7e, 0x43, 0x7f, 0x6f];

pub(crate) const IMAGE_SIZE: usize = 512;

/// The decimal place driven by one display EEPROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Place {
    Hundreds,
    Tens,
    Ones,
}

impl Place {
    pub(crate) const ALL: [Place; 3] = [Place::Hundreds, Place::Tens, Place::Ones];

    pub(crate) fn file_name(self) -> &'static str {
        match self {
            Place::Hundreds => "h_eeprom_hex.txt",
            Place::Tens => "t_eeprom_hex.txt",
            Place::Ones => "o_eeprom_hex.txt",
        }
    }

    fn digit(self, magnitude: u32) -> usize {
        let digit = match self {
            Place::Hundreds => magnitude / 100,
            Place::Tens => (magnitude / 10) % 10,
            Place::Ones => magnitude % 10,
        };
        digit as usize
    }
}

/// Number shown for an EEPROM address. The low 256 addresses are unsigned, the high 256 the
/// same byte read as two's complement. Only the magnitude is displayed.
fn magnitude(address: usize) -> u32 {
    let byte = (address % 256) as u8;
    if address < 256 {
        u32::from(byte)
    } else {
        (byte as i8).unsigned_abs().into()
    }
}

/// Segment patterns for every address of one display EEPROM.
pub(crate) fn image(place: Place) -> Vec<u8> {
    (0..IMAGE_SIZE)
        .map(|address| SEGMENTS[place.digit(magnitude(address))])
        .collect()
}

/// Writes all three display EEPROM images into `dir`.
pub(crate) fn write_images(dir: &Path) -> Result<(), OutputError> {
    for place in Place::ALL {
        debug!("Generating {:?} display image", place);
        hex::write_hex_file(&dir.join(place.file_name()), image(place), 0)?;
    }
    Ok(())
}
