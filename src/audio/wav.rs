//! In-memory WAV encoding.
//!
//! Each audio segment is a complete, independently decodable WAV file so the
//! speech engine can process it without any surrounding context.

use crate::error::{Result, TransliveError};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Encodes 16-bit mono PCM samples into a standalone WAV byte buffer.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec).map_err(|e| TransliveError::WavEncode {
        message: format!("Failed to initialize WAV writer: {}", e),
    })?;

    for sample in samples {
        writer
            .write_sample(*sample)
            .map_err(|e| TransliveError::WavEncode {
                message: format!("Failed to write WAV sample: {}", e),
            })?;
    }

    writer.finalize().map_err(|e| TransliveError::WavEncode {
        message: format!("Failed to finalize WAV data: {}", e),
    })?;

    Ok(cursor.into_inner())
}
