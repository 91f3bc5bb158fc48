//! WAV encoding of output traces: 16-bit PCM, one channel per output and
//! one sample frame per engine tick.

use cf_engine::Frame;
use cf_ir::{DAC_FULL_SCALE, NUM_OUTPUTS};
use std::io::Write;

const BITS_PER_SAMPLE: u16 = 16;

/// Encode `frames` as a complete WAV file.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let num_channels = NUM_OUTPUTS as u16;
    let block_align = num_channels * (BITS_PER_SAMPLE / 8);
    let data_size = frames.len() as u32 * block_align as u32;

    let mut buf = Vec::with_capacity(44 + data_size as usize);
    riff_header(&mut buf, data_size);
    fmt_chunk(&mut buf, num_channels, sample_rate, block_align);
    data_chunk(&mut buf, frames, data_size);
    buf
}

pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    w.write_all(&frames_to_wav(frames, sample_rate))
}

/// DAC level as a unipolar sample: 0 stays 0, full scale is `i16::MAX`.
pub fn level_to_sample(level: u16) -> i16 {
    (level.min(DAC_FULL_SCALE) as i32 * i16::MAX as i32 / DAC_FULL_SCALE as i32) as i16
}

fn riff_header(buf: &mut Vec<u8>, data_size: u32) {
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
}

fn fmt_chunk(buf: &mut Vec<u8>, num_channels: u16, sample_rate: u32, block_align: u16) {
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
}

fn data_chunk(buf: &mut Vec<u8>, frames: &[Frame], data_size: u32) {
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for frame in frames {
        for &level in &frame.levels {
            buf.extend_from_slice(&level_to_sample(level).to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn header_describes_four_channels() {
        let frames = [Frame::silence(); 10];
        let wav = frames_to_wav(&frames, 192);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u16_at(&wav, 22), 4);
        assert_eq!(u32_at(&wav, 24), 192);
        assert_eq!(u32_at(&wav, 28), 192 * 8);
        assert_eq!(u16_at(&wav, 32), 8);
        assert_eq!(u32_at(&wav, 40), 80);
        assert_eq!(wav.len(), 44 + 80);
    }

    #[test]
    fn samples_are_interleaved_per_output() {
        let mut frame = Frame::silence();
        frame.levels = [DAC_FULL_SCALE, 0, 0, DAC_FULL_SCALE];
        let wav = frames_to_wav(&[frame], 100);
        assert_eq!(u16_at(&wav, 44) as i16, i16::MAX);
        assert_eq!(u16_at(&wav, 46), 0);
        assert_eq!(u16_at(&wav, 50) as i16, i16::MAX);
    }

    #[test]
    fn level_mapping_is_unipolar() {
        assert_eq!(level_to_sample(0), 0);
        assert_eq!(level_to_sample(DAC_FULL_SCALE), i16::MAX);
        assert_eq!(level_to_sample(u16::MAX), i16::MAX);
    }
}
