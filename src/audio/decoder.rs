use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

use crate::audio::pcm::{build_buffer, AudioBuffer};
use crate::error::AppError;

/// Standard alphabet with canonical padding. Non-zero trailing bits in the last
/// symbol are tolerated, as `atob` does.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Decode standard (padded) base64 into raw bytes.
///
/// ASCII whitespace is skipped so line-wrapped payloads decode the same way
/// a browser's `atob` would. Anything else outside the alphabet is an error.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, AppError> {
    let compact: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    LENIENT_STANDARD
        .decode(&compact)
        .map_err(|e| AppError::Decode(format!("Invalid base64 audio payload: {e}")))
}

/// Decode a base64 payload of headerless 16-bit little-endian PCM into a playable buffer.
pub fn decode_song_audio(
    base64_audio: &str,
    sample_rate: u32,
    num_channels: u16,
) -> Result<AudioBuffer, AppError> {
    let bytes = decode_base64(base64_audio)?;
    build_buffer(&bytes, sample_rate, num_channels)
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;

    use super::*;

    #[test]
    fn test_empty_input_is_empty_bytes() {
        assert!(decode_base64("").unwrap().is_empty());
    }

    #[test]
    fn test_decodes_known_bytes() {
        assert_eq!(decode_base64("AQID/w==").unwrap(), vec![1, 2, 3, 255]);
    }

    #[test]
    fn test_invalid_character_fails() {
        let err = decode_base64("AQ!D").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_invalid_padding_fails() {
        assert!(matches!(decode_base64("AQID/w="), Err(AppError::Decode(_))));
        assert!(matches!(decode_base64("A==="), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_nonzero_trailing_bits_are_ignored() {
        assert_eq!(decode_base64("AR==").unwrap(), vec![0x01]);
        assert_eq!(decode_base64("AQJ=").unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_missing_padding_fails() {
        assert!(matches!(decode_base64("AQID/w"), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_url_safe_alphabet_is_rejected() {
        assert!(matches!(decode_base64("-_-_"), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_line_wrapped_payload() {
        assert_eq!(decode_base64("AQID\n/w==\r\n").unwrap(), vec![1, 2, 3, 255]);
    }

    #[test]
    fn test_song_audio_scenario() {
        // [1000, -1000, 0, 32767] as little-endian i16
        let bytes: Vec<u8> = [1000i16, -1000, 0, 32767]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

        let buffer = decode_song_audio(&encoded, 24000, 1).unwrap();
        assert_eq!(buffer.frame_count(), 4);
        assert_eq!(buffer.sample_rate(), 24000);
        assert_eq!(buffer.number_of_channels(), 1);

        let data = buffer.channel(0).unwrap();
        let expected = [0.0305f32, -0.0305, 0.0, 0.99997];
        for (got, want) in data.iter().zip(expected) {
            assert!((got - want).abs() < 1e-4, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_song_audio_propagates_decode_error() {
        assert!(matches!(
            decode_song_audio("not base64!", 24000, 1),
            Err(AppError::Decode(_))
        ));
    }
}
