//! Capture and publish quality profiles.
//!
//! A [`QualityProfile`] is computed once per negotiation from the room's
//! high-quality flag, the requested codec, the encryption state and the
//! performance monitor's degrade signal. It is never applied to a track that
//! is already live; a recomputed profile waits for the next renegotiation.

use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

/// Video codecs the media engine can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// VP8.
    Vp8,
    /// H.264.
    H264,
    /// VP9.
    Vp9,
    /// AV1.
    Av1,
    /// H.265.
    H265,
}

impl VideoCodec {
    /// All codecs, in negotiation-preference order.
    pub const ALL: [Self; 5] = [Self::Vp8, Self::H264, Self::Vp9, Self::Av1, Self::H265];

    /// Codec used when the room link does not request one.
    pub const DEFAULT: Self = Self::Vp9;

    /// Whether frames of this codec survive the E2EE frame transform.
    ///
    /// VP9 and AV1 use scalable bitstreams whose headers the encryption
    /// transform cannot leave in the clear.
    pub fn supports_encryption(self) -> bool {
        !matches!(self, Self::Vp9 | Self::Av1)
    }

    /// Lowercase name as used in room links.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vp8 => "vp8",
            Self::H264 => "h264",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::H265 => "h265",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown codec name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown video codec: {0}")]
pub struct ParseCodecError(pub String);

impl FromStr for VideoCodec {
    type Err = ParseCodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|codec| codec.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseCodecError(s.to_string()))
    }
}

/// Effective codec preference handed to the media engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecPreference {
    /// Let the media engine choose.
    Unspecified,
    /// Prefer this codec.
    Codec(VideoCodec),
}

impl CodecPreference {
    /// Whether the preference is safe to use with E2EE.
    pub fn supports_encryption(self) -> bool {
        match self {
            Self::Unspecified => true,
            Self::Codec(codec) => codec.supports_encryption(),
        }
    }
}

/// Resolution and bitrate of one encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoPreset {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Maximum bitrate in bits per second.
    pub max_bitrate: u32,
    /// Maximum frame rate.
    pub max_framerate: u32,
}

impl VideoPreset {
    /// 384x216.
    pub const H216: Self = Self::new(384, 216, 180_000, 15);
    /// 640x360.
    pub const H360: Self = Self::new(640, 360, 450_000, 20);
    /// 960x540.
    pub const H540: Self = Self::new(960, 540, 800_000, 25);
    /// 1280x720.
    pub const H720: Self = Self::new(1280, 720, 1_700_000, 30);
    /// 1920x1080.
    pub const H1080: Self = Self::new(1920, 1080, 3_000_000, 30);
    /// 3840x2160.
    pub const H2160: Self = Self::new(3840, 2160, 8_000_000, 30);

    const fn new(width: u32, height: u32, max_bitrate: u32, max_framerate: u32) -> Self {
        Self { width, height, max_bitrate, max_framerate }
    }
}

/// Capture resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionTier {
    /// 720p capture.
    Standard,
    /// 2160p capture.
    High,
}

/// Inputs to [`QualityProfile::compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityRequest {
    /// Room link asked for high quality.
    pub high_quality: bool,
    /// Codec requested by the room link, if any.
    pub codec: Option<VideoCodec>,
    /// Whether E2EE is enabled for the session.
    pub encryption_enabled: bool,
    /// Degrade signal from the performance monitor.
    pub degraded: bool,
}

/// Capture and publish settings for one negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityProfile {
    /// Capture resolution tier.
    pub resolution_tier: ResolutionTier,
    /// Camera capture preset.
    pub capture: VideoPreset,
    /// Simulcast layers below the capture resolution, highest first.
    pub simulcast_layers: Vec<VideoPreset>,
    /// Effective codec preference.
    pub codec: CodecPreference,
    /// Redundant audio encoding. Disabled under E2EE because redundant
    /// packets cannot be re-framed once encrypted.
    pub forward_error_correction: bool,
    /// Discontinuous transmission for audio.
    pub dtx: bool,
}

impl QualityProfile {
    /// Compute the profile for a negotiation.
    pub fn compute(request: &QualityRequest) -> Self {
        let requested = request.codec.unwrap_or(VideoCodec::DEFAULT);
        let codec = if request.encryption_enabled && !requested.supports_encryption() {
            CodecPreference::Unspecified
        } else {
            CodecPreference::Codec(requested)
        };

        let (resolution_tier, capture, simulcast_layers) = if request.degraded {
            (ResolutionTier::Standard, VideoPreset::H540, vec![VideoPreset::H216])
        } else if request.high_quality {
            (ResolutionTier::High, VideoPreset::H2160, vec![VideoPreset::H1080, VideoPreset::H720])
        } else {
            (ResolutionTier::Standard, VideoPreset::H720, vec![VideoPreset::H540, VideoPreset::H216])
        };

        Self {
            resolution_tier,
            capture,
            simulcast_layers,
            codec,
            forward_error_correction: !request.encryption_enabled,
            dtx: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn request(high_quality: bool, codec: Option<VideoCodec>, encrypted: bool) -> QualityRequest {
        QualityRequest { high_quality, codec, encryption_enabled: encrypted, degraded: false }
    }

    #[test]
    fn default_codec_is_vp9() {
        let profile = QualityProfile::compute(&request(false, None, false));
        assert_eq!(profile.codec, CodecPreference::Codec(VideoCodec::Vp9));
    }

    #[test]
    fn default_codec_cleared_under_encryption() {
        let profile = QualityProfile::compute(&request(false, None, true));
        assert_eq!(profile.codec, CodecPreference::Unspecified);
    }

    #[test]
    fn compatible_codec_kept_under_encryption() {
        let profile = QualityProfile::compute(&request(false, Some(VideoCodec::H264), true));
        assert_eq!(profile.codec, CodecPreference::Codec(VideoCodec::H264));
    }

    #[test]
    fn high_quality_layers() {
        let profile = QualityProfile::compute(&request(true, None, false));
        assert_eq!(profile.resolution_tier, ResolutionTier::High);
        assert_eq!(profile.capture, VideoPreset::H2160);
        assert_eq!(profile.simulcast_layers, vec![VideoPreset::H1080, VideoPreset::H720]);
    }

    #[test]
    fn standard_layers() {
        let profile = QualityProfile::compute(&request(false, None, false));
        assert_eq!(profile.resolution_tier, ResolutionTier::Standard);
        assert_eq!(profile.capture, VideoPreset::H720);
        assert_eq!(profile.simulcast_layers, vec![VideoPreset::H540, VideoPreset::H216]);
    }

    #[test]
    fn degraded_overrides_high_quality() {
        let mut req = request(true, None, false);
        req.degraded = true;

        let profile = QualityProfile::compute(&req);
        assert_eq!(profile.resolution_tier, ResolutionTier::Standard);
        assert_eq!(profile.simulcast_layers.len(), 1);
    }

    #[test]
    fn fec_follows_encryption() {
        assert!(QualityProfile::compute(&request(false, None, false)).forward_error_correction);
        assert!(!QualityProfile::compute(&request(false, None, true)).forward_error_correction);
    }

    #[test]
    fn codec_parsing() {
        assert_eq!("VP8".parse::<VideoCodec>(), Ok(VideoCodec::Vp8));
        assert_eq!("av1".parse::<VideoCodec>(), Ok(VideoCodec::Av1));
        assert_eq!("theora".parse::<VideoCodec>(), Err(ParseCodecError("theora".to_string())));
    }

    fn codec_strategy() -> impl Strategy<Value = Option<VideoCodec>> {
        prop::option::of(prop::sample::select(VideoCodec::ALL.to_vec()))
    }

    proptest! {
        #[test]
        fn encrypted_profiles_always_use_compatible_codec(
            codec in codec_strategy(),
            high_quality in any::<bool>(),
            degraded in any::<bool>(),
        ) {
            let profile = QualityProfile::compute(&QualityRequest {
                high_quality,
                codec,
                encryption_enabled: true,
                degraded,
            });
            prop_assert!(profile.codec.supports_encryption());
        }

        #[test]
        fn simulcast_layers_never_exceed_capture(
            codec in codec_strategy(),
            high_quality in any::<bool>(),
            encryption_enabled in any::<bool>(),
            degraded in any::<bool>(),
        ) {
            let profile = QualityProfile::compute(&QualityRequest {
                high_quality,
                codec,
                encryption_enabled,
                degraded,
            });
            for layer in &profile.simulcast_layers {
                prop_assert!(layer.height < profile.capture.height);
            }
        }
    }
}
