//! Room links.
//!
//! A room link has the form `/rooms/{room}?region=&hq=&codec=#{passphrase}`.
//! The passphrase travels in the fragment so it never reaches a server; an
//! absent or empty fragment means the room is not encrypted.

use percent_encoding::percent_decode_str;
use reqwest::Url;
use sofia_core::{EncryptionConfig, MonitorConfig, SessionConfig, VideoCodec};
use sofia_crypto::{PASSPHRASE_LENGTH, Passphrase, generate_passphrase, random_alphanumeric};

use crate::error::EntryError;

/// Path segment under which rooms live.
const ROOMS_SEGMENT: &str = "rooms";

/// Random characters in each half of a room id.
const ROOM_ID_HALF: usize = 4;

/// Random bytes needed by [`generate_room_id`].
pub const ROOM_ID_RANDOM_BYTES: usize = ROOM_ID_HALF * 2;

/// Generate a room id of the form `xxxx-xxxx`.
pub fn generate_room_id(random: &[u8; ROOM_ID_RANDOM_BYTES]) -> String {
    let (first, second) = random.split_at(ROOM_ID_HALF);
    format!("{}-{}", random_alphanumeric(first), random_alphanumeric(second))
}

/// Everything a room link says about a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEntry {
    /// Room name.
    pub room_name: String,
    /// Preferred media region.
    pub region: Option<String>,
    /// High quality capture requested.
    pub high_quality: bool,
    /// Requested video codec.
    pub codec: Option<VideoCodec>,
    /// Shared passphrase; `None` for unencrypted rooms.
    pub passphrase: Option<Passphrase>,
}

impl RoomEntry {
    /// Entry for a room with default settings.
    pub fn new(room_name: impl Into<String>) -> Self {
        Self { room_name: room_name.into(), region: None, high_quality: false, codec: None, passphrase: None }
    }

    /// Entry for a freshly generated room.
    ///
    /// With `e2ee`, a 64-character passphrase is generated as well.
    pub fn generate(
        room_random: &[u8; ROOM_ID_RANDOM_BYTES],
        passphrase_random: Option<&[u8; PASSPHRASE_LENGTH]>,
    ) -> Self {
        let mut entry = Self::new(generate_room_id(room_random));
        entry.passphrase = passphrase_random.map(generate_passphrase);
        entry
    }

    /// Parse an absolute room link.
    pub fn parse(link: &str) -> Result<Self, EntryError> {
        let url = Url::parse(link).map_err(|e| EntryError::Url(e.to_string()))?;
        Self::from_url(&url)
    }

    /// Read an entry from a parsed room link.
    pub fn from_url(url: &Url) -> Result<Self, EntryError> {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let room_name = match segments.as_slice() {
            [ROOMS_SEGMENT, room] => percent_decode_str(room)
                .decode_utf8()
                .map_err(|_| EntryError::RoomName((*room).to_string()))?
                .into_owned(),
            _ => return Err(EntryError::NotARoom(url.path().to_string())),
        };
        if room_name.is_empty() {
            return Err(EntryError::NotARoom(url.path().to_string()));
        }

        let mut entry = Self::new(room_name);
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "region" if !value.is_empty() => entry.region = Some(value.into_owned()),
                "hq" => entry.high_quality = value == "true",
                "codec" if !value.is_empty() => entry.codec = Some(value.parse()?),
                _ => {},
            }
        }
        entry.passphrase = Passphrase::from_fragment(url.fragment().unwrap_or_default())?;

        Ok(entry)
    }

    /// Build the link for this entry under an application origin.
    pub fn link(&self, origin: &Url) -> Result<Url, EntryError> {
        let mut url = origin.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| EntryError::Url(origin.to_string()))?
            .clear()
            .push(ROOMS_SEGMENT)
            .push(&self.room_name);

        {
            let mut query = url.query_pairs_mut();
            if let Some(region) = &self.region {
                query.append_pair("region", region);
            }
            if self.high_quality {
                query.append_pair("hq", "true");
            }
            if let Some(codec) = self.codec {
                query.append_pair("codec", codec.as_str());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        if let Some(passphrase) = &self.passphrase {
            url.set_fragment(Some(&passphrase.to_fragment()));
        }
        Ok(url)
    }

    /// Whether media in this room is end-to-end encrypted.
    pub fn encrypted(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Session configuration for joining this room.
    pub fn session_config(&self, show_settings_menu: bool, monitor: MonitorConfig) -> SessionConfig {
        let encryption = self
            .passphrase
            .clone()
            .map_or_else(EncryptionConfig::disabled, EncryptionConfig::with_passphrase);

        SessionConfig {
            room_name: self.room_name.clone(),
            region: self.region.clone(),
            high_quality: self.high_quality,
            codec: self.codec,
            encryption,
            show_settings_menu,
            monitor,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn origin() -> Url {
        Url::parse("http://localhost:3000").expect("origin")
    }

    #[test]
    fn parse_plain_room() {
        let entry = RoomEntry::parse("http://localhost:3000/rooms/abcd-1234").expect("parse");
        assert_eq!(entry, RoomEntry::new("abcd-1234"));
        assert!(!entry.encrypted());
    }

    #[test]
    fn parse_options_and_passphrase() {
        let entry = RoomEntry::parse(
            "https://meet.example/rooms/team%20sync?region=eu&hq=true&codec=h264#c2VjcmV0",
        )
        .expect("parse");

        assert_eq!(entry.room_name, "team sync");
        assert_eq!(entry.region.as_deref(), Some("eu"));
        assert!(entry.high_quality);
        assert_eq!(entry.codec, Some(VideoCodec::H264));
        assert_eq!(entry.passphrase.as_ref().map(Passphrase::as_bytes), Some(&b"secret"[..]));
    }

    #[test]
    fn empty_fragment_is_unencrypted() {
        let entry = RoomEntry::parse("http://localhost:3000/rooms/r1#").expect("parse");
        assert!(!entry.encrypted());
    }

    #[test]
    fn unknown_codec_rejected() {
        let result = RoomEntry::parse("http://localhost:3000/rooms/r1?codec=theora");
        assert!(matches!(result, Err(EntryError::Codec(_))));
    }

    #[test]
    fn undecodable_room_name_rejected() {
        let result = RoomEntry::parse("http://localhost:3000/rooms/%FF%FE");
        assert_eq!(result, Err(EntryError::RoomName("%FF%FE".to_string())));
        assert!(result.is_err_and(|e| e.is_user_input()));
    }

    #[test]
    fn escaped_room_name_keeps_its_link() {
        let entry = RoomEntry::parse("http://localhost:3000/rooms/caf%C3%A9").expect("parse");
        assert_eq!(entry.room_name, "café");

        let link = entry.link(&origin()).expect("link");
        assert_eq!(link.path(), "/rooms/caf%C3%A9");
    }

    #[test]
    fn non_room_path_rejected() {
        let result = RoomEntry::parse("http://localhost:3000/custom");
        assert!(matches!(result, Err(EntryError::NotARoom(_))));
        assert!(result.is_err_and(|e| e.is_user_input()));
    }

    #[test]
    fn link_round_trips() {
        let mut entry = RoomEntry::new("abcd-1234");
        entry.region = Some("us".to_string());
        entry.high_quality = true;
        entry.codec = Some(VideoCodec::Vp8);
        entry.passphrase = Some(Passphrase::new("secret").expect("passphrase"));

        let link = entry.link(&origin()).expect("link");
        assert_eq!(
            link.as_str(),
            "http://localhost:3000/rooms/abcd-1234?region=us&hq=true&codec=vp8#c2VjcmV0"
        );
        assert_eq!(RoomEntry::from_url(&link).expect("parse"), entry);
    }

    #[test]
    fn plain_link_has_no_query_or_fragment() {
        let link = RoomEntry::new("r1").link(&origin()).expect("link");
        assert_eq!(link.as_str(), "http://localhost:3000/rooms/r1");
    }

    #[test]
    fn generated_room_ids_have_expected_shape() {
        let id = generate_room_id(&[0, 1, 2, 3, 250, 251, 252, 253]);
        assert_eq!(id.len(), 9);
        assert_eq!(id.as_bytes()[4], b'-');
        assert!(id.split('-').all(|half| half.chars().all(|c| c.is_ascii_alphanumeric())));
    }

    #[test]
    fn generated_encrypted_room_has_long_passphrase() {
        let entry = RoomEntry::generate(&[9; ROOM_ID_RANDOM_BYTES], Some(&[42; PASSPHRASE_LENGTH]));
        assert_eq!(entry.passphrase.as_ref().map(Passphrase::len), Some(PASSPHRASE_LENGTH));
    }

    #[test]
    fn session_config_carries_encryption() {
        let entry = RoomEntry::parse("http://localhost:3000/rooms/r1#c2VjcmV0").expect("parse");
        let config = entry.session_config(true, MonitorConfig::default());

        assert!(config.encryption.enabled());
        assert!(config.show_settings_menu);
        assert_eq!(config.room_name, "r1");
    }

    proptest! {
        #[test]
        fn prop_room_names_survive_links(room in "[a-zA-Z0-9 _.~-]{1,24}") {
            prop_assume!(!room.trim_matches('.').is_empty());
            let link = RoomEntry::new(room.clone()).link(&origin()).expect("link");
            let parsed = RoomEntry::from_url(&link).expect("parse");
            prop_assert_eq!(parsed.room_name, room);
        }
    }
}
