use std::collections::BTreeMap;

use dawnfell_vfs::{Vfs, VfsError};
use serde::{Deserialize, Serialize};

use crate::crypto;

/// Errors from decoding a level-info resource.
///
/// Every variant is fatal to the load that triggered it; there is no
/// partial or recoverable parse.
#[derive(Debug, thiserror::Error)]
pub enum LevelInfoError {
    #[error(transparent)]
    Vfs(#[from] VfsError),
    #[error("unrecognized section {name:?} at line {line}")]
    UnknownSection { name: String, line: usize },
    #[error("malformed sound line {line}: {text:?}")]
    MalformedSoundLine { line: usize, text: String },
    #[error("invalid integer field at line {line}: {source}")]
    InvalidInteger {
        line: usize,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("no sound with id {id}")]
    SoundNotFound { id: i32 },
    #[error("floor texture index {index} out of range ({len} defined)")]
    FloorOutOfRange { index: usize, len: usize },
    #[error("wall texture index {index} out of range ({len} defined)")]
    WallOutOfRange { index: usize, len: usize },
    #[error("flat index {index} out of range ({len} defined)")]
    FlatOutOfRange { index: usize, len: usize },
    #[error("text index {index} out of range ({len} defined)")]
    TextOutOfRange { index: usize, len: usize },
}

/// One floor or wall texture reference.
///
/// Only the filename is carried; the remaining fields of the original
/// record are unconfirmed and intentionally not modeled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureData {
    pub filename: String,
}

/// A billboard sprite definition referenced by index from level geometry.
///
/// Defaults to a zero vertical offset, zero health, and kind 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatData {
    pub y_offset: i32,
    pub health: i32,
    pub kind: i32,
}

/// A text trigger referenced by index from level geometry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

/// Ceiling parameters for the level block.
///
/// The defaults apply whenever the ceiling data is absent from the source
/// text. Height is in game-world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeilingData {
    pub height: i32,
    pub unknown: i32,
    pub outdoor_dungeon: bool,
}

impl Default for CeilingData {
    fn default() -> Self {
        Self {
            height: 100,
            unknown: 0,
            outdoor_dungeon: false,
        }
    }
}

/// Data lines consumed per section during the token pass.
///
/// Floor, wall, flat, and text lines are recognized and consumed but not
/// yet decoded into records (only the sound layout is confirmed); the
/// counts make that visible to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLineCounts {
    pub floors: usize,
    pub walls: usize,
    pub flats: usize,
    pub sound: usize,
    pub text: usize,
}

/// Active section while scanning a level-info resource top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    Floors,
    Walls,
    Flats,
    Sound,
    Text,
}

const SECTION_SEPARATOR: char = '@';

fn section_mode(token: &str) -> Option<ParseMode> {
    match token {
        "@FLOORS" => Some(ParseMode::Floors),
        "@WALLS" => Some(ParseMode::Walls),
        "@FLATS" => Some(ParseMode::Flats),
        "@SOUND" => Some(ParseMode::Sound),
        "@TEXT" => Some(ParseMode::Text),
        _ => None,
    }
}

/// Fully decoded level-info record set.
///
/// Immutable once constructed; the level that loaded it owns it and any
/// number of readers may share it without synchronization. Lookups that
/// miss the populated range return a typed error, never a default record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelInfo {
    sounds: BTreeMap<i32, String>,
    floors: Vec<TextureData>,
    walls: Vec<TextureData>,
    flats: Vec<FlatData>,
    texts: Vec<TextData>,
    ceiling: CeilingData,
    lava_chasm_texture: Option<String>,
    wet_chasm_texture: Option<String>,
    dry_chasm_texture: Option<String>,
    level_down_texture: Option<String>,
    level_up_texture: Option<String>,
    transition_texture: Option<String>,
    trans_walk_thru_texture: Option<String>,
    section_lines: SectionLineCounts,
}

impl LevelInfo {
    /// Open `name` through the VFS, reverse the XOR obfuscation unless the
    /// name is on the unencrypted allow-list, and decode the text.
    pub fn from_vfs(vfs: &dyn Vfs, name: &str) -> Result<Self, LevelInfoError> {
        let mut data = vfs.open(name)?;
        if !crypto::is_unencrypted(name) {
            crypto::xor_transform(&mut data);
        }
        // Level-info text is Latin-1; bytes map straight to chars.
        let text: String = data.iter().map(|&b| b as char).collect();
        Self::decode(&text)
    }

    /// Decode already-deobfuscated level-info text.
    pub fn decode(text: &str) -> Result<Self, LevelInfoError> {
        // Newlines are nicer to work with than CRLF pairs.
        let text = text.replace('\r', "");

        let mut info = Self::default();
        let mut mode = ParseMode::Floors;

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with(SECTION_SEPARATOR) {
                // Only the first token selects the mode ("@FLATS NOSHOW").
                let token = line.split_whitespace().next().unwrap_or(line);
                mode = section_mode(token).ok_or_else(|| LevelInfoError::UnknownSection {
                    name: token.to_string(),
                    line: line_number,
                })?;
                tracing::debug!(section = token, line = line_number, "section change");
                continue;
            }

            match mode {
                ParseMode::Sound => info.parse_sound_line(line, line_number)?,
                ParseMode::Floors => info.section_lines.floors += 1,
                ParseMode::Walls => info.section_lines.walls += 1,
                ParseMode::Flats => info.section_lines.flats += 1,
                ParseMode::Text => info.section_lines.text += 1,
            }
        }

        Ok(info)
    }

    /// A sound line is `<filename> <id> [...]`; trailing tokens are ignored
    /// and the filename is stored uppercase.
    fn parse_sound_line(&mut self, line: &str, line_number: usize) -> Result<(), LevelInfoError> {
        let mut tokens = line.split_whitespace();
        let (Some(filename), Some(id_token)) = (tokens.next(), tokens.next()) else {
            return Err(LevelInfoError::MalformedSoundLine {
                line: line_number,
                text: line.to_string(),
            });
        };

        let id: i32 = id_token
            .parse()
            .map_err(|source| LevelInfoError::InvalidInteger {
                line: line_number,
                source,
            })?;

        // Duplicate ids overwrite the earlier entry.
        self.sounds.insert(id, filename.to_ascii_uppercase());
        self.section_lines.sound += 1;
        Ok(())
    }

    /// Sound filename for the given id.
    pub fn sound(&self, id: i32) -> Result<&str, LevelInfoError> {
        self.sounds
            .get(&id)
            .map(String::as_str)
            .ok_or(LevelInfoError::SoundNotFound { id })
    }

    /// All sound entries, ordered by id.
    pub fn sounds(&self) -> &BTreeMap<i32, String> {
        &self.sounds
    }

    pub fn floor(&self, index: usize) -> Result<&TextureData, LevelInfoError> {
        self.floors.get(index).ok_or(LevelInfoError::FloorOutOfRange {
            index,
            len: self.floors.len(),
        })
    }

    pub fn wall(&self, index: usize) -> Result<&TextureData, LevelInfoError> {
        self.walls.get(index).ok_or(LevelInfoError::WallOutOfRange {
            index,
            len: self.walls.len(),
        })
    }

    pub fn flat(&self, index: usize) -> Result<&FlatData, LevelInfoError> {
        self.flats.get(index).ok_or(LevelInfoError::FlatOutOfRange {
            index,
            len: self.flats.len(),
        })
    }

    pub fn text(&self, index: usize) -> Result<&TextData, LevelInfoError> {
        self.texts.get(index).ok_or(LevelInfoError::TextOutOfRange {
            index,
            len: self.texts.len(),
        })
    }

    pub fn floors(&self) -> &[TextureData] {
        &self.floors
    }

    pub fn walls(&self) -> &[TextureData] {
        &self.walls
    }

    pub fn flats(&self) -> &[FlatData] {
        &self.flats
    }

    pub fn texts(&self) -> &[TextData] {
        &self.texts
    }

    pub fn ceiling(&self) -> &CeilingData {
        &self.ceiling
    }

    pub fn lava_chasm_texture(&self) -> Option<&str> {
        self.lava_chasm_texture.as_deref()
    }

    pub fn wet_chasm_texture(&self) -> Option<&str> {
        self.wet_chasm_texture.as_deref()
    }

    pub fn dry_chasm_texture(&self) -> Option<&str> {
        self.dry_chasm_texture.as_deref()
    }

    pub fn level_down_texture(&self) -> Option<&str> {
        self.level_down_texture.as_deref()
    }

    pub fn level_up_texture(&self) -> Option<&str> {
        self.level_up_texture.as_deref()
    }

    pub fn transition_texture(&self) -> Option<&str> {
        self.transition_texture.as_deref()
    }

    pub fn trans_walk_thru_texture(&self) -> Option<&str> {
        self.trans_walk_thru_texture.as_deref()
    }

    /// Lines consumed per section, including the not-yet-decoded ones.
    pub fn section_lines(&self) -> SectionLineCounts {
        self.section_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dawnfell_vfs::MemoryVfs;

    #[test]
    fn minimal_sound_section() {
        let info = LevelInfo::decode("@SOUND\nCRITTER1.VOC 5\n").unwrap();
        assert_eq!(info.sounds().len(), 1);
        assert_eq!(info.sound(5).unwrap(), "CRITTER1.VOC");
    }

    #[test]
    fn sound_filename_is_uppercased() {
        let info = LevelInfo::decode("@SOUND\ncritter1.voc 5\n").unwrap();
        assert_eq!(info.sound(5).unwrap(), "CRITTER1.VOC");
    }

    #[test]
    fn crlf_and_lf_parse_identically() {
        let lf = LevelInfo::decode("@SOUND\nA.VOC 1\nB.VOC 2\n").unwrap();
        let crlf = LevelInfo::decode("@SOUND\r\nA.VOC 1\r\nB.VOC 2\r\n").unwrap();
        assert_eq!(lf.sounds(), crlf.sounds());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let info = LevelInfo::decode("\n\n@SOUND\n\nA.VOC 1\n   \nB.VOC 2\n\n").unwrap();
        assert_eq!(info.sounds().len(), 2);
    }

    #[test]
    fn duplicate_sound_id_overwrites() {
        let info = LevelInfo::decode("@SOUND\nOLD.VOC 3\nNEW.VOC 3\n").unwrap();
        assert_eq!(info.sound(3).unwrap(), "NEW.VOC");
        assert_eq!(info.sounds().len(), 1);
    }

    #[test]
    fn trailing_sound_tokens_are_ignored() {
        let info = LevelInfo::decode("@SOUND\nDOOR.VOC 9 extra stuff\n").unwrap();
        assert_eq!(info.sound(9).unwrap(), "DOOR.VOC");
    }

    #[test]
    fn unknown_section_is_fatal() {
        let err = LevelInfo::decode("@BOGUS\nA.VOC 1\n").unwrap_err();
        match err {
            LevelInfoError::UnknownSection { name, line } => {
                assert_eq!(name, "@BOGUS");
                assert_eq!(line, 1);
            }
            other => panic!("expected UnknownSection, got {other:?}"),
        }
    }

    #[test]
    fn unknown_section_aborts_before_later_lines() {
        // The valid @SOUND section after the bogus one must never be
        // reached; no partial record set escapes.
        let err = LevelInfo::decode("@SOUND\nA.VOC 1\n@BOGUS\n@SOUND\nB.VOC 2\n");
        assert!(matches!(
            err,
            Err(LevelInfoError::UnknownSection { line: 3, .. })
        ));
    }

    #[test]
    fn section_token_ignores_trailing_words() {
        let info = LevelInfo::decode("@FLATS NOSHOW\nsomething\n@SOUND\nA.VOC 1\n").unwrap();
        assert_eq!(info.section_lines().flats, 1);
        assert_eq!(info.sound(1).unwrap(), "A.VOC");
    }

    #[test]
    fn malformed_sound_line_is_fatal() {
        let err = LevelInfo::decode("@SOUND\nLONELY.VOC\n").unwrap_err();
        assert!(matches!(err, LevelInfoError::MalformedSoundLine { line: 2, .. }));
    }

    #[test]
    fn non_numeric_sound_id_is_fatal() {
        let err = LevelInfo::decode("@SOUND\nA.VOC banana\n").unwrap_err();
        assert!(matches!(err, LevelInfoError::InvalidInteger { line: 2, .. }));
    }

    #[test]
    fn missing_sound_id_lookup_fails() {
        let info = LevelInfo::decode("@SOUND\nA.VOC 1\n").unwrap();
        assert!(matches!(
            info.sound(2),
            Err(LevelInfoError::SoundNotFound { id: 2 })
        ));
    }

    #[test]
    fn index_lookups_never_return_defaults() {
        let info = LevelInfo::decode("@SOUND\nA.VOC 1\n").unwrap();
        assert!(matches!(
            info.floor(0),
            Err(LevelInfoError::FloorOutOfRange { index: 0, len: 0 })
        ));
        assert!(matches!(info.wall(3), Err(LevelInfoError::WallOutOfRange { .. })));
        assert!(matches!(info.flat(0), Err(LevelInfoError::FlatOutOfRange { .. })));
        assert!(matches!(info.text(0), Err(LevelInfoError::TextOutOfRange { .. })));
    }

    #[test]
    fn unpopulated_sections_are_consumed_and_counted() {
        let src = "@FLOORS\n*BOXCAP 3\nDUNGEON1.SET\n@WALLS\nWALL1.IMG\n@TEXT\n0\nhello\n";
        let info = LevelInfo::decode(src).unwrap();
        let counts = info.section_lines();
        assert_eq!(counts.floors, 2);
        assert_eq!(counts.walls, 1);
        assert_eq!(counts.text, 2);
        assert_eq!(counts.sound, 0);
        // Recognized but not decoded into records.
        assert!(info.floors().is_empty());
        assert!(info.walls().is_empty());
        assert!(info.texts().is_empty());
    }

    #[test]
    fn ceiling_defaults_when_section_absent() {
        let info = LevelInfo::decode("@SOUND\nA.VOC 1\n").unwrap();
        let ceiling = info.ceiling();
        assert_eq!(ceiling.height, 100);
        assert_eq!(ceiling.unknown, 0);
        assert!(!ceiling.outdoor_dungeon);
    }

    #[test]
    fn flat_defaults_are_zeroed() {
        let flat = FlatData::default();
        assert_eq!(flat.y_offset, 0);
        assert_eq!(flat.health, 0);
        assert_eq!(flat.kind, 0);
    }

    #[test]
    fn encrypted_resource_round_trips_through_vfs() {
        let plaintext = "@SOUND\nCRITTER1.VOC 5\n";
        let mut bytes = plaintext.as_bytes().to_vec();
        // The transform is self-inverse, so applying it once produces the
        // on-disk obfuscated form.
        crate::crypto::xor_transform(&mut bytes);

        let mut vfs = MemoryVfs::new();
        vfs.insert("MAZE.INF", bytes);

        let info = LevelInfo::from_vfs(&vfs, "MAZE.INF").unwrap();
        assert_eq!(info.sound(5).unwrap(), "CRITTER1.VOC");
    }

    #[test]
    fn allow_listed_resource_is_read_verbatim() {
        let mut vfs = MemoryVfs::new();
        vfs.insert("CRYSTAL3.INF", "@SOUND\nportal.voc 2\n".as_bytes().to_vec());

        let info = LevelInfo::from_vfs(&vfs, "CRYSTAL3.INF").unwrap();
        assert_eq!(info.sound(2).unwrap(), "PORTAL.VOC");
    }

    #[test]
    fn missing_resource_is_fatal() {
        let vfs = MemoryVfs::new();
        let err = LevelInfo::from_vfs(&vfs, "NOWHERE.INF").unwrap_err();
        assert!(matches!(err, LevelInfoError::Vfs(_)));
    }

    #[test]
    fn special_textures_default_to_none() {
        let info = LevelInfo::decode("@SOUND\nA.VOC 1\n").unwrap();
        assert!(info.lava_chasm_texture().is_none());
        assert!(info.wet_chasm_texture().is_none());
        assert!(info.dry_chasm_texture().is_none());
        assert!(info.level_up_texture().is_none());
        assert!(info.level_down_texture().is_none());
        assert!(info.transition_texture().is_none());
        assert!(info.trans_walk_thru_texture().is_none());
    }
}
