//! Level-info asset decoding.
//!
//! A level-info resource is the text asset describing floor/wall/flat/sound/
//! text associations for one dungeon or town block type. Resources are
//! resolved through [`dawnfell_vfs::Vfs`], deobfuscated when needed, and
//! tokenized into an immutable [`LevelInfo`] record set.

mod crypto;
mod level_info;

pub use crypto::xor_transform;
pub use level_info::{
    CeilingData, FlatData, LevelInfo, LevelInfoError, SectionLineCounts, TextData, TextureData,
};

pub fn crate_info() -> &'static str {
    "dawnfell-assets v0.1.0"
}
