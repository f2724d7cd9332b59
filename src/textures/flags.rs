//! VTF header flags
//!
//! Flags are a closed set. A `FlagSet` is a bitset indexed by the flag's
//! canonical position, so iteration order is fixed and duplicates are
//! impossible.

use super::token_enum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

token_enum! {
    /// Boolean attribute baked into the container header
    pub enum TextureFlag {
        /// Disable bilinear filtering
        PointSample => "POINTSAMPLE",
        Trilinear => "TRILINEAR",
        /// Clamp S coordinates (no horizontal wrap)
        ClampS => "CLAMPS",
        /// Clamp T coordinates (no vertical wrap)
        ClampT => "CLAMPT",
        Anisotropic => "ANISOTROPIC",
        /// Seamless skybox edges
        HintDxt5 => "HINT_DXT5",
        /// Texture is a normal map
        Normal => "NORMAL",
        /// Load largest mipmap only
        NoMip => "NOMIP",
        NoLod => "NOLOD",
        MinMip => "MINMIP",
        Procedural => "PROCEDURAL",
        RenderTarget => "RENDERTARGET",
        DepthRenderTarget => "DEPTHRENDERTARGET",
        NoDebugOverride => "NODEBUGOVERRIDE",
        SingleCopy => "SINGLECOPY",
        NoDepthBuffer => "NODEPTHBUFFER",
        ClampU => "CLAMPU",
        VertexTexture => "VERTEXTEXTURE",
        SsBump => "SSBUMP",
        /// Clamp to border colour on all coordinates
        Border => "BORDER",
    }
}

impl TextureFlag {
    fn bit(self) -> u32 {
        // ALL is declared in canonical order, position is stable
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        1 << idx
    }
}

/// Set of texture flags in canonical order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(u32);

impl FlagSet {
    pub const fn empty() -> Self {
        FlagSet(0)
    }

    pub fn insert(&mut self, flag: TextureFlag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: TextureFlag) {
        self.0 &= !flag.bit();
    }

    pub fn contains(&self, flag: TextureFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate set flags in canonical order
    pub fn iter(&self) -> impl Iterator<Item = TextureFlag> + '_ {
        TextureFlag::ALL.iter().copied().filter(|f| self.contains(*f))
    }

    /// Parse a comma-separated list of flag names.
    ///
    /// Names are case-insensitive; unknown names are returned separately
    /// instead of failing the whole list.
    pub fn parse_list(list: &str) -> (FlagSet, Vec<String>) {
        let mut set = FlagSet::empty();
        let mut unknown = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match TextureFlag::from_str(name) {
                Some(flag) => set.insert(flag),
                None => unknown.push(name.to_string()),
            }
        }
        (set, unknown)
    }
}

impl FromIterator<TextureFlag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = TextureFlag>>(iter: I) -> Self {
        let mut set = FlagSet::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl std::fmt::Display for FlagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(|flag| flag.name()).collect();
        f.write_str(&names.join(","))
    }
}

// Serialized as a list of flag names
impl Serialize for FlagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for FlagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flags = Vec::<TextureFlag>::deserialize(deserializer)?;
        Ok(flags.into_iter().collect())
    }
}
