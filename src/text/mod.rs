//! Line-oriented tokenizer shared by the level (.jkl) and mesh (.3do) formats.
//!
//! Both formats announce each section with a literal phrase followed by a
//! record count (`World vertices 1024`, `HIERARCHY NODES 12`). Records are
//! whitespace/comma separated token rows; `#` starts a comment line. The two
//! historical editions differ in how many label lines sit between a header
//! and its first row, and in how many light values follow each surface.

pub mod jkl;
pub mod surface;
pub mod three_do;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};

/// Which on-disk dialect a level or mesh file was written in.
///
/// Supplied by the caller; never inferred from file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FormatEdition {
    /// Jedi Knight: Dark Forces II
    #[default]
    #[serde(rename = "jk")]
    JediKnight,
    /// Mysteries of the Sith
    #[serde(rename = "mots")]
    MysteriesOfTheSith,
}

impl FormatEdition {
    /// Raw label lines between a section header and its first row.
    pub fn label_lines(self, kind: SectionKind) -> usize {
        use SectionKind::*;
        match self {
            FormatEdition::JediKnight => match kind {
                WorldMaterials | Materials | Vertices | TextureVertices | Faces
                | HierarchyNodes => 1,
                _ => 0,
            },
            FormatEdition::MysteriesOfTheSith => 0,
        }
    }

    /// Light values per surface vertex: one intensity, or intensity + RGB.
    pub fn intensity_stride(self) -> usize {
        match self {
            FormatEdition::JediKnight => 1,
            FormatEdition::MysteriesOfTheSith => 4,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jk" | "jediknight" | "df2" => Some(FormatEdition::JediKnight),
            "mots" | "mysteriesofthesith" => Some(FormatEdition::MysteriesOfTheSith),
            _ => None,
        }
    }
}

/// Parse-time settings threaded through every record decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserConfig {
    pub edition: FormatEdition,
    /// Multiplier applied to positions, pivots, bounds and radii.
    pub scale: f32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            edition: FormatEdition::default(),
            scale: 1.0,
        }
    }
}

/// Named section headers recognised by the level and mesh parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    WorldMaterials,
    WorldColormaps,
    WorldVertices,
    WorldTextureVertices,
    WorldAdjoins,
    WorldSurfaces,
    WorldSectors,
    WorldModels,
    WorldTemplates,
    WorldThings,
    Materials,
    Meshes,
    Mesh,
    Vertices,
    TextureVertices,
    Faces,
    HierarchyNodes,
}

impl SectionKind {
    pub const LEVEL: &'static [SectionKind] = &[
        SectionKind::WorldMaterials,
        SectionKind::WorldColormaps,
        SectionKind::WorldVertices,
        SectionKind::WorldTextureVertices,
        SectionKind::WorldAdjoins,
        SectionKind::WorldSurfaces,
        SectionKind::WorldSectors,
        SectionKind::WorldModels,
        SectionKind::WorldTemplates,
        SectionKind::WorldThings,
    ];

    /// Words preceding the count, compared case-insensitively.
    pub fn phrase(self) -> &'static [&'static str] {
        match self {
            SectionKind::WorldMaterials => &["world", "materials"],
            SectionKind::WorldColormaps => &["world", "colormaps"],
            SectionKind::WorldVertices => &["world", "vertices"],
            SectionKind::WorldTextureVertices => &["world", "texture", "vertices"],
            SectionKind::WorldAdjoins => &["world", "adjoins"],
            SectionKind::WorldSurfaces => &["world", "surfaces"],
            SectionKind::WorldSectors => &["world", "sectors"],
            SectionKind::WorldModels => &["world", "models"],
            SectionKind::WorldTemplates => &["world", "templates"],
            SectionKind::WorldThings => &["world", "things"],
            SectionKind::Materials => &["materials"],
            SectionKind::Meshes => &["meshes"],
            SectionKind::Mesh => &["mesh"],
            SectionKind::Vertices => &["vertices"],
            SectionKind::TextureVertices => &["texture", "vertices"],
            SectionKind::Faces => &["faces"],
            SectionKind::HierarchyNodes => &["hierarchy", "nodes"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SectionKind::WorldMaterials => "World materials",
            SectionKind::WorldColormaps => "World Colormaps",
            SectionKind::WorldVertices => "World vertices",
            SectionKind::WorldTextureVertices => "World texture vertices",
            SectionKind::WorldAdjoins => "World adjoins",
            SectionKind::WorldSurfaces => "World surfaces",
            SectionKind::WorldSectors => "World sectors",
            SectionKind::WorldModels => "World models",
            SectionKind::WorldTemplates => "World templates",
            SectionKind::WorldThings => "World things",
            SectionKind::Materials => "MATERIALS",
            SectionKind::Meshes => "MESHES",
            SectionKind::Mesh => "MESH",
            SectionKind::Vertices => "VERTICES",
            SectionKind::TextureVertices => "TEXTURE VERTICES",
            SectionKind::Faces => "FACES",
            SectionKind::HierarchyNodes => "HIERARCHY NODES",
        }
    }

    /// Declared count if `line` is this section's header.
    pub fn match_header(self, line: &str) -> Option<usize> {
        let mut words = line.split_whitespace();
        for expected in self.phrase() {
            if !words.next()?.eq_ignore_ascii_case(expected) {
                return None;
            }
        }
        words.next()?.parse().ok()
    }
}

/// One located section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    /// Line index of the header itself
    pub header_line: usize,
    /// Line index immediately after the header
    pub data_start: usize,
    /// Declared element count
    pub count: usize,
}

/// Section headers in file order.
#[derive(Debug, Clone, Default)]
pub struct SectionTable {
    sections: Vec<Section>,
}

impl SectionTable {
    /// Locate the first header of each `kind` within `lines[range]`.
    pub fn scan(lines: &[&str], range: std::ops::Range<usize>, kinds: &[SectionKind]) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        for idx in range {
            let Some(line) = lines.get(idx) else { break };
            for &kind in kinds {
                if sections.iter().any(|s| s.kind == kind) {
                    continue;
                }
                if let Some(count) = kind.match_header(line) {
                    sections.push(Section {
                        kind,
                        header_line: idx,
                        data_start: idx + 1,
                        count,
                    });
                    break;
                }
            }
        }
        Self { sections }
    }

    pub fn get(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// First line after `section` that starts another located section, or `limit`.
    pub fn end_of(&self, section: &Section, limit: usize) -> usize {
        self.sections
            .iter()
            .map(|s| s.header_line)
            .filter(|&line| line > section.header_line)
            .min()
            .unwrap_or(limit)
            .min(limit)
    }
}

/// Decode single-byte (ISO-8859-1) text; every byte maps to the same code point.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Split on `\n`, dropping a trailing `\r` from each line.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Blank lines and `#` comments never hold records.
pub fn is_data_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Split a record row on whitespace and commas.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect()
}

/// Record rows of `section`: skip the edition's label lines, then take the
/// next `count` data lines before `end`.
pub fn section_rows<'a>(
    lines: &[&'a str],
    section: &Section,
    end: usize,
    edition: FormatEdition,
) -> DecodeResult<Vec<(usize, &'a str)>> {
    let start = section.data_start + edition.label_lines(section.kind);
    let rows: Vec<(usize, &str)> = (start..end.min(lines.len()))
        .map(|idx| (idx, lines[idx]))
        .filter(|(_, line)| is_data_line(line))
        .take(section.count)
        .collect();

    if rows.len() < section.count {
        return Err(DecodeError::TruncatedSection {
            section: section.kind.name().to_string(),
            declared: section.count,
            available: rows.len(),
        });
    }
    Ok(rows)
}

/// Sequential typed reads over one record's tokens.
pub(crate) struct RecordTokens<'a> {
    section: &'static str,
    record: usize,
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> RecordTokens<'a> {
    pub(crate) fn new(section: &'static str, record: usize, line: &'a str) -> Self {
        Self {
            section,
            record,
            tokens: tokenize(line),
            pos: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.pos)
    }

    /// Fail unless at least `n` tokens are left.
    pub(crate) fn require(&self, n: usize, what: &str) -> DecodeResult<()> {
        if self.remaining() < n {
            return Err(self.error(format!(
                "{what}: expected {n} more tokens, found {}",
                self.remaining()
            )));
        }
        Ok(())
    }

    pub(crate) fn error(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::malformed(self.section, self.record, reason)
    }

    pub(crate) fn next_str(&mut self) -> DecodeResult<&'a str> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error(format!("missing token {}", self.pos)))?;
        self.pos += 1;
        Ok(token)
    }

    pub(crate) fn skip(&mut self, n: usize) -> DecodeResult<()> {
        self.require(n, "skip")?;
        self.pos += n;
        Ok(())
    }

    /// Record index token; `12:` and `12` are both accepted.
    pub(crate) fn next_index(&mut self) -> DecodeResult<usize> {
        let token = self.next_str()?;
        token
            .trim_end_matches(':')
            .parse()
            .map_err(|_| self.error(format!("bad index '{token}'")))
    }

    pub(crate) fn next_f32(&mut self) -> DecodeResult<f32> {
        let token = self.next_str()?;
        token
            .parse()
            .map_err(|_| self.error(format!("bad number '{token}'")))
    }

    pub(crate) fn next_i32(&mut self) -> DecodeResult<i32> {
        let token = self.next_str()?;
        token
            .parse()
            .map_err(|_| self.error(format!("bad integer '{token}'")))
    }

    pub(crate) fn next_u32(&mut self) -> DecodeResult<u32> {
        let token = self.next_str()?;
        token
            .parse()
            .map_err(|_| self.error(format!("bad integer '{token}'")))
    }

    pub(crate) fn next_usize(&mut self) -> DecodeResult<usize> {
        let token = self.next_str()?;
        token
            .parse()
            .map_err(|_| self.error(format!("bad count '{token}'")))
    }

    /// Hex flag field with optional `0x` prefix.
    pub(crate) fn next_hex(&mut self) -> DecodeResult<u32> {
        let token = self.next_str()?;
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        u32::from_str_radix(digits, 16).map_err(|_| self.error(format!("bad hex '{token}'")))
    }

    pub(crate) fn rest(&self) -> &[&'a str] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }
}
