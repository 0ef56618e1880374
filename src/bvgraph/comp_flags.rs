//! The codec configuration surface: which universal code is used for
//! each of the six wire fields, the window size, maximum reference
//! count, minimum interval length and ζ parameter — read from and
//! written to the `.properties` sidecar.

use std::collections::HashMap;

use crate::bits::Code;
use crate::error::{Error, Result};

/// The compression flags for reading or writing a graph: which code to
/// use for each of the six fields named in the wire format, plus the
/// structural parameters (window size, max reference count, minimum
/// interval length).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionFlags {
    pub outdegrees: Code,
    pub references: Code,
    pub blocks: Code,
    pub residuals: Code,
    pub block_count: Code,
    pub offsets: Code,
    pub min_interval_length: usize,
    pub compression_window: usize,
    pub max_ref_count: usize,
}

impl Default for CompressionFlags {
    fn default() -> Self {
        CompressionFlags {
            outdegrees: Code::Gamma,
            references: Code::Unary,
            blocks: Code::Gamma,
            residuals: Code::Zeta { k: 3 },
            block_count: Code::Gamma,
            offsets: Code::Gamma,
            min_interval_length: 4,
            compression_window: 7,
            max_ref_count: 3,
        }
    }
}

impl CompressionFlags {
    /// Validates the structural parameters, raising `InvalidConfig` on
    /// any out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if self.max_ref_count < 1 {
            return Err(Error::invalid_config("maxrefcount must be >= 1"));
        }
        if self.min_interval_length != 0 && self.min_interval_length < 2 {
            return Err(Error::invalid_config(
                "minintervallength must be 0 or >= 2",
            ));
        }
        if let Code::Zeta { k } = self.residuals {
            if k < 1 {
                return Err(Error::invalid_config("zetak must be >= 1"));
            }
        }
        for (field, code) in [
            ("OUTDEGREES", self.outdegrees),
            ("BLOCKS", self.blocks),
            ("RESIDUALS", self.residuals),
            ("REFERENCES", self.references),
            ("BLOCK_COUNT", self.block_count),
            ("OFFSETS", self.offsets),
        ] {
            permitted_for_field(field, code)?;
        }
        Ok(())
    }

    fn code_from_str(s: &str, k: u32) -> Option<Code> {
        match s.to_uppercase().as_str() {
            "UNARY" => Some(Code::Unary),
            "GAMMA" => Some(Code::Gamma),
            "DELTA" => Some(Code::Delta),
            "ZETA" => Some(Code::Zeta { k }),
            "NIBBLE" => Some(Code::Nibble),
            _ => None,
        }
    }

    /// Builds the `compressionflags` sidecar value: a ` | `-separated
    /// list of `FIELD_CODE` tokens for fields that differ from their
    /// default code.
    pub fn compression_flags_string(&self) -> String {
        let defaults = CompressionFlags::default();
        let mut tokens = Vec::new();
        let fields: [(&str, Code, Code); 6] = [
            ("OUTDEGREES", self.outdegrees, defaults.outdegrees),
            ("BLOCKS", self.blocks, defaults.blocks),
            ("RESIDUALS", self.residuals, defaults.residuals),
            ("REFERENCES", self.references, defaults.references),
            ("BLOCK_COUNT", self.block_count, defaults.block_count),
            ("OFFSETS", self.offsets, defaults.offsets),
        ];
        for (name, code, default) in fields {
            if code != default {
                tokens.push(format!("{}_{}", name, code.name()));
            }
        }
        tokens.join(" | ")
    }

    /// Parses the `compressionflags` sidecar value, applying tokens over
    /// the defaults. `zeta_k` is the `zetak` property value (used for any
    /// `ZETA` token, since the wire format does not carry `k` per-token).
    pub fn parse_compression_flags(s: &str, zeta_k: u32) -> Result<(
        Option<Code>,
        Option<Code>,
        Option<Code>,
        Option<Code>,
        Option<Code>,
        Option<Code>,
    )> {
        let mut outdegrees = None;
        let mut blocks = None;
        let mut residuals = None;
        let mut references = None;
        let mut block_count = None;
        let mut offsets = None;
        if s.trim().is_empty() {
            return Ok((
                outdegrees, blocks, residuals, references, block_count, offsets,
            ));
        }
        for token in s.split('|') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            // `BLOCK_COUNT` is itself the only field name containing an
            // underscore, so splitting at the first `_` (as `BLOCKS_GAMMA`
            // etc. would suggest) misparses `BLOCK_COUNT_DELTA` into field
            // `BLOCK` + code `COUNT_DELTA`. Match known field names by
            // prefix instead, longest first.
            const FIELDS: [&str; 6] = [
                "BLOCK_COUNT",
                "OUTDEGREES",
                "BLOCKS",
                "RESIDUALS",
                "REFERENCES",
                "OFFSETS",
            ];
            let field = FIELDS
                .into_iter()
                .find(|f| token.starts_with(f) && token[f.len()..].starts_with('_'))
                .ok_or_else(|| {
                    Error::invalid_config(format!("malformed compressionflags token {token:?}"))
                })?;
            let code_str = &token[field.len() + 1..];
            let code = Self::code_from_str(code_str, zeta_k).ok_or_else(|| {
                Error::invalid_config(format!("unknown code {code_str:?} in {token:?}"))
            })?;
            match field {
                "OUTDEGREES" => outdegrees = Some(code),
                "BLOCKS" => blocks = Some(code),
                "RESIDUALS" => residuals = Some(code),
                "REFERENCES" => references = Some(code),
                "BLOCK_COUNT" => block_count = Some(code),
                "OFFSETS" => offsets = Some(code),
                _ => unreachable!("FIELDS only contains the six known field names"),
            }
        }
        Ok((
            outdegrees, blocks, residuals, references, block_count, offsets,
        ))
    }

    /// Builds a [`CompressionFlags`] from a parsed `.properties` map,
    /// applying defaults for any field the map does not mention.
    pub fn from_properties(map: &HashMap<String, String>) -> Result<Self> {
        let mut flags = CompressionFlags::default();

        let zeta_k: u32 = match map.get("zetak") {
            Some(v) => v
                .parse()
                .map_err(|_| Error::invalid_config("zetak is not an integer"))?,
            None => 3,
        };

        if let Some(s) = map.get("compressionflags") {
            let (outdegrees, blocks, residuals, references, block_count, offsets) =
                Self::parse_compression_flags(s, zeta_k)?;
            if let Some(c) = outdegrees {
                flags.outdegrees = c;
            }
            if let Some(c) = blocks {
                flags.blocks = c;
            }
            if let Some(c) = residuals {
                flags.residuals = c;
            }
            if let Some(c) = references {
                flags.references = c;
            }
            if let Some(c) = block_count {
                flags.block_count = c;
            }
            if let Some(c) = offsets {
                flags.offsets = c;
            }
        }

        if let Some(v) = map.get("windowsize") {
            flags.compression_window = v
                .parse()
                .map_err(|_| Error::invalid_config("windowsize is not an integer"))?;
        }
        if let Some(v) = map.get("maxrefcount") {
            flags.max_ref_count = v
                .parse()
                .map_err(|_| Error::invalid_config("maxrefcount is not an integer"))?;
        }
        if let Some(v) = map.get("minintervallength") {
            flags.min_interval_length = v
                .parse()
                .map_err(|_| Error::invalid_config("minintervallength is not an integer"))?;
        }

        flags.validate()?;
        Ok(flags)
    }
}

fn permitted_for_field(field: &'static str, code: Code) -> Result<()> {
    let ok = match field {
        "OUTDEGREES" => matches!(code, Code::Gamma | Code::Delta),
        "BLOCKS" => matches!(code, Code::Gamma | Code::Delta | Code::Unary),
        "RESIDUALS" => matches!(code, Code::Gamma | Code::Delta | Code::Zeta { .. } | Code::Nibble),
        "REFERENCES" => matches!(code, Code::Gamma | Code::Delta | Code::Unary),
        "BLOCK_COUNT" => matches!(code, Code::Gamma | Code::Delta | Code::Unary),
        "OFFSETS" => matches!(code, Code::Gamma | Code::Delta),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::invalid_config(format!(
            "code {:?} is not permitted for field {field}",
            code
        )))
    }
}
