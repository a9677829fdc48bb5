/*! Line-delimited JSON decode-chain configuration.

Each line of a config file is an independent JSON object tagged by
`object_type`. A `demod_chain` line names one modem -> slicer -> [stream]
-> codec pipeline to run over the audio; a `report` line carries reporting
options. Unparseable lines are logged and skipped rather than aborting the
whole run, matching the original tool's per-line tolerance for hand-edited
config files.

Every pipeline stage is named the same way: a `type` (which implementation
to use), a `config` preset string selecting one of that type's tuned
presets, and an `options` object of named overrides layered on top of the
preset. This mirrors the original tool's config-file convention of
identifying a block by name and preset rather than spelling out every
filter coefficient inline; `options` is a fixed struct, not an open-ended
map, so a typo in a config file is a deserialize error instead of a
silently-ignored key.
*/

use serde::Deserialize;

use crate::afsk::AfskConfig;
use crate::fsk::FskConfig;
use crate::psk::PskConfig;
use crate::{Error, Float, Result};

/// One line of the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "object_type", rename_all = "snake_case")]
pub enum ConfigLine {
    /// A decode chain to run.
    DemodChain(ChainConfig),
    /// Reporting options for the whole run.
    Report(ReportConfig),
}

/// A single decode chain: a name (for reporting/logging), a modem, a
/// slicer, an optional descrambling stream, and a codec.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Label carried through to the report output; not otherwise
    /// interpreted.
    #[serde(default)]
    pub object_name: String,
    /// Demodulator stage.
    pub modem: ModemField,
    /// Symbol slicer stage.
    pub slicer: SlicerField,
    /// Optional descrambling stage between the slicer and the codec.
    #[serde(default)]
    pub stream: Option<StreamField>,
    /// Framer/FEC codec stage.
    pub codec: CodecField,
}

/// `poly` accepts either a JSON integer or a `"0x.."`-prefixed hex string,
/// matching how bit masks are usually written down by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexOrInt(pub u32);

impl<'de> Deserialize<'de> for HexOrInt {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Str(String),
        }
        let value = match Repr::deserialize(deserializer)? {
            Repr::Int(n) => n as u32,
            Repr::Str(s) => {
                let trimmed = s.trim();
                let digits = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
                u32::from_str_radix(digits, 16).map_err(serde::de::Error::custom)?
            }
        };
        Ok(HexOrInt(value))
    }
}

/// `modem.type`: which demodulator implementation to use. `afsk_pll` is an
/// alias for `afsk`'s tone-correlator pair; the original tool's PLL-based
/// AFSK variant differs only in carrier recovery, which this decoder
/// folds into the shared `AfskDemod` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModemType {
    /// AFSK tone-correlator pair.
    Afsk,
    /// AFSK, PLL carrier recovery variant (alias of `Afsk` here).
    AfskPll,
    /// Suppressed-carrier BPSK via a Costas loop.
    Bpsk,
    /// Suppressed-carrier QPSK via a Costas loop.
    Qpsk,
    /// Suppressed-carrier M-ary PSK (`order` > 4) via a Costas loop.
    Mpsk,
    /// Quadrature/Hilbert-pair FM discriminator FSK.
    Fsk,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModemField {
    /// Which demodulator to build.
    #[serde(rename = "type")]
    pub kind: ModemType,
    /// Preset name: `"300"`, `"1200"`, `"600"`, `"2400"`, `"3600"`,
    /// `"9600"`, `"4800-rrc"`, `"qpsk_600"`..`"qpsk_4800"`, `"bpsk_300"`,
    /// `"bpsk_1200"`, or a bare symbol-rate number for anything else.
    #[serde(default)]
    pub config: String,
    /// Named overrides layered on top of the preset.
    #[serde(default)]
    pub options: ModemOptions,
}

/// Overrides layered on top of a modem preset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModemOptions {
    /// Mark tone frequency override, Hz (AFSK/FSK only).
    pub mark: Option<Float>,
    /// Space tone frequency override, Hz (AFSK/FSK only).
    pub space: Option<Float>,
    /// Symbol rate override, baud.
    pub symbol_rate: Option<Float>,
    /// MPSK constellation order (e.g. 8 for 8-PSK). Ignored by other modem
    /// types.
    pub order: Option<u32>,
}

/// `slicer.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlicerType {
    /// One bit per symbol.
    Binary,
    /// One or two bits per symbol from an I/Q pair (BPSK/QPSK).
    Quadrature,
    /// Two bits per symbol from a 4-level real stream (G3RUH-style FSK).
    #[serde(rename = "4level")]
    FourLevel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlicerField {
    /// Which slicer to build.
    #[serde(rename = "type")]
    pub kind: SlicerType,
    /// Preset name, matching the same vocabulary as `modem.config`.
    #[serde(default)]
    pub config: String,
    /// Named overrides layered on top of the preset.
    #[serde(default)]
    pub options: SlicerOptions,
}

/// Overrides layered on top of a slicer preset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlicerOptions {
    /// Symbol rate override, baud.
    pub symbol_rate: Option<Float>,
    /// Clock-recovery lock rate override, in `(0, 1)`.
    pub lock_rate: Option<Float>,
}

/// `stream.type`: a descrambling pass applied to the slicer's bit stream
/// before framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    /// Self-synchronizing LFSR descrambler.
    Lfsr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamField {
    /// Which stream transform to build.
    #[serde(rename = "type")]
    pub kind: StreamType,
    /// Named overrides layered on top of the default.
    #[serde(default)]
    pub options: StreamOptions,
}

/// Overrides layered on top of a stream transform's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamOptions {
    /// LFSR feedback polynomial mask. Defaults to the G3RUH scrambler
    /// (`0x21001`) if omitted.
    pub poly: Option<HexOrInt>,
    /// Complement the unscrambled bit stream.
    #[serde(default)]
    pub invert: bool,
}

/// `codec.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecType {
    /// AX.25 HDLC bit-stuffed framing.
    Ax25,
    /// IL2P sync/header/block framing with Reed-Solomon FEC.
    Il2p,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodecField {
    /// Which codec to build.
    #[serde(rename = "type")]
    pub kind: CodecType,
    /// Named overrides layered on top of the codec's defaults.
    #[serde(default)]
    pub options: CodecOptions,
}

/// Overrides layered on top of a codec's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodecOptions {
    /// AX.25: whether to require a valid trailing FCS. IL2P always
    /// computes a CRC itself; this only affects AX.25's `min_packet_length`
    /// floor (a frame with no room for an FCS is dropped early).
    pub crc: Option<bool>,
    /// IL2P: skip Reed-Solomon correction entirely.
    pub disable_rs: Option<bool>,
    /// IL2P: RS correction headroom (see [`crate::reed_solomon`]).
    pub min_dist: Option<usize>,
    /// IL2P: sync-word Hamming-distance tolerance, in bits out of 24.
    pub sync_tol: Option<u32>,
    /// AX.25: minimum decoded frame length, in bytes.
    pub min_packet_length: Option<usize>,
    /// AX.25: maximum decoded frame length, in bytes.
    pub max_packet_length: Option<usize>,
}

fn default_min_packet_length() -> usize {
    18
}
fn default_max_packet_length() -> usize {
    1023
}

impl CodecOptions {
    /// AX.25 minimum frame length, defaulted if unset.
    pub fn ax25_min_packet_length(&self) -> usize {
        self.min_packet_length.unwrap_or_else(default_min_packet_length)
    }
    /// AX.25 maximum frame length, defaulted if unset.
    pub fn ax25_max_packet_length(&self) -> usize {
        self.max_packet_length.unwrap_or_else(default_max_packet_length)
    }
    /// IL2P RS correction headroom, defaulted if unset.
    pub fn il2p_min_distance(&self) -> usize {
        self.min_dist.unwrap_or(0)
    }
    /// IL2P: whether RS correction is disabled, defaulted if unset.
    pub fn il2p_disable_rs(&self) -> bool {
        self.disable_rs.unwrap_or(false)
    }
    /// IL2P: whether a trailing CRC is required, defaulted if unset.
    pub fn il2p_require_crc(&self) -> bool {
        self.crc.unwrap_or(true)
    }
    /// IL2P sync tolerance, defaulted if unset.
    pub fn il2p_sync_tolerance(&self) -> u32 {
        self.sync_tol.unwrap_or(1)
    }
}

/// How to render each decoded packet in the final report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStyle {
    /// Hex dump of the raw frame bytes.
    #[default]
    Raw,
    /// Pretty-printed AX.25 source/dest/control summary
    /// ([`crate::packet::Packet::decode_ax25_header`]).
    DecodedHeaders,
}

/// Reporting options for a whole run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    /// How to render each decoded packet.
    #[serde(default)]
    pub style: ReportStyle,
    /// Also dump every CRC-failing raw packet's bytes.
    #[serde(default)]
    pub print_raw_bad: bool,
    /// Also print per-packet chain/correlation detail.
    #[serde(default)]
    pub verbose: bool,
}

/// Resolve a modem/slicer `config` preset string to a symbol (baud) rate.
/// Unrecognized strings fall back to parsing the string itself as a bare
/// number, so a config file can always just spell out the rate it wants.
fn preset_symbol_rate(config: &str) -> Option<Float> {
    let rate = match config {
        "" => return None,
        "300" | "bpsk_300" => 300.0,
        "600" | "qpsk_600" => 600.0,
        "1200" | "bpsk_1200" => 1200.0,
        "2400" | "qpsk_2400" => 2400.0,
        "3600" | "qpsk_3600" => 3600.0,
        "4800" | "4800-rrc" | "qpsk_4800" => 4800.0,
        "9600" => 9600.0,
        other => return other.parse::<Float>().ok(),
    };
    Some(rate)
}

impl ModemField {
    /// Resolve this field's `config` preset and `options` overrides to a
    /// concrete [`AfskConfig`].
    pub fn afsk_config(&self, sample_rate: Float) -> AfskConfig {
        let mut cfg = match self.config.as_str() {
            "300" => AfskConfig::preset_300(sample_rate),
            "" | "1200" => AfskConfig::preset_1200(sample_rate),
            other => match preset_symbol_rate(other) {
                Some(baud) => AfskConfig::generic(sample_rate, baud),
                None => AfskConfig::preset_1200(sample_rate),
            },
        };
        if let Some(mark) = self.options.mark {
            cfg.mark_freq = mark;
        }
        if let Some(space) = self.options.space {
            cfg.space_freq = space;
        }
        if let Some(baud) = self.options.symbol_rate {
            cfg.baud_rate = baud;
        }
        cfg
    }

    /// Resolve this field's `config` preset and `options` overrides to a
    /// concrete [`FskConfig`].
    pub fn fsk_config(&self, sample_rate: Float) -> FskConfig {
        let mut cfg = match self.config.as_str() {
            "1200" => FskConfig::preset_1200(sample_rate),
            "" | "9600" => FskConfig::preset_9600(sample_rate),
            "4800" => FskConfig::preset_4800(sample_rate),
            "4800-rrc" => FskConfig::preset_4800_rrc(sample_rate),
            other => match preset_symbol_rate(other) {
                Some(baud) => FskConfig::generic(sample_rate, baud),
                None => FskConfig::preset_9600(sample_rate),
            },
        };
        if let Some(mark) = self.options.mark {
            cfg.mark_freq = mark;
        }
        if let Some(space) = self.options.space {
            cfg.space_freq = space;
        }
        if let Some(baud) = self.options.symbol_rate {
            cfg.baud_rate = baud;
        }
        cfg
    }

    /// Resolve this field's `config` preset and `options` overrides to a
    /// concrete BPSK [`PskConfig`].
    pub fn bpsk_config(&self, sample_rate: Float) -> PskConfig {
        let mut cfg = match self.config.as_str() {
            "300" | "bpsk_300" => PskConfig::bpsk_300(sample_rate),
            "" | "1200" | "bpsk_1200" => PskConfig::bpsk_1200(sample_rate),
            other => {
                let mut cfg = PskConfig::bpsk_1200(sample_rate);
                if let Some(baud) = preset_symbol_rate(other) {
                    cfg.symbol_rate = baud;
                }
                cfg
            }
        };
        if let Some(baud) = self.options.symbol_rate {
            cfg.symbol_rate = baud;
        }
        cfg
    }

    /// Resolve this field's `config` preset and `options` overrides to a
    /// concrete QPSK/MPSK [`PskConfig`].
    pub fn qpsk_config(&self, sample_rate: Float) -> PskConfig {
        let baud = preset_symbol_rate(&self.config).or(self.options.symbol_rate).unwrap_or(2400.0);
        let mut cfg = PskConfig::qpsk(sample_rate, baud);
        if let Some(baud) = self.options.symbol_rate {
            cfg.symbol_rate = baud;
        }
        cfg
    }

    /// MPSK constellation order, defaulted if unset.
    pub fn mpsk_order(&self) -> u32 {
        self.options.order.unwrap_or(8)
    }
}

impl SlicerField {
    /// Build a [`crate::slicer::BinarySlicer`] from this field's preset and
    /// overrides.
    pub fn binary(&self, sample_rate: Float) -> crate::slicer::BinarySlicer {
        use crate::slicer::BinarySlicer;
        let mut s = match self.config.as_str() {
            "300" => BinarySlicer::preset_300(sample_rate),
            "9600" | "4800-rrc" | "4800" => BinarySlicer::preset_9600(sample_rate),
            "" | "1200" => BinarySlicer::preset_1200(sample_rate),
            other => {
                let baud = preset_symbol_rate(other).or(self.options.symbol_rate).unwrap_or(1200.0);
                BinarySlicer::new(sample_rate, baud, self.options.lock_rate.unwrap_or(0.75))
            }
        };
        if let (Some(baud), Some(lock)) = (self.options.symbol_rate, self.options.lock_rate) {
            s = BinarySlicer::new(sample_rate, baud, lock);
        }
        s
    }

    /// Build a [`crate::slicer::QuadratureSlicer`] from this field's preset
    /// and overrides.
    pub fn quadrature(&self, sample_rate: Float) -> crate::slicer::QuadratureSlicer {
        use crate::slicer::QuadratureSlicer;
        match self.config.as_str() {
            "bpsk_300" | "300" => QuadratureSlicer::bpsk_300(sample_rate),
            "bpsk_1200" | "1200" | "" => QuadratureSlicer::bpsk_1200(sample_rate),
            other => {
                let baud = preset_symbol_rate(other).or(self.options.symbol_rate).unwrap_or(2400.0);
                QuadratureSlicer::qpsk(sample_rate, baud, self.options.lock_rate.unwrap_or(0.9))
            }
        }
    }

    /// Build a [`crate::slicer::FourLevelSlicer`] from this field's
    /// preset.
    pub fn four_level(&self, sample_rate: Float) -> crate::slicer::FourLevelSlicer {
        use crate::slicer::FourLevelSlicer;
        match self.config.as_str() {
            "9600" => FourLevelSlicer::preset_9600(sample_rate),
            _ => FourLevelSlicer::preset_4800(sample_rate),
        }
    }
}

impl StreamField {
    /// Build a [`crate::descrambler::Descrambler`] from this field's
    /// options.
    pub fn descrambler(&self) -> crate::descrambler::Descrambler {
        use crate::descrambler::Descrambler;
        match self.kind {
            StreamType::Lfsr => {
                let poly = self.options.poly.map(|p| p.0).unwrap_or(0x21001);
                Descrambler::new(poly, self.options.invert)
            }
        }
    }
}

/// Parse a line-delimited JSON config file's contents into its chain and
/// report lines, logging (and skipping) any line that fails to parse.
pub fn parse(contents: &str) -> Vec<ConfigLine> {
    let mut lines = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<ConfigLine>(trimmed) {
            Ok(parsed) => lines.push(parsed),
            Err(e) => log::warn!("config line {}: skipping unparseable line: {e}", lineno + 1),
        }
    }
    lines
}

/// Parse a config file from disk. Returns [`Error::Config`] if the file
/// itself can't be read (individual bad lines are skipped, not fatal).
pub fn load(path: &std::path::Path) -> Result<Vec<ConfigLine>> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
    Ok(parse(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_demod_chain_line() {
        let line = r#"{"object_type":"demod_chain","object_name":"a","modem":{"type":"afsk","config":"1200"},"slicer":{"type":"binary","config":"1200"},"codec":{"type":"ax25"}}"#;
        let lines = parse(line);
        assert_eq!(lines.len(), 1);
        assert!(matches!(lines[0], ConfigLine::DemodChain(_)));
    }

    #[test]
    fn parses_an_il2p_codec_with_defaults() {
        let line = r#"{"object_type":"demod_chain","modem":{"type":"bpsk","config":"bpsk_1200"},"slicer":{"type":"quadrature","config":"bpsk_1200"},"codec":{"type":"il2p"}}"#;
        let lines = parse(line);
        match &lines[0] {
            ConfigLine::DemodChain(c) => {
                assert_eq!(c.codec.kind, CodecType::Il2p);
                assert_eq!(c.codec.options.il2p_min_distance(), 0);
                assert!(!c.codec.options.il2p_disable_rs());
                assert!(c.codec.options.il2p_require_crc());
                assert_eq!(c.codec.options.il2p_sync_tolerance(), 1);
            }
            _ => panic!("expected demod chain"),
        }
    }

    #[test]
    fn parses_mpsk_order_and_stream_poly() {
        let line = r#"{"object_type":"demod_chain","modem":{"type":"mpsk","config":"qpsk_2400","options":{"order":8}},"slicer":{"type":"quadrature","config":"qpsk_2400"},"stream":{"type":"lfsr","options":{"poly":"0x211","invert":true}},"codec":{"type":"ax25"}}"#;
        let lines = parse(line);
        match &lines[0] {
            ConfigLine::DemodChain(c) => {
                assert_eq!(c.modem.mpsk_order(), 8);
                let stream = c.stream.as_ref().expect("stream field");
                assert_eq!(stream.options.poly, Some(HexOrInt(0x211)));
                assert!(stream.options.invert);
            }
            _ => panic!("expected demod chain"),
        }
    }

    #[test]
    fn skips_unparseable_lines_without_failing() {
        let contents = "not json\n{\"object_type\":\"report\",\"verbose\":true}\n";
        let lines = parse(contents);
        assert_eq!(lines.len(), 1);
        assert!(matches!(lines[0], ConfigLine::Report(_)));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let contents = "\n\n   \n";
        assert!(parse(contents).is_empty());
    }

    #[test]
    fn hex_or_int_accepts_both_encodings() {
        let int: HexOrInt = serde_json::from_str("529").unwrap();
        let hex: HexOrInt = serde_json::from_str("\"0x211\"").unwrap();
        assert_eq!(int, HexOrInt(529));
        assert_eq!(hex, HexOrInt(0x211));
    }
}
