/*! Run summary: counts of good/bad CRCs and textual packet dumps.

Mirrors the original tool's end-of-run report: how many unique packets
were decoded, how many passed CRC, and (if requested) a hex/ASCII dump of
the ones that didn't. `unique` holds only the aggregator's deduplicated,
CRC-valid packets (see [`crate::aggregator::PacketAggregator::correlate`]);
`raw_batches` is every chain's raw output, CRC-valid or not, kept around so
a "print bad" report can still show what each chain actually received.
*/

use crate::config::{ReportConfig, ReportStyle};
use crate::packet::Packet;

/// Summary counts and (optionally) raw dumps of the run's decoded
/// packets.
pub struct RunReport<'a> {
    unique: &'a [Packet],
    raw_batches: &'a [Vec<Packet>],
    config: ReportConfig,
}

impl<'a> RunReport<'a> {
    pub fn new(unique: &'a [Packet], raw_batches: &'a [Vec<Packet>], config: ReportConfig) -> Self {
        Self { unique, raw_batches, config }
    }

    /// Count of unique packets (always CRC-valid, since the aggregator
    /// drops invalid ones before correlation).
    pub fn count_good(&self) -> usize {
        self.unique.len()
    }

    /// Count of raw, per-chain packets whose CRC did not check out.
    pub fn count_bad(&self) -> usize {
        self.raw_batches.iter().flatten().filter(|p| !p.valid_crc).count()
    }

    /// Total FEC-corrected symbols across every unique packet.
    pub fn total_bytes_corrected(&self) -> usize {
        self.unique.iter().map(|p| p.bytes_corrected).sum()
    }

    /// Render the summary, the per-packet dump (raw hex or decoded AX.25
    /// header, per [`ReportConfig::style`]), and (if `print_raw_bad` is
    /// set) every CRC-failing raw packet's bytes, as one printable string.
    pub fn render(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        writeln!(
            out,
            "decoded {} packets: {} good, {} bad, {} bytes corrected",
            self.unique.len() + self.count_bad(),
            self.count_good(),
            self.count_bad(),
            self.total_bytes_corrected(),
        )
        .unwrap();

        for p in self.unique {
            writeln!(out, "{}", self.render_packet(p)).unwrap();
        }

        if self.config.print_raw_bad {
            for p in self.raw_batches.iter().flatten().filter(|p| !p.valid_crc) {
                writeln!(out, "bad crc @{}: {}", p.stream_address, format_hex(&p.data)).unwrap();
            }
        }
        if self.config.verbose {
            for p in self.unique {
                writeln!(
                    out,
                    "packet @{} chain={} correlated={:?} crc=ok",
                    p.stream_address, p.source_chain, p.correlated_chains,
                )
                .unwrap();
            }
        }
        out
    }

    fn render_packet(&self, p: &Packet) -> String {
        match self.config.style {
            ReportStyle::Raw => format_hex(&p.data),
            ReportStyle::DecodedHeaders => p.decode_ax25_header().unwrap_or_else(|| format_hex(&p.data)),
        }
    }
}

fn format_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(valid: bool, corrected: usize) -> Packet {
        Packet {
            data: vec![1, 2, 3],
            stream_address: 0,
            source_chain: 0,
            calculated_crc: 0,
            carried_crc: if valid { 0 } else { 1 },
            valid_crc: valid,
            bytes_corrected: corrected,
            correlated_chains: vec![0],
        }
    }

    #[test]
    fn counts_good_and_bad_separately() {
        let unique = vec![packet(true, 0), packet(true, 1)];
        let raw = vec![vec![packet(true, 0), packet(false, 2), packet(true, 1)]];
        let report = RunReport::new(&unique, &raw, ReportConfig::default());
        assert_eq!(report.count_good(), 2);
        assert_eq!(report.count_bad(), 1);
        assert_eq!(report.total_bytes_corrected(), 1);
    }

    #[test]
    fn render_includes_bad_dumps_when_requested() {
        let unique = vec![];
        let raw = vec![vec![packet(false, 0)]];
        let config = ReportConfig { print_raw_bad: true, ..ReportConfig::default() };
        let report = RunReport::new(&unique, &raw, config);
        let text = report.render();
        assert!(text.contains("bad crc"));
        assert!(text.contains("01 02 03"));
    }

    #[test]
    fn decoded_headers_style_falls_back_to_hex_on_undecodable_frames() {
        let unique = vec![packet(true, 0)];
        let config = ReportConfig { style: ReportStyle::DecodedHeaders, ..ReportConfig::default() };
        let report = RunReport::new(&unique, &[], config);
        assert!(report.render().contains("01 02 03"));
    }
}
