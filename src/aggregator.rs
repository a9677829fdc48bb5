/*! Cross-chain packet correlation and deduplication.

Independent decode chains (different modem/slicer/codec combinations run
over the same audio) will often decode the same over-the-air packet.
`PacketAggregator` merges those duplicates: two packets from different
chains are the same packet if their calculated CRCs match and their
stream addresses are within `window` samples of each other.

A packet with a bad CRC is still kept in `raw_batches` (so CRC-save
reporting can show it), but it never enters `unique_packets` or
participates in correlation — a mismatched CRC makes two chains' frames
incomparable.
*/

use crate::packet::Packet;

/// Collects packets from every decode chain, then correlates duplicates
/// across chains into a deduplicated, CRC-valid, address-sorted list.
pub struct PacketAggregator {
    window: u64,
    raw_batches: Vec<Vec<Packet>>,
    unique_packets: Vec<Packet>,
}

impl PacketAggregator {
    /// `window` is the maximum stream-address distance (in samples) for
    /// two packets to be considered the same over-the-air frame.
    pub fn new(window: u64) -> Self {
        Self { window, raw_batches: Vec::new(), unique_packets: Vec::new() }
    }

    /// Default window: a quarter second at `sample_rate`, matching the
    /// original decoder's default correlation distance.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self::new(sample_rate as u64 / 4)
    }

    /// Append one chain's raw decoded packets (valid and invalid CRC
    /// alike).
    pub fn add(&mut self, batch: Vec<Packet>) {
        self.raw_batches.push(batch);
    }

    /// Every raw batch added so far, CRC-valid or not.
    pub fn raw_batches(&self) -> &[Vec<Packet>] {
        &self.raw_batches
    }

    /// Recompute `valid_crc` on every held packet. Packets already carry a
    /// correct CRC verdict from construction time, so this is normally a
    /// no-op; it exists as its own step so a caller can re-derive CRCs
    /// after mutating `raw_batches` directly.
    pub fn compute_crcs(&mut self) {
        for batch in &mut self.raw_batches {
            for packet in batch.iter_mut() {
                let (carried, calculated, valid) = crate::crc::check(&packet.data);
                packet.carried_crc = carried;
                packet.calculated_crc = calculated;
                packet.valid_crc = valid;
            }
        }
    }

    /// Walk every raw batch in order and merge CRC-valid packets that a
    /// different chain already reported within `window` samples and with
    /// an equal calculated CRC; everything else (including every
    /// CRC-invalid packet) becomes its own entry in `unique_packets`, which
    /// is then sorted by `stream_address`. CRC-invalid packets are dropped
    /// from `unique_packets` entirely (they remain visible via
    /// [`Self::raw_batches`]).
    pub fn correlate(&mut self) {
        self.unique_packets.clear();
        let distance = |a: u64, b: u64| a.max(b) - a.min(b);
        for batch in &self.raw_batches {
            for packet in batch {
                if !packet.valid_crc {
                    continue;
                }
                let existing = self.unique_packets.iter_mut().find(|u| {
                    u.source_chain != packet.source_chain
                        && u.calculated_crc == packet.calculated_crc
                        && distance(u.stream_address, packet.stream_address) < self.window
                });
                match existing {
                    Some(u) => u.correlated_chains.push(packet.source_chain),
                    None => self.unique_packets.push(packet.clone()),
                }
            }
        }
        self.unique_packets.sort_by_key(|p| p.stream_address);
    }

    /// The deduplicated, CRC-valid, address-sorted packet list. Empty
    /// until [`Self::correlate`] has been called.
    pub fn unique_packets(&self) -> &[Packet] {
        &self.unique_packets
    }

    /// Run the full `compute_crcs` + `correlate` pipeline and return the
    /// final sorted, deduplicated packet list, consuming `self`.
    pub fn into_sorted(mut self) -> Vec<Packet> {
        self.compute_crcs();
        self.correlate();
        self.unique_packets
    }

    /// Count of unique packets currently held.
    pub fn len(&self) -> usize {
        self.unique_packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_packets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(stream_address: u64, source_chain: usize, crc: u16) -> Packet {
        packet_with_validity(stream_address, source_chain, crc, true)
    }

    fn packet_with_validity(stream_address: u64, source_chain: usize, crc: u16, valid_crc: bool) -> Packet {
        Packet {
            data: vec![],
            stream_address,
            source_chain,
            calculated_crc: crc,
            carried_crc: crc,
            valid_crc,
            bytes_corrected: 0,
            correlated_chains: vec![source_chain],
        }
    }

    #[test]
    fn first_chain_packets_are_never_merged() {
        let mut agg = PacketAggregator::new(10);
        agg.add(vec![packet(100, 0, 0xABCD), packet(100, 0, 0xABCD)]);
        agg.correlate();
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn nearby_matching_crc_from_another_chain_merges() {
        let mut agg = PacketAggregator::new(10);
        agg.add(vec![packet(1000, 0, 0x1234)]);
        agg.add(vec![packet(1005, 1, 0x1234)]);
        agg.correlate();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.unique_packets()[0].correlated_chains, vec![0, 1]);
    }

    #[test]
    fn distant_or_mismatched_crc_stays_separate() {
        let mut agg = PacketAggregator::new(10);
        agg.add(vec![packet(1000, 0, 0x1234)]);
        agg.add(vec![packet(1000, 1, 0xFFFF)]); // crc mismatch
        agg.add(vec![packet(5000, 1, 0x1234)]); // too far away
        agg.correlate();
        assert_eq!(agg.len(), 3);
    }

    #[test]
    fn same_chain_duplicates_do_not_merge() {
        let mut agg = PacketAggregator::new(10);
        agg.add(vec![packet(1000, 0, 0x1234)]);
        agg.add(vec![packet(1001, 0, 0x1234)]);
        agg.correlate();
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn results_are_sorted_by_stream_address() {
        let mut agg = PacketAggregator::new(1);
        agg.add(vec![packet(500, 0, 1), packet(100, 0, 2), packet(300, 0, 3)]);
        agg.correlate();
        let addrs: Vec<u64> = agg.unique_packets().iter().map(|p| p.stream_address).collect();
        assert_eq!(addrs, vec![100, 300, 500]);
    }

    #[test]
    fn invalid_crc_packets_are_excluded_from_unique_but_kept_in_raw_batches() {
        let mut agg = PacketAggregator::new(10);
        agg.add(vec![packet_with_validity(100, 0, 0xDEAD, false)]);
        agg.correlate();
        assert!(agg.is_empty());
        assert_eq!(agg.raw_batches().len(), 1);
        assert_eq!(agg.raw_batches()[0].len(), 1);
    }

    #[test]
    fn invalid_crc_packet_does_not_participate_in_correlation() {
        let mut agg = PacketAggregator::new(10);
        agg.add(vec![packet(1000, 0, 0x1234)]);
        agg.add(vec![packet_with_validity(1001, 1, 0x1234, false)]);
        agg.correlate();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.unique_packets()[0].correlated_chains, vec![0]);
    }
}
