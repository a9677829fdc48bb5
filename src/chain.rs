/*! Chain construction and execution.

A `ChainConfig` names a modem, slicer, optional descrambling stream, and
codec. `run_chain` builds each component fresh and pushes the whole audio
buffer through it once; chains share no mutable state, so running every
configured chain over the same audio is an embarrassingly parallel `rayon`
map.
*/

use rayon::prelude::*;

use crate::afsk::AfskDemod;
use crate::aggregator::PacketAggregator;
use crate::config::{ChainConfig, CodecType, ModemType, SlicerType};
use crate::fsk::FskDemod;
use crate::hdlc::HdlcDeframer;
use crate::il2p::Il2pDecoder;
use crate::packet::Packet;
use crate::psk::{BpskDemod, MpskDemod, QpskDemod};
use crate::slicer::AddressedByte;
use crate::{Error, Float, Result};

enum SoftSymbols {
    Real(Vec<Float>),
    Iq(Vec<(Float, Float)>),
}

fn run_modem(modem: &crate::config::ModemField, sample_rate: Float, audio: &[Float]) -> SoftSymbols {
    match modem.kind {
        ModemType::Afsk | ModemType::AfskPll => SoftSymbols::Real(AfskDemod::new(modem.afsk_config(sample_rate)).demod(audio)),
        ModemType::Bpsk => SoftSymbols::Real(BpskDemod::new(modem.bpsk_config(sample_rate)).demod(audio)),
        ModemType::Qpsk => SoftSymbols::Iq(QpskDemod::new(modem.qpsk_config(sample_rate)).demod(audio)),
        ModemType::Mpsk => {
            SoftSymbols::Iq(MpskDemod::new(modem.qpsk_config(sample_rate), modem.mpsk_order()).demod(audio))
        }
        ModemType::Fsk => SoftSymbols::Real(FskDemod::new(modem.fsk_config(sample_rate)).demod(audio)),
    }
}

fn run_slicer(slicer: &crate::config::SlicerField, sample_rate: Float, symbols: SoftSymbols) -> Result<Vec<AddressedByte>> {
    match (slicer.kind, symbols) {
        (SlicerType::Binary, SoftSymbols::Real(samples)) => Ok(slicer.binary(sample_rate).slice(&samples)),
        (SlicerType::Quadrature, SoftSymbols::Iq(iq)) => Ok(slicer.quadrature(sample_rate).slice(&iq)),
        (SlicerType::FourLevel, SoftSymbols::Real(samples)) => Ok(slicer.four_level(sample_rate).slice(&samples)),
        _ => Err(Error::Config("modem output type does not match configured slicer".into())),
    }
}

fn run_stream(stream: &Option<crate::config::StreamField>, bits: Vec<AddressedByte>) -> Vec<AddressedByte> {
    match stream {
        None => bits,
        Some(field) => field.descrambler().unscramble(&bits),
    }
}

fn run_codec(codec: &crate::config::CodecField, bits: Vec<AddressedByte>, source_chain: usize) -> Vec<Packet> {
    let raw_bits = HdlcDeframer::unpack_bits(&bits);
    match codec.kind {
        CodecType::Ax25 => {
            let mut deframer =
                HdlcDeframer::new(codec.options.ax25_min_packet_length(), codec.options.ax25_max_packet_length());
            deframer
                .deframe(&raw_bits)
                .into_iter()
                .map(|f| Packet::from_framed(f.data, f.stream_address, source_chain))
                .collect()
        }
        CodecType::Il2p => {
            let mut decoder = Il2pDecoder::new(
                codec.options.il2p_min_distance(),
                codec.options.il2p_disable_rs(),
                codec.options.il2p_require_crc(),
                codec.options.il2p_sync_tolerance(),
            );
            decoder.decode(&raw_bits, source_chain)
        }
    }
}

/// Run one decode chain over `audio`, returning every packet it decoded.
pub fn run_chain(config: &ChainConfig, sample_rate: Float, audio: &[Float], source_chain: usize) -> Result<Vec<Packet>> {
    let symbols = run_modem(&config.modem, sample_rate, audio);
    let bits = run_slicer(&config.slicer, sample_rate, symbols)?;
    let bits = run_stream(&config.stream, bits);
    Ok(run_codec(&config.codec, bits, source_chain))
}

/// Run every configured chain over `audio` in parallel and correlate the
/// results. Returns the CRC-valid, deduplicated, address-sorted packet
/// list alongside every chain's raw batch (CRC-valid or not), so a report
/// can still show what was received but rejected.
pub fn run_all(chains: &[ChainConfig], sample_rate: Float, audio: &[Float]) -> (Vec<Packet>, Vec<Vec<Packet>>) {
    let results: Vec<Vec<Packet>> = chains
        .par_iter()
        .enumerate()
        .map(|(i, chain)| {
            // Isolate each chain: a panic deep in one modem/slicer (e.g. an
            // unexpected NaN) must not take down every other chain's
            // results.
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                run_chain(chain, sample_rate, audio, i)
            }));
            match outcome {
                Ok(Ok(packets)) => packets,
                Ok(Err(e)) => {
                    log::warn!("chain {i} failed: {e}");
                    Vec::new()
                }
                Err(_) => {
                    log::warn!("chain {i} panicked");
                    Vec::new()
                }
            }
        })
        .collect();

    let mut aggregator = PacketAggregator::with_sample_rate(sample_rate as u32);
    for packets in results {
        aggregator.add(packets);
    }
    aggregator.compute_crcs();
    aggregator.correlate();
    let raw_batches = aggregator.raw_batches().to_vec();
    (aggregator.unique_packets().to_vec(), raw_batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodecField, CodecOptions, ModemField, ModemOptions, SlicerField, SlicerOptions};

    fn chain_config(object_name: &str) -> ChainConfig {
        ChainConfig {
            object_name: object_name.to_string(),
            modem: ModemField { kind: ModemType::Afsk, config: "1200".into(), options: ModemOptions::default() },
            slicer: SlicerField { kind: SlicerType::Binary, config: "1200".into(), options: SlicerOptions::default() },
            stream: None,
            codec: CodecField { kind: CodecType::Ax25, options: CodecOptions::default() },
        }
    }

    #[test]
    fn run_chain_on_silence_decodes_nothing_without_panicking() {
        let config = chain_config("afsk1200");
        let audio = vec![0.0; 4800];
        let packets = run_chain(&config, 9600.0, &audio, 0).expect("chain should run");
        assert!(packets.is_empty());
    }

    #[test]
    fn run_all_merges_across_chains() {
        let chains = vec![chain_config("a"), chain_config("b")];
        let audio = vec![0.0; 4800];
        let (unique, raw) = run_all(&chains, 9600.0, &audio);
        assert!(unique.is_empty());
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn mismatched_modem_and_slicer_output_is_a_config_error() {
        let mut config = chain_config("mismatch");
        config.slicer = SlicerField { kind: SlicerType::Quadrature, config: "".into(), options: SlicerOptions::default() };
        let audio = vec![0.0; 4800];
        assert!(run_chain(&config, 9600.0, &audio, 0).is_err());
    }
}
