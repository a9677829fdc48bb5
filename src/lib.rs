#![warn(missing_docs)]
/*! An offline software-defined receiver for amateur packet-radio audio.

Takes a recorded WAV file and a decode-chain configuration and recovers
AX.25 or IL2P frames from it. Unlike a live SDR pipeline built from
streaming blocks connected by ring buffers, every stage here is a plain
buffer-in/buffer-out function: a modem demodulates a whole audio buffer
to soft symbols, a slicer turns those into bits, an optional descrambler
and a framer/FEC codec turn the bits into packets. Running the whole
audio file through several independently-configured chains and
correlating their results catches packets that only one configuration
decoded cleanly.

# Architecture overview

```text
   [ WAV file ]
        ↓
  [ per-chain: ]
   [ Modem (AFSK/BPSK/QPSK/MPSK/FSK) ]
        ↓
   [ Slicer (binary/quadrature/4-level) ]
        ↓
   [ Descrambler (optional, G3RUH-style LFSR) ]
        ↓
   [ Codec (AX.25 HDLC, or IL2P with Reed-Solomon FEC) ]
        ↓
  [ PacketAggregator: correlate + dedup across chains ]
        ↓
   [ Report ]
```

# Modules

* [`window`], [`fir`], [`iir`], [`hilbert`], [`nco`], [`agc`],
  [`pi_control`] — shared DSP building blocks.
* [`afsk`], [`psk`], [`fsk`], [`phase_detector`] — modems.
* [`slicer`] — symbol-to-bit decision devices.
* [`descrambler`] — self-synchronizing LFSR descrambling.
* [`gf`], [`reed_solomon`] — Galois-field arithmetic and RS decoding.
* [`crc`] — the CRC-CCITT frame check sequence.
* [`hdlc`] — AX.25 bit-stuffed framing.
* [`il2p`] — IL2P sync/header/block framing.
* [`packet`], [`aggregator`] — decoded-packet metadata and cross-chain
  correlation.
* [`config`] — line-delimited JSON chain configuration.
* [`wav`] — WAV file loading.
* [`chain`] — chain construction and parallel execution.
* [`report`] — run summaries.
*/

pub mod afsk;
pub mod aggregator;
pub mod agc;
pub mod chain;
pub mod config;
pub mod crc;
pub mod descrambler;
pub mod error;
pub mod fir;
pub mod fsk;
pub mod gf;
pub mod hdlc;
pub mod hilbert;
pub mod il2p;
pub mod iir;
pub mod nco;
pub mod packet;
pub mod phase_detector;
pub mod pi_control;
pub mod psk;
pub mod reed_solomon;
pub mod report;
pub mod slicer;
pub mod wav;
pub mod window;

pub use error::{Error, Result};

/// Float type used throughout. Usually f32, but not guaranteed.
pub type Float = f32;

/// Complex (I/Q) data.
pub type Complex = num_complex::Complex<Float>;
