//! Transmit sinks: where the 16-bit interleaved I/Q stream goes.
//!
//! The hardware control plane lives behind [`TxSink`]. The built-in
//! backends serialize the stream to a file or stdout in host byte order;
//! a radio backend implements the same trait against its device API.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use log::{error, info};

use crate::error::Error;
use crate::exchange::Exchange;
use crate::modulator::IqSample;

/// A consumer of fixed-size I/Q sample frames. `push` blocks until the
/// backend has accepted the frame.
pub trait TxSink: Send {
    fn push(&mut self, frame: &[IqSample]) -> Result<(), Error>;
}

/// Writes interleaved native-endian `i16` I/Q pairs to a file.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: &Path) -> Result<FileSink, Error> {
        let file = File::create(path)?;
        Ok(FileSink {
            writer: BufWriter::new(file),
        })
    }
}

impl TxSink for FileSink {
    fn push(&mut self, frame: &[IqSample]) -> Result<(), Error> {
        for s in frame {
            self.writer.write_all(&s.re.to_ne_bytes())?;
            self.writer.write_all(&s.im.to_ne_bytes())?;
        }
        Ok(())
    }
}

/// Streams interleaved I/Q pairs to standard output.
pub struct StdoutSink {
    writer: BufWriter<std::io::Stdout>,
}

impl Default for StdoutSink {
    fn default() -> Self {
        StdoutSink {
            writer: BufWriter::new(std::io::stdout()),
        }
    }
}

impl TxSink for StdoutSink {
    fn push(&mut self, frame: &[IqSample]) -> Result<(), Error> {
        for s in frame {
            self.writer.write_all(&s.re.to_ne_bytes())?;
            self.writer.write_all(&s.im.to_ne_bytes())?;
        }
        Ok(())
    }
}

/// Resolve a backend URI to a sink.
///
/// `file:<path>` and `stdout:` are served in-process. `ip:`/`usb:` URIs
/// name a radio backend, which is an external collaborator; selecting one
/// without such a backend linked in is a configuration error.
pub fn open_sink(uri: &str) -> Result<Box<dyn TxSink>, Error> {
    if let Some(path) = uri.strip_prefix("file:") {
        Ok(Box::new(FileSink::create(Path::new(path))?))
    } else if uri == "stdout:" {
        Ok(Box::new(StdoutSink::default()))
    } else {
        Err(Error::Backend(format!(
            "no driver for `{uri}`; radio backends attach via the TxSink trait \
             (built-in: file:<path>, stdout:)"
        )))
    }
}

/// Sink-thread body: copy each produced frame out of the exchange and
/// push it to the backend. On a backend failure the exchange is stopped
/// so the producer unblocks and the process can exit.
pub fn run_consumer(exchange: Arc<Exchange>, mut sink: Box<dyn TxSink>) {
    let mut local: Vec<IqSample> = Vec::new();

    while exchange.consume(&mut local) {
        if let Err(e) = sink.push(&local) {
            error!("sink push failed: {e}");
            exchange.request_stop();
            break;
        }
    }

    info!("sink thread done");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_writes_interleaved_pairs() {
        let dir = std::env::temp_dir().join("gps-sim-sink-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("iq.bin");

        {
            let mut sink = FileSink::create(&path).unwrap();
            sink.push(&[IqSample::new(1, -2), IqSample::new(300, -400)])
                .unwrap();
            // Drop flushes.
        }

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 8);
        let vals: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|c| i16::from_ne_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(vals, vec![1, -2, 300, -400]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(open_sink("ip:pluto.local"), Err(Error::Backend(_))));
    }
}
