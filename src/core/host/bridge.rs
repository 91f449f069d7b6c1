//! Bridges a process host's stdio pipe to the in-process port system, so a
//! process-hosted producer's output reaches downstream layers the same way
//! a thread-hosted one's does. See §4.6 in `SPEC_FULL.md`.

use std::io::Read;
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::Deserialize;

use super::super::error::Result;
use super::super::ipc::{read_framed, WireItem};
use super::super::item::Item;
use super::super::port::Port;
use super::process::ProcessHost;

/// Reads `WireItem<T>` frames from `reader` until `Stop` or EOF, emitting
/// each into `sink`. `None` frames are dropped, matching the in-process
/// port's own "`None` is never forwarded" rule.
fn drain_into_port<T, R>(mut reader: R, sink: Arc<Port>)
where
    T: for<'de> Deserialize<'de> + Send + Sync + 'static,
    R: Read,
{
    loop {
        match read_framed::<T, _>(&mut reader) {
            Ok(Some(WireItem::Data(value))) => sink.emit(Item::data(value)),
            Ok(Some(WireItem::None)) => {}
            Ok(Some(WireItem::Stop)) | Ok(None) => {
                sink.emit(Item::Stop);
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "process bridge read failed, treating as stop");
                sink.emit(Item::Stop);
                break;
            }
        }
    }
}

/// A process-hosted producer: owns the child and the reader thread that
/// drains its stdout into `sink`.
pub struct ProcessBridge {
    process: ProcessHost,
    reader: JoinHandle<()>,
}

impl ProcessBridge {
    pub fn spawn_producer<T>(entry_id: impl Into<String>, sink: Arc<Port>) -> Result<Self>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + 'static,
    {
        let mut process = ProcessHost::spawn(entry_id)?;
        let stdout = process.stdout().expect("stdout piped at spawn");
        let reader = std::thread::Builder::new()
            .name("process-bridge-reader".into())
            .spawn(move || drain_into_port::<T, _>(stdout, sink))
            .expect("failed to spawn process bridge reader thread");
        Ok(Self { process, reader })
    }

    pub fn join(self) {
        self.process.join();
        if self.reader.join().is_err() {
            tracing::error!("process bridge reader thread panicked");
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.process.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn drains_data_then_stop_and_nothing_after() {
        let port = Arc::new(Port::new("default"));
        let rx = port.subscribe().unwrap();

        let mut buf = Vec::new();
        super::super::super::ipc::write_framed(&mut buf, &WireItem::Data(7i64)).unwrap();
        super::super::super::ipc::write_framed(&mut buf, &WireItem::<i64>::None).unwrap();
        super::super::super::ipc::write_framed(&mut buf, &WireItem::<i64>::Stop).unwrap();

        drain_into_port::<i64, _>(Cursor::new(buf), port);

        assert_eq!(rx.recv().unwrap().downcast_ref::<i64>(), Some(&7));
        assert!(rx.recv().unwrap().is_stop());
        assert!(rx.try_recv().is_err());
    }
}
