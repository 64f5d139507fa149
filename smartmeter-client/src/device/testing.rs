//! Scripted in-memory adapter for device tests

use super::{Device, DeviceOptions};
use smartmeter_transport::StreamTransport;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, WriteHalf};

pub(crate) const METER_IP: &str = "FE80:0000:0000:0000:0211:2233:4455:6677";
pub(crate) const ADAPTER_IP: &str = "FE80:0000:0000:0000:021D:1290:0003:C890";

pub(crate) type FakeDevice = Device<StreamTransport<WriteHalf<DuplexStream>>>;

/// Commands received by the fake adapter, without their CRLF
#[derive(Clone, Default)]
pub(crate) struct Commands(Arc<Mutex<Vec<Vec<u8>>>>);

impl Commands {
    pub(crate) fn raw(&self) -> Vec<Vec<u8>> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.raw()
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect()
    }
}

pub(crate) fn replies(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

/// Device wired to an adapter answering the n-th command with `script[n]`
///
/// Commands beyond the script get no answer. Reply lines are written as
/// ISO-8859-1, mirroring how the line source decodes them.
pub(crate) fn fake_device(script: Vec<Vec<String>>, options: DeviceOptions) -> (FakeDevice, Commands) {
    let (local, remote) = tokio::io::duplex(4096);
    let commands = Commands::default();
    let seen = commands.clone();
    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(remote);
        let mut read = BufReader::new(read);
        let mut script = script.into_iter();
        loop {
            let mut buf = Vec::new();
            if read.read_until(b'\n', &mut buf).await.unwrap_or(0) == 0 {
                return;
            }
            if buf.ends_with(b"\r\n") {
                buf.truncate(buf.len() - 2);
            }
            seen.0.lock().unwrap().push(buf);
            for line in script.next().unwrap_or_default() {
                // one byte per char, so binary payloads go out unchanged
                let bytes: Vec<u8> = line.chars().map(|c| c as u8).collect();
                write.write_all(&bytes).await.unwrap();
                write.write_all(b"\r\n").await.unwrap();
            }
        }
    });
    (Device::open_stream(local, options), commands)
}
