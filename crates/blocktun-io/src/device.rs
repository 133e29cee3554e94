//! 仮想インターフェースのアダプター
//!
//! インターフェースの作成・設定は外部の責任。ここでは開いた後のハンドルを包む。

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::stream::{short_write, InterfaceStream, StreamError, StreamErrorKind};

/// 読み書き可能なデバイスハンドルをインターフェースとして使う
///
/// 書き込みで `EINVAL`（`io::ErrorKind::InvalidInput`）が返った場合は
/// カーネルが IP データグラムとして拒否したとみなす。
#[derive(Debug)]
pub struct DeviceInterface<D> {
    device: D,
}

impl<D: Read + Write> DeviceInterface<D> {
    pub fn new(device: D) -> Self {
        DeviceInterface { device }
    }

    pub fn get_ref(&self) -> &D {
        &self.device
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

impl DeviceInterface<File> {
    /// 設定済みのデバイスを読み書きモードで開く
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::new(file))
    }

    /// もう一方の方向用にハンドルを複製する
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self::new(self.device.try_clone()?))
    }
}

fn classify_write(err: io::Error) -> StreamError {
    match err.kind() {
        io::ErrorKind::InvalidInput => StreamError::new(StreamErrorKind::MalformedDatagram, err),
        _ => StreamError::other(err),
    }
}

impl<D: Read + Write> InterfaceStream for DeviceInterface<D> {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        loop {
            match self.device.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result.map_err(StreamError::other),
            }
        }
    }

    fn send_datagram(&mut self, datagram: &[u8]) -> Result<(), StreamError> {
        loop {
            match self.device.write(datagram) {
                Ok(n) if n == datagram.len() => return Ok(()),
                Ok(n) => return Err(short_write(n, datagram.len())),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(classify_write(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// 書き込みを常に指定のエラーで失敗させるデバイス
    struct FailingDevice(io::ErrorKind);

    impl Read for FailingDevice {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(self.0))
        }
    }

    impl Write for FailingDevice {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(self.0))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_and_write_through_cursor() {
        let mut dev = DeviceInterface::new(Cursor::new(vec![1u8, 2, 3]));
        let mut buf = [0u8; 8];
        assert_eq!(dev.recv_datagram(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);

        dev.send_datagram(&[9, 9]).unwrap();
        assert_eq!(dev.into_inner().into_inner(), vec![1, 2, 3, 9, 9]);
    }

    #[test]
    fn test_invalid_input_is_malformed_datagram() {
        let mut dev = DeviceInterface::new(FailingDevice(io::ErrorKind::InvalidInput));
        let err = dev.send_datagram(&[0u8; 20]).unwrap_err();
        assert_eq!(err.kind(), StreamErrorKind::MalformedDatagram);
    }

    #[test]
    fn test_other_errors_are_fatal() {
        let mut dev = DeviceInterface::new(FailingDevice(io::ErrorKind::PermissionDenied));
        assert_eq!(
            dev.send_datagram(&[0u8; 20]).unwrap_err().kind(),
            StreamErrorKind::Other
        );
        let mut buf = [0u8; 4];
        assert_eq!(
            dev.recv_datagram(&mut buf).unwrap_err().kind(),
            StreamErrorKind::Other
        );
    }
}
