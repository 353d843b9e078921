//! Unix socket I/O with `SCM_RIGHTS` descriptor passing.

use std::io::{self, IoSlice, IoSliceMut};
use std::mem::MaybeUninit;
use std::net::Shutdown;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::net::UnixStream;

use rustix::io::Errno;
use rustix::net::{
    RecvAncillaryBuffer, RecvAncillaryMessage, RecvFlags, SendAncillaryBuffer,
    SendAncillaryMessage, SendFlags, recvmsg, sendmsg,
};

/// Maximum file descriptors accepted per read (libwayland's limit).
const MAX_FDS_PER_READ: usize = 28;

/// Bytes requested per read.
pub(crate) const READ_CHUNK: usize = 4096;

#[derive(Debug)]
pub(crate) struct Socket {
    stream: UnixStream,
}

impl Socket {
    pub(crate) fn new(stream: UnixStream) -> Self {
        Self { stream }
    }

    /// Writes all of `bytes`. Descriptors go out with the first chunk.
    pub(crate) fn send(&self, bytes: &[u8], fds: &[OwnedFd]) -> io::Result<()> {
        let borrowed: Vec<BorrowedFd<'_>> = fds.iter().map(|fd| fd.as_fd()).collect();
        let mut written = 0;

        while written < bytes.len() {
            let iov = [IoSlice::new(&bytes[written..])];
            let result = if written == 0 && !borrowed.is_empty() {
                let mut cmsg_space =
                    vec![MaybeUninit::uninit(); rustix::cmsg_space!(ScmRights(borrowed.len()))];
                let mut cmsg_buffer = SendAncillaryBuffer::new(&mut cmsg_space);
                cmsg_buffer.push(SendAncillaryMessage::ScmRights(&borrowed));
                sendmsg(&self.stream, &iov, &mut cmsg_buffer, SendFlags::NOSIGNAL)
            } else {
                let mut cmsg_buffer = SendAncillaryBuffer::default();
                sendmsg(&self.stream, &iov, &mut cmsg_buffer, SendFlags::NOSIGNAL)
            };

            match result {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(errno) if errno == Errno::INTR => continue,
                Err(errno) => return Err(errno.into()),
            }
        }

        log::trace!("sent {} bytes, {} fds", bytes.len(), fds.len());
        Ok(())
    }

    /// Reads one chunk into `buf`, collecting any descriptors that arrived with it.
    ///
    /// Returns `Ok(None)` if `blocking` is false and nothing is available; `Ok(Some(0))`
    /// means the compositor closed the connection.
    pub(crate) fn recv(
        &self,
        buf: &mut [u8],
        fds: &mut Vec<OwnedFd>,
        blocking: bool,
    ) -> io::Result<Option<usize>> {
        let flags = if blocking {
            RecvFlags::empty()
        } else {
            RecvFlags::DONTWAIT
        };

        loop {
            let mut cmsg_space =
                [MaybeUninit::uninit(); rustix::cmsg_space!(ScmRights(MAX_FDS_PER_READ))];
            let mut cmsg_buffer = RecvAncillaryBuffer::new(&mut cmsg_space);
            let mut iov = [IoSliceMut::new(buf)];

            match recvmsg(&self.stream, &mut iov, &mut cmsg_buffer, flags) {
                Ok(msg) => {
                    for cmsg in cmsg_buffer.drain() {
                        if let RecvAncillaryMessage::ScmRights(received) = cmsg {
                            fds.extend(received);
                        }
                    }
                    log::trace!("received {} bytes, {} fds", msg.bytes, fds.len());
                    return Ok(Some(msg.bytes));
                }
                Err(errno) if errno == Errno::INTR => continue,
                Err(errno) if errno == Errno::AGAIN && !blocking => return Ok(None),
                Err(errno) => return Err(errno.into()),
            }
        }
    }

    pub(crate) fn shutdown(&self) {
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            log::debug!("socket shutdown: {err}");
        }
    }
}

impl AsFd for Socket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn nonblocking_recv_reports_empty_socket() {
        let (client, _server) = UnixStream::pair().unwrap();
        let socket = Socket::new(client);
        let mut buf = [0; 16];
        let mut fds = Vec::new();
        assert_eq!(socket.recv(&mut buf, &mut fds, false).unwrap(), None);
    }

    #[test]
    fn passes_descriptors_with_the_bytes() {
        let (a, b) = UnixStream::pair().unwrap();
        let (extra, _keep) = UnixStream::pair().unwrap();
        let sender = Socket::new(a);
        let receiver = Socket::new(b);

        let fd = OwnedFd::from(extra);
        sender.send(b"ping", std::slice::from_ref(&fd)).unwrap();

        let mut buf = [0; 16];
        let mut fds = Vec::new();
        let n = receiver.recv(&mut buf, &mut fds, true).unwrap();
        assert_eq!(n, Some(4));
        assert_eq!(&buf[..4], b"ping");
        assert_eq!(fds.len(), 1);
    }

    #[test]
    fn peer_close_reads_zero() {
        let (client, mut server) = UnixStream::pair().unwrap();
        server.write_all(b"").unwrap();
        drop(server);
        let socket = Socket::new(client);
        let mut buf = [0; 16];
        assert_eq!(socket.recv(&mut buf, &mut Vec::new(), true).unwrap(), Some(0));
    }
}
