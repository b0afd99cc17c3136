use std::collections::VecDeque;
use std::io;

use restuned_types::{ProcEvent, ProcEventKind};

/// Source of process-lifecycle events. `recv_event` blocks (on the real
/// implementation) until the next event or a transient error; `Ok(None)`
/// means "the underlying channel was shut down cleanly, stop reading".
pub trait ProcEventSource: Send {
    fn set_listen(&mut self, enable: bool) -> io::Result<()>;
    fn recv_event(&mut self) -> io::Result<Option<ProcEvent>>;
}

/// Connector-based netlink process-event source
/// (`NETLINK_CONNECTOR`/`CN_IDX_PROC`). Mirrors the source's
/// `NetLinkComm::connect`/`setListen`/`recvEvent` shape: a multicast
/// listen-enable datagram is sent once, then every subsequent recv carries
/// one `proc_event`. Only `PROC_EVENT_EXEC`/`PROC_EVENT_EXIT` are
/// actionable; everything else (fork, uid, gid, ...) classifies as
/// [`ProcEventKind::Ignore`]. The `/proc/<pid>/stat` controlling-terminal
/// controlling-terminal check is left to the caller, which already has to
/// re-read `/proc/<pid>` for `comm` anyway.
#[cfg(target_os = "linux")]
pub struct NetlinkProcEventSource {
    socket: libc::c_int,
}

#[cfg(target_os = "linux")]
const NETLINK_CONNECTOR: libc::c_int = 11;
#[cfg(target_os = "linux")]
const CN_IDX_PROC: u32 = 0x1;
#[cfg(target_os = "linux")]
const CN_VAL_PROC: u32 = 0x1;
#[cfg(target_os = "linux")]
const PROC_EVENT_EXEC: u32 = 0x0000_0002;
#[cfg(target_os = "linux")]
const PROC_EVENT_EXIT: u32 = 0x8000_0000;

#[cfg(target_os = "linux")]
impl NetlinkProcEventSource {
    pub fn connect() -> io::Result<Self> {
        // SAFETY: a single syscall with no pointers into Rust-managed memory.
        let fd = unsafe { libc::socket(libc::PF_NETLINK, libc::SOCK_DGRAM, NETLINK_CONNECTOR) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut addr: libc::sockaddr_nl = unsafe { std::mem::zeroed() };
        addr.nl_family = libc::AF_NETLINK as u16;
        addr.nl_groups = CN_IDX_PROC;
        addr.nl_pid = unsafe { libc::getpid() as u32 };

        // SAFETY: `addr` is a valid, fully-initialized sockaddr_nl and its
        // size matches what bind() expects for this address family.
        let rc = unsafe {
            libc::bind(
                fd,
                &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }

        Ok(NetlinkProcEventSource { socket: fd })
    }
}

#[cfg(target_os = "linux")]
impl Drop for NetlinkProcEventSource {
    fn drop(&mut self) {
        if self.socket >= 0 {
            unsafe { libc::close(self.socket) };
        }
    }
}

#[cfg(target_os = "linux")]
impl ProcEventSource for NetlinkProcEventSource {
    fn set_listen(&mut self, enable: bool) -> io::Result<()> {
        // nlmsghdr (16 bytes) + cn_msg header (cb_id 8, seq 4, ack 4, len 2,
        // flags 2 = 20 bytes) + a 4-byte proc_cn_mcast_op payload.
        let mut buf = [0u8; 16 + 20 + 4];
        let total_len = buf.len() as u32;
        buf[0..4].copy_from_slice(&total_len.to_ne_bytes());
        // nlmsg_type = NLMSG_DONE
        buf[4..6].copy_from_slice(&(libc::NLMSG_DONE as u16).to_ne_bytes());
        buf[8..12].copy_from_slice(&(unsafe { libc::getpid() as u32 }).to_ne_bytes());

        buf[16..20].copy_from_slice(&CN_IDX_PROC.to_ne_bytes());
        buf[20..24].copy_from_slice(&CN_VAL_PROC.to_ne_bytes());
        buf[32..34].copy_from_slice(&4u16.to_ne_bytes());

        let op: u32 = if enable { 1 } else { 2 };
        buf[36..40].copy_from_slice(&op.to_ne_bytes());

        // SAFETY: `buf` is a plain byte array sized and filled above.
        let rc = unsafe { libc::send(self.socket, buf.as_ptr() as *const libc::c_void, buf.len(), 0) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn recv_event(&mut self) -> io::Result<Option<ProcEvent>> {
        let mut buf = [0u8; 512];
        // SAFETY: `buf` outlives the call and is large enough for the
        // kernel's nlmsghdr + cn_msg + proc_event payload.
        let rc = unsafe { libc::recv(self.socket, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };
        if rc == 0 {
            return Ok(None);
        }
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Some(ProcEvent { pid: -1, tgid: -1, kind: ProcEventKind::Ignore }));
            }
            return Err(err);
        }
        Ok(Some(parse_proc_event(&buf[..rc as usize])))
    }
}

/// Parse the `proc_event` payload past the nlmsghdr (16 bytes) and cn_msg
/// header (20 bytes): `what` (u32), `cpu` (u32), `timestamp_ns` (u64), then
/// the `event_data` union, whose exec/exit variants both start with two
/// `pid_t` fields (`process_pid`, `process_tgid`).
fn parse_proc_event(buf: &[u8]) -> ProcEvent {
    const HEADER_LEN: usize = 16 + 20;
    const UNION_OFFSET: usize = HEADER_LEN + 16;

    if buf.len() < UNION_OFFSET + 8 {
        return ProcEvent { pid: -1, tgid: -1, kind: ProcEventKind::Ignore };
    }

    let what = u32::from_ne_bytes(buf[HEADER_LEN..HEADER_LEN + 4].try_into().unwrap());
    let pid = i32::from_ne_bytes(buf[UNION_OFFSET..UNION_OFFSET + 4].try_into().unwrap());
    let tgid = i32::from_ne_bytes(buf[UNION_OFFSET + 4..UNION_OFFSET + 8].try_into().unwrap());

    #[cfg(target_os = "linux")]
    let kind = match what {
        PROC_EVENT_EXEC => ProcEventKind::AppOpen,
        PROC_EVENT_EXIT => ProcEventKind::AppClose,
        _ => ProcEventKind::Ignore,
    };
    #[cfg(not(target_os = "linux"))]
    let kind = {
        let _ = what;
        ProcEventKind::Ignore
    };

    if matches!(kind, ProcEventKind::Ignore) {
        ProcEvent { pid: -1, tgid: -1, kind }
    } else {
        ProcEvent { pid, tgid, kind }
    }
}

/// In-memory event source for tests and for embedding `restuned` without a
/// real netlink connector available (containers, CI).
#[derive(Default)]
pub struct InMemoryProcEventSource {
    pending: VecDeque<ProcEvent>,
    listening: bool,
}

impl InMemoryProcEventSource {
    pub fn new() -> Self {
        InMemoryProcEventSource::default()
    }

    pub fn push(&mut self, event: ProcEvent) {
        self.pending.push_back(event);
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }
}

impl ProcEventSource for InMemoryProcEventSource {
    fn set_listen(&mut self, enable: bool) -> io::Result<()> {
        self.listening = enable;
        Ok(())
    }

    fn recv_event(&mut self) -> io::Result<Option<ProcEvent>> {
        Ok(self.pending.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_source_drains_in_order() {
        let mut source = InMemoryProcEventSource::new();
        source.set_listen(true).unwrap();
        source.push(ProcEvent { pid: 1, tgid: 1, kind: ProcEventKind::AppOpen });
        source.push(ProcEvent { pid: 2, tgid: 2, kind: ProcEventKind::AppClose });

        assert_eq!(source.recv_event().unwrap().unwrap().pid, 1);
        assert_eq!(source.recv_event().unwrap().unwrap().pid, 2);
        assert!(source.recv_event().unwrap().is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn parses_exec_event_pid_and_tgid() {
        let mut buf = [0u8; 512];
        const HEADER_LEN: usize = 16 + 20;
        const UNION_OFFSET: usize = HEADER_LEN + 16;
        buf[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&PROC_EVENT_EXEC.to_ne_bytes());
        buf[UNION_OFFSET..UNION_OFFSET + 4].copy_from_slice(&4242i32.to_ne_bytes());
        buf[UNION_OFFSET + 4..UNION_OFFSET + 8].copy_from_slice(&4242i32.to_ne_bytes());

        let ev = parse_proc_event(&buf);
        assert_eq!(ev.kind, ProcEventKind::AppOpen);
        assert_eq!(ev.pid, 4242);
    }
}
