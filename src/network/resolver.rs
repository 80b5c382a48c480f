//! Name and service resolution through the system resolver
//!
//! `getaddrinfo(3)` is used rather than a DNS client so that symbolic service
//! names (`time`), `/etc/hosts` entries and literal addresses all resolve the
//! way every other tool on the host resolves them.

use std::ffi::{CStr, CString};
use std::net::SocketAddr;
use std::{io, mem, ptr};

use async_trait::async_trait;
use socket2::SockAddr;
use tracing::{debug, trace};

use super::Resolve;
use crate::core::{Endpoint, Error, Result, Transport};

/// Resolver backed by the operating system's `getaddrinfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    /// Creates a new system resolver
    pub fn new() -> Self {
        SystemResolver
    }
}

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(
        &self,
        host: &str,
        service: &str,
        transport: Transport,
    ) -> Result<Vec<Endpoint>> {
        let (name, serv) = (host.to_owned(), service.to_owned());

        // getaddrinfo blocks; keep it off the runtime's worker
        let addrs = tokio::task::spawn_blocking(move || lookup(&name, &serv, transport))
            .await
            .map_err(|e| Error::resolution(host, e.to_string()))?
            .map_err(|cause| Error::resolution(host, cause))?;

        if addrs.is_empty() {
            return Err(Error::resolution(host, "no usable addresses"));
        }

        debug!(host, service, %transport, count = addrs.len(), "resolved endpoints");
        Ok(addrs
            .into_iter()
            .map(|addr| Endpoint::new(addr, transport))
            .collect())
    }
}

/// Owned `getaddrinfo` result list, freed on drop
struct AddrInfoList(*mut libc::addrinfo);

impl AddrInfoList {
    fn iter(&self) -> impl Iterator<Item = &libc::addrinfo> + '_ {
        let mut cursor = self.0;
        std::iter::from_fn(move || {
            if cursor.is_null() {
                return None;
            }
            // SAFETY: non-null nodes of the list stay valid until freeaddrinfo
            let node = unsafe { &*cursor };
            cursor = node.ai_next;
            Some(node)
        })
    }
}

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the pointer came from a successful getaddrinfo call
            unsafe { libc::freeaddrinfo(self.0) };
        }
    }
}

fn socket_type(transport: Transport) -> libc::c_int {
    match transport {
        Transport::Stream => libc::SOCK_STREAM,
        Transport::Datagram => libc::SOCK_DGRAM,
    }
}

/// Looks up `host`/`service` for the socket type of `transport`, any family
///
/// Addresses are returned in the order the system resolver produced them.
fn lookup(
    host: &str,
    service: &str,
    transport: Transport,
) -> std::result::Result<Vec<SocketAddr>, String> {
    let c_host = CString::new(host).map_err(|_| "hostname contains a NUL byte".to_string())?;
    let c_service = CString::new(service).map_err(|_| "service contains a NUL byte".to_string())?;

    // SAFETY: an all-zero addrinfo is the documented "no hints" value
    let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = socket_type(transport);

    let mut head: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: all pointers are valid for the duration of the call
    let rc = unsafe { libc::getaddrinfo(c_host.as_ptr(), c_service.as_ptr(), &hints, &mut head) };
    if rc != 0 {
        return Err(gai_error(rc));
    }

    let list = AddrInfoList(head);
    Ok(list.iter().filter_map(to_socket_addr).collect())
}

fn gai_error(rc: libc::c_int) -> String {
    if rc == libc::EAI_SYSTEM {
        return io::Error::last_os_error().to_string();
    }
    // SAFETY: gai_strerror returns a pointer to a static string
    unsafe { CStr::from_ptr(libc::gai_strerror(rc)) }
        .to_string_lossy()
        .into_owned()
}

fn to_socket_addr(info: &libc::addrinfo) -> Option<SocketAddr> {
    if info.ai_addr.is_null() {
        return None;
    }
    let len = (info.ai_addrlen as usize).min(mem::size_of::<libc::sockaddr_storage>());

    // SAFETY: at most `len` bytes are copied from a sockaddr of that length
    // into storage that is at least that large
    let ((), addr) = unsafe {
        SockAddr::try_init(|storage, storage_len| {
            ptr::copy_nonoverlapping(info.ai_addr as *const u8, storage as *mut u8, len);
            *storage_len = len as _;
            Ok(())
        })
    }
    .ok()?;

    let socket_addr = addr.as_socket();
    if socket_addr.is_none() {
        trace!(family = info.ai_family, "skipping non-IP address");
    }
    socket_addr
}
